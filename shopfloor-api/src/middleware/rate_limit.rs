/// Per-client rate limiting
///
/// Token buckets keyed by client IP, held in process memory. Each route
/// group gets its own [`RateLimiter`] with its own budget:
///
/// - **Reads** (GET): 100 requests/minute
/// - **Writes** (POST, PUT, DELETE): 50 requests/minute
/// - **Mechanic assignment**: 20 requests/minute
/// - **Membership enrollment**: 5 requests/minute
///
/// # Algorithm
///
/// Token bucket:
/// - Tokens refill at a constant rate (`per_minute / 60` per second)
/// - Each request consumes 1 token
/// - Request blocked if bucket empty
///
/// # Headers
///
/// - `X-RateLimit-Limit`: Requests allowed per minute
/// - `X-RateLimit-Remaining`: Whole tokens left after this request
/// - `Retry-After`: Seconds to wait (429 responses only)
///
/// The client key is the peer address from `ConnectInfo`, falling back to
/// the first `X-Forwarded-For` hop.

use crate::error::ApiError;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue, Method},
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Buckets kept before idle (full) ones are pruned
const PRUNE_THRESHOLD: usize = 10_000;

/// Budget of one route group
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimit {
    /// Maximum requests per minute
    pub requests_per_minute: u32,

    /// Token refill rate (tokens per second)
    pub refill_rate: f64,

    /// Maximum tokens in bucket (burst capacity)
    pub bucket_capacity: u32,
}

impl RateLimit {
    pub fn per_minute(requests_per_minute: u32) -> Self {
        RateLimit {
            requests_per_minute,
            refill_rate: requests_per_minute as f64 / 60.0,
            bucket_capacity: requests_per_minute,
        }
    }
}

/// Token bucket state of one client
#[derive(Debug, Clone)]
struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// Creates a new full bucket
    fn new(capacity: u32, now: Instant) -> Self {
        TokenBucket {
            tokens: capacity as f64,
            last_refill: now,
        }
    }

    /// Refills tokens based on elapsed time
    fn refill(&mut self, limit: &RateLimit, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * limit.refill_rate).min(limit.bucket_capacity as f64);
        self.last_refill = now;
    }

    /// Attempts to consume one token
    fn try_consume(&mut self) -> bool {
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Seconds until one token is available
    fn seconds_until_available(&self, rate: f64) -> u64 {
        let deficit = 1.0 - self.tokens;
        if deficit <= 0.0 {
            0
        } else {
            (deficit / rate).ceil() as u64
        }
    }

    fn is_full(&self, limit: &RateLimit) -> bool {
        self.tokens >= limit.bucket_capacity as f64
    }
}

/// Result of a rate limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitResult {
    /// Whether request is allowed
    pub ok: bool,

    /// Whole tokens remaining
    pub remaining: u32,

    /// Seconds until the next token (0 when allowed)
    pub retry_after: u64,
}

/// Token-bucket limiter for one route group
///
/// Clones share the same buckets.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    name: &'static str,
    limit: RateLimit,
    enabled: bool,
    buckets: Arc<Mutex<HashMap<String, TokenBucket>>>,
}

impl RateLimiter {
    pub fn new(name: &'static str, limit: RateLimit) -> Self {
        Self {
            name,
            limit,
            enabled: true,
            buckets: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// A limiter that lets everything through
    pub fn disabled(name: &'static str, limit: RateLimit) -> Self {
        Self {
            enabled: false,
            ..Self::new(name, limit)
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn limit(&self) -> RateLimit {
        self.limit
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Consumes one token from `client`'s bucket
    pub async fn check(&self, client: &str) -> RateLimitResult {
        let now = Instant::now();
        let mut buckets = self.buckets.lock().await;

        if buckets.len() >= PRUNE_THRESHOLD {
            let limit = self.limit;
            buckets.retain(|_, bucket| {
                bucket.refill(&limit, now);
                !bucket.is_full(&limit)
            });
        }

        let bucket = buckets
            .entry(client.to_string())
            .or_insert_with(|| TokenBucket::new(self.limit.bucket_capacity, now));
        bucket.refill(&self.limit, now);

        let ok = bucket.try_consume();

        RateLimitResult {
            ok,
            remaining: bucket.tokens.floor().max(0.0) as u32,
            retry_after: if ok {
                0
            } else {
                bucket.seconds_until_available(self.limit.refill_rate).max(1)
            },
        }
    }
}

/// The limiters of every route group
#[derive(Debug, Clone)]
pub struct RateLimiters {
    pub reads: RateLimiter,
    pub writes: RateLimiter,
    pub assignments: RateLimiter,
    pub enrollment: RateLimiter,
    pub mechanic_creation: RateLimiter,
    pub calculations: RateLimiter,
}

impl RateLimiters {
    pub fn new(enabled: bool) -> Self {
        let build: fn(&'static str, RateLimit) -> RateLimiter = if enabled {
            RateLimiter::new
        } else {
            RateLimiter::disabled
        };

        Self {
            reads: build("reads", RateLimit::per_minute(100)),
            writes: build("writes", RateLimit::per_minute(50)),
            assignments: build("assignments", RateLimit::per_minute(20)),
            enrollment: build("enrollment", RateLimit::per_minute(5)),
            mechanic_creation: build("mechanic_creation", RateLimit::per_minute(10)),
            calculations: build("calculations", RateLimit::per_minute(100)),
        }
    }

    /// Picks the reads or writes limiter by request method
    pub fn for_method(&self, method: &Method) -> &RateLimiter {
        if *method == Method::GET || *method == Method::HEAD || *method == Method::OPTIONS {
            &self.reads
        } else {
            &self.writes
        }
    }
}

/// Identifies the client for bucketing
fn client_key(request: &Request) -> String {
    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }

    forwarded_for(request.headers()).unwrap_or_else(|| "unknown".to_string())
}

fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

async fn enforce(limiter: &RateLimiter, request: Request, next: Next) -> Result<Response, ApiError> {
    if !limiter.is_enabled() {
        return Ok(next.run(request).await);
    }

    let client = client_key(&request);
    let result = limiter.check(&client).await;

    if !result.ok {
        tracing::warn!(
            limiter = limiter.name(),
            client = %client,
            retry_after = result.retry_after,
            "Rate limit exceeded"
        );
        return Err(ApiError::RateLimitExceeded {
            retry_after: result.retry_after,
            message: format!(
                "Rate limit exceeded: {} requests per minute",
                limiter.limit().requests_per_minute
            ),
        });
    }

    let mut response = next.run(request).await;

    let headers = response.headers_mut();
    headers.insert(
        "x-ratelimit-limit",
        HeaderValue::from(limiter.limit().requests_per_minute),
    );
    headers.insert("x-ratelimit-remaining", HeaderValue::from(result.remaining));

    Ok(response)
}

/// Method-based reads/writes limiting for the whole API
pub async fn rate_limit_layer(
    State(limiters): State<RateLimiters>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let limiter = limiters.for_method(request.method()).clone();
    enforce(&limiter, request, next).await
}

/// Limiting with one dedicated limiter, for routes with a tighter budget
pub async fn route_limit_layer(
    State(limiter): State<RateLimiter>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    enforce(&limiter, request, next).await
}
