/// Listing cache for read-heavy collection endpoints
///
/// Cached values are serialized JSON responses stored under a namespace
/// (`"inventory"`, `"mechanics"`, `"members"`) and a key derived from the
/// query string. Writers call [`ListingCache::invalidate`] on the namespace
/// after commit; entries also expire after the configured TTL, which a
/// namespace may override with [`ListingCache::with_namespace_ttl`].
///
/// Two backends are available:
///
/// - in-process map behind a `tokio::sync::RwLock` (default)
/// - Redis through a `redis::aio::ConnectionManager` when `REDIS_URL` is set
///
/// # Example
///
/// ```
/// use shopfloor_shared::cache::ListingCache;
/// use serde_json::json;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), shopfloor_shared::cache::CacheError> {
/// let cache = ListingCache::in_memory(Duration::from_secs(300));
///
/// cache.put("inventory", "page=1", &json!({"inventory": []})).await?;
/// assert!(cache.get("inventory", "page=1").await?.is_some());
///
/// cache.invalidate("inventory").await?;
/// assert!(cache.get("inventory", "page=1").await?.is_none());
/// # Ok(())
/// # }
/// ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use redis::aio::ConnectionManager;
use redis::{Client, RedisError};
use serde_json::Value;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// Prefix for every Redis key written by the cache
const KEY_PREFIX: &str = "shopfloor:cache";

/// Cache errors
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Could not reach Redis
    #[error("Cache connection error: {0}")]
    Connection(String),

    /// Redis rejected a command
    #[error("Cache command error: {0}")]
    Command(String),

    /// Stored value is not valid JSON
    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<RedisError> for CacheError {
    fn from(err: RedisError) -> Self {
        if err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() {
            CacheError::Connection(err.to_string())
        } else {
            CacheError::Command(err.to_string())
        }
    }
}

#[derive(Clone)]
enum Backend {
    Memory(Arc<RwLock<HashMap<String, (Instant, String)>>>),
    Redis(ConnectionManager),
}

/// TTL cache for serialized listing responses
///
/// Cheap to clone; clones share the same storage.
#[derive(Clone)]
pub struct ListingCache {
    backend: Backend,
    ttl: Duration,
    namespace_ttls: Arc<HashMap<String, Duration>>,
}

impl std::fmt::Debug for ListingCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let backend = match self.backend {
            Backend::Memory(_) => "memory",
            Backend::Redis(_) => "redis",
        };
        f.debug_struct("ListingCache")
            .field("backend", &backend)
            .field("ttl", &self.ttl)
            .field("namespace_ttls", &self.namespace_ttls)
            .finish()
    }
}

impl ListingCache {
    /// Creates an in-process cache
    pub fn in_memory(ttl: Duration) -> Self {
        Self {
            backend: Backend::Memory(Arc::new(RwLock::new(HashMap::new()))),
            ttl,
            namespace_ttls: Arc::default(),
        }
    }

    /// Connects to Redis at `url`
    pub async fn redis(url: &str, ttl: Duration) -> Result<Self, CacheError> {
        let client = Client::open(url)
            .map_err(|e| CacheError::Connection(format!("Invalid Redis URL: {}", e)))?;

        let manager = ConnectionManager::new(client).await.map_err(|e| {
            CacheError::Connection(format!("Failed to connect to Redis: {}", e))
        })?;

        tracing::info!("Listing cache connected to Redis at {}", sanitize_url(url));

        Ok(Self {
            backend: Backend::Redis(manager),
            ttl,
            namespace_ttls: Arc::default(),
        })
    }

    /// Uses `ttl` instead of the default for entries of `namespace`
    pub fn with_namespace_ttl(mut self, namespace: &str, ttl: Duration) -> Self {
        Arc::make_mut(&mut self.namespace_ttls).insert(namespace.to_string(), ttl);
        self
    }

    /// Default entry lifetime
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Entry lifetime for `namespace`
    pub fn ttl_for(&self, namespace: &str) -> Duration {
        self.namespace_ttls
            .get(namespace)
            .copied()
            .unwrap_or(self.ttl)
    }

    fn full_key(namespace: &str, key: &str) -> String {
        format!("{}:{}", namespace, key)
    }

    fn index_key(namespace: &str) -> String {
        format!("{}:{}:keys", KEY_PREFIX, namespace)
    }

    /// Returns the cached value, if present and fresh
    pub async fn get(&self, namespace: &str, key: &str) -> Result<Option<Value>, CacheError> {
        let full_key = Self::full_key(namespace, key);

        let raw = match &self.backend {
            Backend::Memory(map) => {
                let map = map.read().await;
                match map.get(&full_key) {
                    Some((expires_at, raw)) if *expires_at > Instant::now() => Some(raw.clone()),
                    _ => None,
                }
            }
            Backend::Redis(manager) => {
                let mut conn = manager.clone();
                let raw: Option<String> = redis::cmd("GET")
                    .arg(format!("{}:{}", KEY_PREFIX, full_key))
                    .query_async(&mut conn)
                    .await?;
                raw
            }
        };

        match raw {
            Some(raw) => {
                tracing::debug!(namespace, key, "Listing cache hit");
                Ok(Some(serde_json::from_str(&raw)?))
            }
            None => Ok(None),
        }
    }

    /// Stores `value` for the namespace's TTL
    pub async fn put(&self, namespace: &str, key: &str, value: &Value) -> Result<(), CacheError> {
        let full_key = Self::full_key(namespace, key);
        let raw = serde_json::to_string(value)?;
        let ttl = self.ttl_for(namespace);

        match &self.backend {
            Backend::Memory(map) => {
                let mut map = map.write().await;
                let now = Instant::now();
                map.retain(|_, (expires_at, _)| *expires_at > now);
                map.insert(full_key, (now + ttl, raw));
            }
            Backend::Redis(manager) => {
                let mut conn = manager.clone();
                let redis_key = format!("{}:{}", KEY_PREFIX, full_key);
                let ttl_secs = ttl.as_secs().max(1);

                redis::pipe()
                    .atomic()
                    .cmd("SET")
                    .arg(&redis_key)
                    .arg(raw)
                    .arg("EX")
                    .arg(ttl_secs)
                    .ignore()
                    .cmd("SADD")
                    .arg(Self::index_key(namespace))
                    .arg(&redis_key)
                    .ignore()
                    .cmd("EXPIRE")
                    .arg(Self::index_key(namespace))
                    .arg(ttl_secs)
                    .ignore()
                    .query_async::<_, ()>(&mut conn)
                    .await?;
            }
        }

        Ok(())
    }

    /// Drops every cached entry of `namespace`
    pub async fn invalidate(&self, namespace: &str) -> Result<(), CacheError> {
        match &self.backend {
            Backend::Memory(map) => {
                let prefix = format!("{}:", namespace);
                map.write().await.retain(|k, _| !k.starts_with(&prefix));
            }
            Backend::Redis(manager) => {
                let mut conn = manager.clone();
                let index = Self::index_key(namespace);

                let keys: Vec<String> = redis::cmd("SMEMBERS")
                    .arg(&index)
                    .query_async(&mut conn)
                    .await?;

                let mut del = redis::cmd("DEL");
                del.arg(&index);
                for key in &keys {
                    del.arg(key);
                }
                del.query_async::<_, ()>(&mut conn).await?;
            }
        }

        tracing::debug!(namespace, "Listing cache invalidated");
        Ok(())
    }
}

/// Replaces credentials in a Redis URL with `***:***`
fn sanitize_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}***:***@{}", &url[..scheme_end + 3], &url[at + 1..])
        }
        _ => url.to_string(),
    }
}
