/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use shopfloor_api::{app::AppState, config::Config};
/// use shopfloor_shared::cache::ListingCache;
/// use sqlx::PgPool;
/// use std::time::Duration;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let cache = ListingCache::in_memory(Duration::from_secs(config.cache.ttl_seconds));
/// let state = AppState::new(pool, config, cache);
/// let app = shopfloor_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    error::ApiError,
    middleware::{
        rate_limit::{rate_limit_layer, route_limit_layer, RateLimiters},
        security::SecurityHeadersLayer,
    },
};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::{from_fn_with_state, Next},
    response::Response,
    routing::{get, post, put, MethodRouter},
    Router,
};
use shopfloor_shared::{auth::middleware::authenticate, cache::ListingCache};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Every field is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Cached inventory, mechanic and member listings
    pub cache: ListingCache,

    /// Per-route-group request budgets
    pub limiters: RateLimiters,
}

impl AppState {
    /// Creates new application state
    pub fn new(db: PgPool, config: Config, cache: ListingCache) -> Self {
        let limiters = RateLimiters::new(config.rate_limit.enabled);

        Self {
            db,
            config: Arc::new(config),
            cache,
            limiters,
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }

    /// Cached listing for `namespace` / `key`, if any
    ///
    /// Cache failures count as a miss.
    pub async fn cached_listing(&self, namespace: &str, key: &str) -> Option<serde_json::Value> {
        match self.cache.get(namespace, key).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(namespace, error = %e, "Listing cache read failed");
                None
            }
        }
    }

    /// Stores a listing response in the cache
    pub async fn store_listing(&self, namespace: &str, key: &str, body: &serde_json::Value) {
        if let Err(e) = self.cache.put(namespace, key, body).await {
            tracing::warn!(namespace, error = %e, "Listing cache write failed");
        }
    }

    /// Drops cached listings of `namespace` after a committed write
    ///
    /// A cache failure is logged and otherwise ignored; stale entries still
    /// expire with the TTL.
    pub async fn invalidate_cache(&self, namespace: &str) {
        if let Err(e) = self.cache.invalidate(namespace).await {
            tracing::warn!(namespace, error = %e, "Failed to invalidate listing cache");
        }
    }
}

/// Registers a collection route both with and without the trailing slash
fn collection(
    router: Router<AppState>,
    path: &str,
    methods: MethodRouter<AppState>,
) -> Router<AppState> {
    router
        .route(path, methods.clone())
        .route(&format!("{}/", path), methods)
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET /health
/// ├── /customers/               POST, GET
/// │   ├── POST /login
/// │   ├── /:id                  GET, PUT*, DELETE*
/// │   └── GET /:id/service-tickets
/// ├── /mechanics/               POST (10/min), GET
/// │   ├── GET /by-workload
/// │   └── /:id                  GET, PUT, DELETE
/// ├── /inventory/               POST, GET
/// │   └── /:id                  GET, PUT, DELETE
/// ├── /members/                 POST*, GET
/// │   └── /:id                  GET, PUT*, DELETE*
/// ├── /service-tickets/         POST, GET
/// │   └── /:id                  GET, PUT, DELETE
/// │       ├── PUT /edit
/// │       ├── PUT /assign-mechanic/:mechanic_id
/// │       ├── PUT /remove-mechanic/:mechanic_id
/// │       ├── /inventory                  POST, DELETE
/// │       └── /inventory/:inventory_id    POST, DELETE
/// └── /calculations/            GET
///     └── POST /add, /subtract, /multiply, /divide
/// ```
///
/// `*` marks routes that require a bearer token.
///
/// # Middleware Stack
///
/// Applied in order (outermost first):
/// 1. Security headers
/// 2. CORS (tower-http CorsLayer)
/// 3. Logging (tower-http TraceLayer)
/// 4. Rate limiting (reads/writes by method, dedicated budgets per route
///    group; the calculator has its own 100/min budget)
/// 5. Authentication (per-route basis)
pub fn build_router(state: AppState) -> Router {
    use crate::routes::{
        calculations, customers, health, inventory, members, mechanics, service_tickets,
    };

    let auth = from_fn_with_state(state.clone(), jwt_auth_layer);
    let assignment_limit = from_fn_with_state(state.limiters.assignments.clone(), route_limit_layer);
    let enrollment_limit = from_fn_with_state(state.limiters.enrollment.clone(), route_limit_layer);
    let mechanic_creation_limit =
        from_fn_with_state(state.limiters.mechanic_creation.clone(), route_limit_layer);

    // Customers
    let api = collection(
        Router::new(),
        "/customers",
        post(customers::create_customer).get(customers::list_customers),
    )
    .route("/customers/login", post(customers::login))
    .route(
        "/customers/:id",
        put(customers::update_customer)
            .delete(customers::delete_customer)
            .route_layer(auth.clone())
            .get(customers::get_customer),
    )
    .route(
        "/customers/:id/service-tickets",
        get(customers::customer_tickets),
    );

    // Mechanics
    let api = collection(
        api,
        "/mechanics",
        post(mechanics::create_mechanic)
            .route_layer(mechanic_creation_limit)
            .get(mechanics::list_mechanics),
    )
    .route("/mechanics/by-workload", get(mechanics::mechanics_by_workload))
    .route(
        "/mechanics/:id",
        get(mechanics::get_mechanic)
            .put(mechanics::update_mechanic)
            .delete(mechanics::delete_mechanic),
    );

    // Inventory
    let api = collection(
        api,
        "/inventory",
        post(inventory::create_item).get(inventory::list_items),
    )
    .route(
        "/inventory/:id",
        get(inventory::get_item)
            .put(inventory::update_item)
            .delete(inventory::delete_item),
    );

    // Members
    let api = collection(
        api,
        "/members",
        post(members::create_member)
            .route_layer(auth.clone())
            .route_layer(enrollment_limit)
            .get(members::list_members),
    )
    .route(
        "/members/:id",
        put(members::update_member)
            .delete(members::delete_member)
            .route_layer(auth)
            .get(members::get_member),
    );

    // Service tickets
    let api = collection(
        api,
        "/service-tickets",
        post(service_tickets::create_ticket).get(service_tickets::list_tickets),
    )
    .route(
        "/service-tickets/:id",
        get(service_tickets::get_ticket)
            .put(service_tickets::update_ticket)
            .delete(service_tickets::delete_ticket),
    )
    .route(
        "/service-tickets/:id/edit",
        put(service_tickets::edit_mechanics).route_layer(assignment_limit.clone()),
    )
    .route(
        "/service-tickets/:id/assign-mechanic/:mechanic_id",
        put(service_tickets::assign_mechanic).route_layer(assignment_limit.clone()),
    )
    .route(
        "/service-tickets/:id/remove-mechanic/:mechanic_id",
        put(service_tickets::remove_mechanic).route_layer(assignment_limit),
    )
    .route(
        "/service-tickets/:id/inventory",
        post(service_tickets::add_inventory).delete(service_tickets::remove_inventory),
    )
    .route(
        "/service-tickets/:id/inventory/:inventory_id",
        post(service_tickets::add_inventory_item).delete(service_tickets::remove_inventory_item),
    )
    .route_layer(from_fn_with_state(state.limiters.clone(), rate_limit_layer));

    // Calculator utility, outside the reads/writes budgets
    let calculator = collection(Router::new(), "/calculations", get(calculations::list_operations))
        .route("/calculations/add", post(calculations::add))
        .route("/calculations/subtract", post(calculations::subtract))
        .route("/calculations/multiply", post(calculations::multiply))
        .route("/calculations/divide", post(calculations::divide))
        .route_layer(from_fn_with_state(
            state.limiters.calculations.clone(),
            route_limit_layer,
        ));

    // Configure CORS based on environment
    let cors = if state.config.cors_permissive() {
        // Development mode: permissive CORS
        CorsLayer::permissive()
    } else {
        // Production mode: configure allowed origins
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .max_age(std::time::Duration::from_secs(3600))
    };

    let production = state.config.api.production;

    // Combine all routes with middleware stack
    Router::new()
        .route("/health", get(health::health_check))
        .merge(api)
        .merge(calculator)
        .fallback(not_found)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(SecurityHeadersLayer::new(production))
        .with_state(state)
}

async fn not_found() -> ApiError {
    ApiError::NotFound("Resource not found".to_string())
}

/// JWT authentication middleware layer
///
/// Validates the bearer token and injects the `AuthContext` into the
/// request extensions.
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth = authenticate(req.headers(), state.jwt_secret())?;

    tracing::debug!(customer_id = auth.customer_id, "Authenticated request");
    req.extensions_mut().insert(auth);

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode};
    use serde_json::{json, Value};
    use shopfloor_shared::{
        auth::jwt::{create_token, Claims},
        db::pool::{create_lazy_pool, DatabaseConfig},
    };
    use std::time::Duration;
    use tower::ServiceExt;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    /// Router over a pool that never connects; only paths that fail before
    /// touching the database are exercised here.
    fn test_router() -> Router {
        let config = Config::for_testing("postgresql://localhost:1/unreachable", SECRET);
        let pool = create_lazy_pool(&DatabaseConfig::new(config.database.url.clone())).unwrap();
        let cache = ListingCache::in_memory(Duration::from_secs(60));
        build_router(AppState::new(pool, config, cache))
    }

    async fn send(
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value, axum::http::HeaderMap) {
        let mut builder = axum::http::Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        let response = test_router()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json, headers)
    }

    #[tokio::test]
    async fn test_router_can_be_built_repeatedly() {
        let _first = test_router();
        let _second = test_router();
    }

    #[tokio::test]
    async fn test_unknown_route_is_json_404() {
        let (status, body, headers) = send("GET", "/nope", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Resource not found");
        assert_eq!(headers.get("X-Content-Type-Options").unwrap(), "nosniff");
    }

    #[tokio::test]
    async fn test_protected_customer_routes_require_token() {
        let (status, body, _) = send("PUT", "/customers/1", None, Some(json!({}))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Token is missing");

        let (status, _, _) = send("DELETE", "/customers/1", Some("not-a-jwt"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_member_enrollment_requires_token() {
        let (status, _, _) = send("POST", "/members/", None, Some(json!({"customer_id": 1}))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_token_for_other_customer_is_forbidden() {
        let token = create_token(&Claims::new(7, "seven@example.com"), SECRET).unwrap();
        let (status, body, _) = send(
            "PUT",
            "/customers/8",
            Some(&token),
            Some(json!({"first_name": "Eve"})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "Unauthorized access");
    }

    #[tokio::test]
    async fn test_calculations_need_no_database() {
        let (status, body, _) = send("GET", "/calculations/", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["operations"].is_array());

        let (status, body, _) = send(
            "POST",
            "/calculations/divide",
            None,
            Some(json!({"numbers": [10, 2, 0]})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Division by zero");
    }

    fn limited_router() -> Router {
        let mut config = Config::for_testing("postgresql://localhost:1/unreachable", SECRET);
        config.rate_limit.enabled = true;
        let pool = create_lazy_pool(&DatabaseConfig::new(config.database.url.clone())).unwrap();
        let cache = ListingCache::in_memory(Duration::from_secs(60));
        build_router(AppState::new(pool, config, cache))
    }

    async fn post_status(app: &Router, uri: &str, body: Value) -> StatusCode {
        let request = axum::http::Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        app.clone().oneshot(request).await.unwrap().status()
    }

    #[tokio::test(start_paused = true)]
    async fn test_mechanic_creation_has_its_own_budget() {
        let app = limited_router();
        // fails validation, so the handler never reaches the database
        let body = json!({"name": "", "email": "mech@example.com", "salary": 1});

        for _ in 0..10 {
            assert_eq!(post_status(&app, "/mechanics/", body.clone()).await, StatusCode::BAD_REQUEST);
        }
        assert_eq!(
            post_status(&app, "/mechanics/", body).await,
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_calculations_are_outside_the_writes_budget() {
        let app = limited_router();
        let body = json!({"numbers": [1, 2]});

        for _ in 0..100 {
            assert_eq!(post_status(&app, "/calculations/add", body.clone()).await, StatusCode::OK);
        }
        assert_eq!(
            post_status(&app, "/calculations/add", body).await,
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[tokio::test]
    async fn test_customer_validation_happens_before_database() {
        let (status, body, _) = send(
            "POST",
            "/customers/",
            None,
            Some(json!({"first_name": "Ada", "last_name": "Lovelace", "email": "not-an-email"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"][0]["field"], "email");
    }

    #[tokio::test]
    async fn test_collection_routes_accept_both_slash_forms() {
        let (with_slash, _, _) = send("GET", "/calculations/", None, None).await;
        let (without_slash, _, _) = send("GET", "/calculations", None, None).await;
        assert_eq!(with_slash, StatusCode::OK);
        assert_eq!(without_slash, StatusCode::OK);
    }
}
