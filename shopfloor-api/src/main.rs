//! # Shopfloor API Server
//!
//! REST API for a mechanic shop: customers, mechanics, inventory, members
//! and service tickets, with bulk assignment of mechanics and parts to
//! tickets.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgresql://localhost/shopfloor \
//! JWT_SECRET=change-me-to-at-least-32-characters \
//! cargo run -p shopfloor-api
//! ```

use shopfloor_api::{
    app::{build_router, AppState},
    config::Config,
};
use shopfloor_shared::{
    cache::ListingCache,
    db::{
        migrations::run_migrations,
        pool::{close_pool, create_pool, DatabaseConfig},
    },
};
use std::{net::SocketAddr, time::Duration};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "shopfloor_api=debug,shopfloor_shared=debug,tower_http=debug".into()
    });

    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn build_cache(config: &Config) -> anyhow::Result<ListingCache> {
    let ttl = Duration::from_secs(config.cache.ttl_seconds);

    let cache = match config.cache.redis_url.as_deref() {
        Some(url) => {
            let cache = ListingCache::redis(url, ttl).await?;
            tracing::info!("Listing cache backed by Redis");
            cache
        }
        None => {
            tracing::info!("Listing cache held in memory");
            ListingCache::in_memory(ttl)
        }
    };

    Ok(cache.with_namespace_ttl(
        "mechanics",
        Duration::from_secs(config.cache.mechanics_ttl_seconds),
    ))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing(config.api.json_logs);

    tracing::info!(
        "Shopfloor API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let pool = create_pool(DatabaseConfig {
        max_connections: config.database.max_connections,
        ..DatabaseConfig::new(config.database.url.clone())
    })
    .await?;

    if config.database.run_migrations {
        run_migrations(&pool).await?;
    }

    let cache = build_cache(&config).await?;
    let addr = config.bind_address();

    let state = AppState::new(pool.clone(), config, cache);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    close_pool(pool).await;
    tracing::info!("Server stopped");

    Ok(())
}
