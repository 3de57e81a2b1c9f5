/// Database layer for Shopfloor
///
/// # Modules
///
/// - `pool`: PostgreSQL connection pool construction and health checks
/// - `migrations`: Embedded schema migrations
///
/// Models live in the `models` module at crate root level.
///
/// # Example
///
/// ```no_run
/// use shopfloor_shared::db::{migrations::run_migrations, pool::{create_pool, DatabaseConfig}};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::new(std::env::var("DATABASE_URL")?)).await?;
/// run_migrations(&pool).await?;
/// # Ok(())
/// # }
/// ```

pub mod migrations;
pub mod pool;
