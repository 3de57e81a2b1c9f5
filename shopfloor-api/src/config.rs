/// Configuration management for the API server
///
/// This module loads configuration from environment variables and provides
/// a type-safe configuration struct.
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `JWT_SECRET`: Secret key for JWT signing (required, at least 32 characters)
/// - `CORS_ORIGINS`: Comma-separated allowed origins, `*` for any (default: *)
/// - `PRODUCTION`: Enables HSTS (default: false)
/// - `RATE_LIMIT_ENABLED`: Per-IP request budgets (default: true)
/// - `CACHE_TTL_SECONDS`: Listing cache lifetime (default: 300)
/// - `MECHANICS_CACHE_TTL_SECONDS`: Mechanic listing lifetime (default: 600)
/// - `REDIS_URL`: Use Redis for the listing cache instead of process memory
/// - `RUN_MIGRATIONS`: Apply pending migrations on startup (default: true)
/// - `LOG_FORMAT`: `json` for JSON log lines, anything else for text
/// - `RUST_LOG`: Log filter
///
/// # Example
///
/// ```no_run
/// use shopfloor_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub rate_limit: RateLimitConfig,
    pub cache: CacheConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,

    /// Production mode (HSTS header)
    pub production: bool,

    /// Emit JSON log lines
    pub json_logs: bool,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,

    /// Run embedded migrations at startup
    pub run_migrations: bool,
}

/// JWT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Secret key for JWT signing
    ///
    /// Must be at least 32 bytes. Generate with: `openssl rand -hex 32`
    pub secret: String,
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
}

/// Listing cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub ttl_seconds: u64,

    /// Lifetime of mechanic listings, which change less often
    pub mechanics_ttl_seconds: u64,

    /// When set, cache in Redis instead of process memory
    pub redis_url: Option<String>,
}

/// Reads an optional variable, falling back to `default` when unset
fn parse_var<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{} has an invalid value '{}': {}", name, raw, e)),
        _ => Ok(default),
    }
}

/// Parses boolean flags: 1/0, true/false, yes/no, on/off
fn parse_flag(name: &str, default: bool) -> anyhow::Result<bool> {
    match env::var(name) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "" => Ok(default),
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => anyhow::bail!("{} must be a boolean, got '{}'", name, other),
        },
        Err(_) => Ok(default),
    }
}

/// Splits a comma-separated origin list
fn parse_origins(raw: &str) -> Vec<String> {
    let origins: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();

    if origins.is_empty() {
        vec!["*".to_string()]
    } else {
        origins
    }
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `DATABASE_URL` or `JWT_SECRET` is missing
    /// - `JWT_SECRET` is shorter than 32 characters
    /// - A variable has an unparseable value
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        let redis_url = env::var("REDIS_URL").ok().filter(|s| !s.trim().is_empty());

        Ok(Self {
            api: ApiConfig {
                host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_var("API_PORT", 8080)?,
                cors_origins: parse_origins(&env::var("CORS_ORIGINS").unwrap_or_default()),
                production: parse_flag("PRODUCTION", false)?,
                json_logs: env::var("LOG_FORMAT")
                    .map(|f| f.eq_ignore_ascii_case("json"))
                    .unwrap_or(false),
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: parse_var("DATABASE_MAX_CONNECTIONS", 10)?,
                run_migrations: parse_flag("RUN_MIGRATIONS", true)?,
            },
            jwt: JwtConfig { secret: jwt_secret },
            rate_limit: RateLimitConfig {
                enabled: parse_flag("RATE_LIMIT_ENABLED", true)?,
            },
            cache: CacheConfig {
                ttl_seconds: parse_var("CACHE_TTL_SECONDS", 300)?,
                mechanics_ttl_seconds: parse_var("MECHANICS_CACHE_TTL_SECONDS", 600)?,
                redis_url,
            },
        })
    }

    /// Configuration for tests and local tooling
    ///
    /// Rate limiting is off and the cache lives in memory.
    pub fn for_testing(database_url: impl Into<String>, jwt_secret: impl Into<String>) -> Self {
        Self {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors_origins: vec!["*".to_string()],
                production: false,
                json_logs: false,
            },
            database: DatabaseConfig {
                url: database_url.into(),
                max_connections: 5,
                run_migrations: true,
            },
            jwt: JwtConfig {
                secret: jwt_secret.into(),
            },
            rate_limit: RateLimitConfig { enabled: false },
            cache: CacheConfig {
                ttl_seconds: 300,
                mechanics_ttl_seconds: 600,
                redis_url: None,
            },
        }
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Whether CORS should allow any origin
    pub fn cors_permissive(&self) -> bool {
        self.api.cors_origins.iter().any(|o| o == "*")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_address() {
        let mut config = Config::for_testing(
            "postgresql://localhost/test",
            "test-secret-key-at-least-32-bytes-long",
        );
        config.api.port = 8080;

        assert_eq!(config.bind_address(), "127.0.0.1:8080");
    }

    #[test]
    fn test_parse_origins() {
        assert_eq!(parse_origins(""), vec!["*"]);
        assert_eq!(
            parse_origins("https://a.test, https://b.test ,"),
            vec!["https://a.test", "https://b.test"]
        );
    }

    #[test]
    fn test_cors_permissive() {
        let mut config = Config::for_testing("postgresql://localhost/test", "x".repeat(32));
        assert!(config.cors_permissive());

        config.api.cors_origins = vec!["https://shop.test".to_string()];
        assert!(!config.cors_permissive());
    }

    #[test]
    fn test_parse_var_default_when_unset() {
        let value: u16 = parse_var("SHOPFLOOR_TEST_UNSET_PORT_VAR", 9000).unwrap();
        assert_eq!(value, 9000);
        assert!(parse_flag("SHOPFLOOR_TEST_UNSET_FLAG_VAR", true).unwrap());
    }
}
