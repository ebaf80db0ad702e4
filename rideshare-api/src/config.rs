//! Configuration management for the API server
//!
//! Configuration is read from environment variables once at startup. A
//! `.env` file in the working directory is loaded first, if present.
//!
//! # Environment Variables
//!
//! - `API_HOST`: Host to bind to (default: 0.0.0.0)
//! - `API_PORT`: Port to bind to (default: 8080)
//! - `API_PRODUCTION`: Enables HSTS (default: false)
//! - `CORS_ORIGINS`: Comma-separated allowed origins, `*` for any (default: `*`)
//! - `DATABASE_URL`: PostgreSQL connection string (required)
//! - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
//! - `REDIS_URL`: Redis for the shared count cache (optional)
//! - `COUNT_CACHE_TTL_SECS`: Lifetime of a cached pagination count (default: 300)
//! - `EVENT_WINDOW_HOURS`: Age limit of "recent" ride events (default: 24)
//! - `RUST_LOG`: Log filter
//!
//! # Example
//!
//! ```no_run
//! use rideshare_api::config::Config;
//!
//! # fn example() -> anyhow::Result<()> {
//! let config = Config::from_env()?;
//! println!("Server will listen on {}", config.bind_address());
//! # Ok(())
//! # }
//! ```

use std::env;
use std::str::FromStr;
use std::time::Duration;

use rideshare_shared::cache::DEFAULT_COUNT_TTL;

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Count cache configuration
    pub cache: CacheConfig,

    /// Ride event window configuration
    pub events: EventsConfig,
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Production mode (adds HSTS)
    pub production: bool,

    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// Count cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Redis URL; the in-process cache is used when unset
    pub redis_url: Option<String>,

    /// Lifetime of a cached count
    pub count_ttl: Duration,
}

/// Ride event window configuration
#[derive(Debug, Clone)]
pub struct EventsConfig {
    /// Events younger than this are "recent"
    pub window: chrono::Duration,
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if `DATABASE_URL` is missing or a numeric variable
    /// doesn't parse.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        let host = env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 = parse_var("API_PORT", 8080)?;
        let production: bool = parse_var("API_PRODUCTION", false)?;
        let cors_origins = parse_origins(
            &env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string()),
        );

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;
        let max_connections: u32 = parse_var("DATABASE_MAX_CONNECTIONS", 10)?;

        let redis_url = env::var("REDIS_URL").ok().filter(|url| !url.trim().is_empty());
        let ttl_secs: u64 = parse_var("COUNT_CACHE_TTL_SECS", DEFAULT_COUNT_TTL.as_secs())?;

        let window_hours: i64 = parse_var("EVENT_WINDOW_HOURS", 24)?;
        if window_hours <= 0 {
            anyhow::bail!("EVENT_WINDOW_HOURS must be positive");
        }

        Ok(Self {
            api: ApiConfig {
                host,
                port,
                production,
                cors_origins,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            cache: CacheConfig {
                redis_url,
                count_ttl: Duration::from_secs(ttl_secs),
            },
            events: EventsConfig {
                window: chrono::Duration::hours(window_hours),
            },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

fn parse_var<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Invalid {}: {}", name, e)),
        _ => Ok(default),
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        api: ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            production: false,
            cors_origins: vec!["*".to_string()],
        },
        database: DatabaseConfig {
            url: "postgresql://localhost/rideshare_test".to_string(),
            max_connections: 10,
        },
        cache: CacheConfig {
            redis_url: None,
            count_ttl: DEFAULT_COUNT_TTL,
        },
        events: EventsConfig {
            window: chrono::Duration::hours(24),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_address() {
        assert_eq!(test_config().bind_address(), "127.0.0.1:8080");
    }

    #[test]
    fn test_parse_origins() {
        assert_eq!(parse_origins("*"), vec!["*"]);
        assert_eq!(
            parse_origins("https://a.example, https://b.example,"),
            vec!["https://a.example", "https://b.example"]
        );
        assert!(parse_origins("").is_empty());
    }

    #[test]
    fn test_parse_var_defaults_when_unset() {
        let value: u16 = parse_var("RIDESHARE_TEST_UNSET_VARIABLE", 42).unwrap();
        assert_eq!(value, 42);
    }
}
