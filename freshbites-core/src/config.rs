//! Environment configuration for the gateway.
//!
//! Every setting has a fallback, so a bare environment still yields a
//! usable config pointing at a local PostgreSQL.

use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::descriptor::{ConnectionTarget, DEFAULT_PORT, DEFAULT_USER};
use crate::lenient::parse_flag;

/// Default HTTP listen port.
pub const DEFAULT_LISTEN_PORT: u16 = 3001;

/// Load environment variables from a `.env` file in the current directory.
///
/// Variables already present in the process environment win; a missing
/// file is `Ok(None)`. Nothing is logged here so this can run before the
/// subscriber exists; pass the outcome to [`log_dotenv`] afterwards.
pub fn load_dotenv() -> Result<Option<PathBuf>, dotenvy::Error> {
    match dotenvy::dotenv() {
        Ok(path) => Ok(Some(path)),
        Err(e) if e.not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

pub fn log_dotenv(outcome: &Result<Option<PathBuf>, dotenvy::Error>) {
    match outcome {
        Ok(Some(path)) => info!("Loaded configuration from {}", path.display()),
        Ok(None) => debug!("No .env file found, using environment variables only"),
        Err(e) => warn!("Failed to read .env file: {}", e),
    }
}

/// Limits applied to every pool the registry builds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    pub max_connections: u32,
    /// How long a query waits for a pooled connection
    pub acquire_timeout: Duration,
    /// Bound on establishing a connection for an ephemeral pool, and on
    /// the direct attempt made to explain a pool timeout
    pub connect_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            acquire_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

/// Complete gateway configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Where the default pool points
    pub database: ConnectionTarget,
    pub pool: PoolConfig,
    pub bind_host: String,
    pub listen_port: u16,
    /// Whether `/api/erp-data` may run caller-supplied SQL
    pub allow_raw_sql: bool,
    /// Allow any CORS origin (otherwise localhost only)
    pub cors_permissive: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl GatewayConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`, falling back per key.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str, default: &str| -> String {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let database = ConnectionTarget {
            host: text("DB_HOST", "localhost"),
            port: parsed(&lookup, "DB_PORT", DEFAULT_PORT),
            username: text("DB_USER", DEFAULT_USER),
            password: lookup("DB_PASSWORD").unwrap_or_default(),
            database: text("DB_NAME", "postgres"),
            use_tls: flag(&lookup, "DB_SSL", false),
        };

        let pool = PoolConfig {
            max_connections: parsed(&lookup, "DB_POOL_MAX", 10u32).max(1),
            acquire_timeout: Duration::from_secs(parsed(&lookup, "DB_ACQUIRE_TIMEOUT_SECS", 30u64)),
            connect_timeout: Duration::from_secs(parsed(&lookup, "DB_CONNECT_TIMEOUT_SECS", 5u64)),
        };

        Self {
            database,
            pool,
            bind_host: text("BIND_HOST", "0.0.0.0"),
            listen_port: parsed(&lookup, "PORT", DEFAULT_LISTEN_PORT),
            allow_raw_sql: flag(&lookup, "ALLOW_RAW_SQL", true),
            cors_permissive: flag(&lookup, "CORS_PERMISSIVE", true),
        }
    }
}

fn parsed<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + std::fmt::Display + Copy,
{
    match lookup(key) {
        None => default,
        Some(raw) if raw.trim().is_empty() => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, fallback = %default, "Ignoring unparseable setting");
            default
        }),
    }
}

fn flag<F>(lookup: &F, key: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => default,
        Some(raw) if raw.trim().is_empty() => default,
        Some(raw) => parse_flag(&raw).unwrap_or_else(|| {
            warn!(key, value = %raw, fallback = default, "Ignoring unparseable flag");
            default
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> GatewayConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        GatewayConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn empty_environment_uses_fallbacks() {
        let config = config_from(&[]);
        assert_eq!(config.database.host, "localhost");
        assert_eq!(config.database.port, 5432);
        assert_eq!(config.database.username, "postgres");
        assert_eq!(config.database.password, "");
        assert_eq!(config.database.database, "postgres");
        assert!(!config.database.use_tls);
        assert_eq!(config.pool, PoolConfig::default());
        assert_eq!(config.bind_host, "0.0.0.0");
        assert_eq!(config.listen_port, DEFAULT_LISTEN_PORT);
        assert!(config.allow_raw_sql);
        assert!(config.cors_permissive);
    }

    #[test]
    fn environment_overrides_fallbacks() {
        let config = config_from(&[
            ("DB_HOST", "erp.internal"),
            ("DB_PORT", "6432"),
            ("DB_USER", "planner"),
            ("DB_PASSWORD", "secret"),
            ("DB_NAME", "freshbites"),
            ("DB_SSL", "true"),
            ("DB_POOL_MAX", "4"),
            ("DB_ACQUIRE_TIMEOUT_SECS", "5"),
            ("DB_CONNECT_TIMEOUT_SECS", "2"),
            ("PORT", "8080"),
            ("ALLOW_RAW_SQL", "false"),
            ("CORS_PERMISSIVE", "0"),
        ]);
        assert_eq!(config.database.label(), "planner@erp.internal:6432/freshbites");
        assert_eq!(config.database.password, "secret");
        assert!(config.database.use_tls);
        assert_eq!(config.pool.max_connections, 4);
        assert_eq!(config.pool.acquire_timeout, Duration::from_secs(5));
        assert_eq!(config.pool.connect_timeout, Duration::from_secs(2));
        assert_eq!(config.listen_port, 8080);
        assert!(!config.allow_raw_sql);
        assert!(!config.cors_permissive);
    }

    #[test]
    fn unparseable_values_fall_back() {
        let config = config_from(&[("DB_PORT", "five"), ("DB_SSL", "sometimes"), ("DB_POOL_MAX", "0")]);
        assert_eq!(config.database.port, 5432);
        assert!(!config.database.use_tls);
        assert_eq!(config.pool.max_connections, 1);
    }

    #[test]
    fn load_dotenv_doesnt_panic() {
        let outcome = load_dotenv();
        log_dotenv(&outcome);
    }
}
