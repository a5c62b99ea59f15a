//! Connection descriptors: how a request says which database to reach.

use std::fmt;

use serde::Deserialize;

use crate::error::{CoreError, Result};
use crate::lenient;

/// Default PostgreSQL port when a descriptor leaves it out.
pub const DEFAULT_PORT: u16 = 5432;

/// Default user when a descriptor leaves it out.
pub const DEFAULT_USER: &str = "postgres";

/// Caller-supplied connection descriptor, exactly as posted.
///
/// Every field is optional at this stage. [`ConnectionDescriptor::validate`]
/// turns it into a [`ConnectionTarget`] or a configuration error.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ConnectionDescriptor {
    #[serde(default)]
    pub host: Option<String>,

    #[serde(default, deserialize_with = "lenient::opt_port")]
    pub port: Option<u16>,

    #[serde(default, alias = "user")]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(default)]
    pub database: Option<String>,

    #[serde(
        default,
        rename = "useTLS",
        alias = "useTls",
        alias = "ssl",
        deserialize_with = "lenient::opt_flag"
    )]
    pub use_tls: Option<bool>,
}

fn filled(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl ConnectionDescriptor {
    /// True when the body carried nothing that identifies a database.
    ///
    /// Endpoints that take the descriptor as their whole (optional) body
    /// fall back to the default pool in this case.
    pub fn is_blank(&self) -> bool {
        filled(&self.host).is_none()
            && filled(&self.database).is_none()
            && filled(&self.username).is_none()
            && self.port.is_none()
    }

    /// Check required fields and fill in defaults.
    pub fn validate(&self) -> Result<ConnectionTarget> {
        let host = filled(&self.host).ok_or_else(|| CoreError::missing_field("host"))?;
        let database =
            filled(&self.database).ok_or_else(|| CoreError::missing_field("database"))?;

        Ok(ConnectionTarget {
            host: host.to_string(),
            port: self.port.unwrap_or(DEFAULT_PORT),
            username: filled(&self.username).unwrap_or(DEFAULT_USER).to_string(),
            password: self.password.clone().unwrap_or_default(),
            database: database.to_string(),
            use_tls: self.use_tls.unwrap_or(false),
        })
    }
}

impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionDescriptor")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("database", &self.database)
            .field("use_tls", &self.use_tls)
            .finish()
    }
}

/// A complete, validated set of connection parameters.
///
/// Built either from a request descriptor or from the environment
/// configuration of the default pool.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionTarget {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
    pub use_tls: bool,
}

impl ConnectionTarget {
    /// `user@host:port/database`, safe to log.
    pub fn label(&self) -> String {
        format!(
            "{}@{}:{}/{}",
            self.username, self.host, self.port, self.database
        )
    }
}

impl fmt::Debug for ConnectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionTarget")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("use_tls", &self.use_tls)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> ConnectionDescriptor {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn full_descriptor_validates() {
        let target = parse(json!({
            "host": "erp.internal",
            "port": 6432,
            "username": "planner",
            "password": "secret",
            "database": "erp",
            "useTLS": true
        }))
        .validate()
        .unwrap();

        assert_eq!(target.host, "erp.internal");
        assert_eq!(target.port, 6432);
        assert_eq!(target.username, "planner");
        assert_eq!(target.password, "secret");
        assert_eq!(target.database, "erp");
        assert!(target.use_tls);
        assert_eq!(target.label(), "planner@erp.internal:6432/erp");
    }

    #[test]
    fn defaults_fill_optional_fields() {
        let target = parse(json!({"host": "db", "database": "erp"}))
            .validate()
            .unwrap();
        assert_eq!(target.port, DEFAULT_PORT);
        assert_eq!(target.username, DEFAULT_USER);
        assert_eq!(target.password, "");
        assert!(!target.use_tls);
    }

    #[test]
    fn node_style_aliases_are_accepted() {
        let target = parse(json!({
            "host": "db",
            "port": "5433",
            "user": "ops",
            "database": "erp",
            "ssl": "true"
        }))
        .validate()
        .unwrap();
        assert_eq!(target.port, 5433);
        assert_eq!(target.username, "ops");
        assert!(target.use_tls);
    }

    #[test]
    fn missing_host_is_configuration_error() {
        let err = parse(json!({"database": "erp"})).validate().unwrap_err();
        assert_eq!(err, CoreError::missing_field("host"));

        let err = parse(json!({"host": "  ", "database": "erp"}))
            .validate()
            .unwrap_err();
        assert_eq!(err, CoreError::missing_field("host"));
    }

    #[test]
    fn missing_database_is_configuration_error() {
        let err = parse(json!({"host": "db"})).validate().unwrap_err();
        assert_eq!(err, CoreError::missing_field("database"));
    }

    #[test]
    fn blank_detection() {
        assert!(parse(json!({})).is_blank());
        assert!(parse(json!({"host": "", "password": "x"})).is_blank());
        assert!(!parse(json!({"host": "db"})).is_blank());
        assert!(!parse(json!({"database": "erp"})).is_blank());
    }

    #[test]
    fn debug_output_redacts_password() {
        let descriptor = parse(json!({"host": "db", "database": "erp", "password": "hunter2"}));
        let rendered = format!("{:?} {:?}", descriptor, descriptor.validate().unwrap());
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }
}
