//! Gateway error taxonomy and driver error classification

use freshbites_core::CoreError;

/// Every failure the gateway reports to its callers.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Connection descriptor missing required fields
    #[error("{0}")]
    Configuration(String),

    /// Database unreachable, refused the credentials or the pool gave up
    #[error("{0}")]
    Connection(#[source] sqlx::Error),

    /// Statement failed inside the database
    #[error("{0}")]
    Query(#[source] sqlx::Error),

    /// No rows to derive an export header from
    #[error("{0}")]
    Export(String),

    /// Raw SQL capability switched off
    #[error("raw SQL execution is disabled on this gateway")]
    Disabled,
}

impl GatewayError {
    /// Short machine-readable kind, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Connection(_) => "connection",
            Self::Query(_) => "query",
            Self::Export(_) => "export",
            Self::Disabled => "disabled",
        }
    }
}

impl From<sqlx::Error> for GatewayError {
    fn from(e: sqlx::Error) -> Self {
        if is_connection_failure(&e) {
            Self::Connection(e)
        } else {
            Self::Query(e)
        }
    }
}

impl From<CoreError> for GatewayError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::Configuration { reason } => Self::Configuration(reason),
            CoreError::Export { reason } => Self::Export(reason),
        }
    }
}

/// SQLSTATE classes that mean "could not get a usable session".
///
/// 08: connection exception, 28: invalid authorization,
/// 3D000: unknown database, 57P03: server starting up.
fn is_connection_sqlstate(code: &str) -> bool {
    code.starts_with("08") || code.starts_with("28") || code == "3D000" || code == "57P03"
}

fn is_connection_failure(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db) => db.code().is_some_and(|code| is_connection_sqlstate(&code)),
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::Protocol(_)
        | sqlx::Error::Configuration(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_errors_are_connection_failures() {
        assert!(matches!(
            GatewayError::from(sqlx::Error::PoolTimedOut),
            GatewayError::Connection(_)
        ));
        assert!(matches!(
            GatewayError::from(sqlx::Error::PoolClosed),
            GatewayError::Connection(_)
        ));
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        assert!(matches!(GatewayError::from(sqlx::Error::Io(io)), GatewayError::Connection(_)));
    }

    #[test]
    fn row_errors_are_query_failures() {
        let err = GatewayError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, GatewayError::Query(_)));
        assert_eq!(err.kind(), "query");
    }

    #[test]
    fn sqlstate_classes() {
        assert!(is_connection_sqlstate("28P01"));
        assert!(is_connection_sqlstate("3D000"));
        assert!(is_connection_sqlstate("08006"));
        assert!(!is_connection_sqlstate("42P01"));
        assert!(!is_connection_sqlstate("23505"));
    }

    #[test]
    fn core_errors_keep_their_reason() {
        let err = GatewayError::from(CoreError::missing_field("database"));
        assert!(matches!(err, GatewayError::Configuration(_)));
        assert_eq!(err.to_string(), "connection descriptor is missing 'database'");
    }
}
