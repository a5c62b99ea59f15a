//! Structured error types for freshbites-core.
//!
//! Uses `thiserror` so the server crate can wrap these in its own
//! gateway errors; the CLI converts them with `anyhow`.

use thiserror::Error;

/// Main error type for freshbites-core operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Connection descriptor or environment value is missing or invalid
    #[error("Configuration error: {reason}")]
    Configuration { reason: String },

    /// CSV export could not derive a header line
    #[error("Export error: {reason}")]
    Export { reason: String },
}

/// Result type alias for freshbites-core operations
pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    /// Create a missing field error for a connection descriptor
    pub fn missing_field(field: &str) -> Self {
        Self::Configuration {
            reason: format!("connection descriptor is missing '{}'", field),
        }
    }

    /// Create an export error
    pub fn export(reason: impl Into<String>) -> Self {
        Self::Export {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::missing_field("host");
        assert_eq!(
            err.to_string(),
            "Configuration error: connection descriptor is missing 'host'"
        );

        let err = CoreError::export("no rows to derive a header from");
        assert!(err.to_string().starts_with("Export error"));
    }
}
