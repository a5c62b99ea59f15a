//! API error types with IntoResponse
//!
//! Every failure leaves as the `{success: false, error, query?}` envelope.
//! Gateway failures on JSON endpoints keep status 200 so existing clients
//! can branch on `success` alone; the other variants carry a real status.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::db::GatewayError;

/// Failure body shared by every endpoint
#[derive(Debug, Serialize)]
pub struct Failure {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

/// API error type with automatic HTTP status mapping
#[derive(Debug)]
pub enum ApiError {
    /// Body was not valid JSON for the endpoint (400)
    BadRequest { message: String },

    /// Gateway failure (200, or 403 when raw SQL is disabled)
    Gateway {
        error: GatewayError,
        query: Option<String>,
    },

    /// CSV export failed (500)
    Export(GatewayError),
}

impl ApiError {
    /// Gateway failure that echoes the offending SQL back to the caller.
    pub fn with_query(error: GatewayError, query: impl Into<String>) -> Self {
        Self::Gateway {
            error,
            query: Some(query.into()),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Gateway {
                error: GatewayError::Disabled,
                ..
            } => StatusCode::FORBIDDEN,
            Self::Gateway { .. } => StatusCode::OK,
            Self::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            Self::BadRequest { message } => {
                tracing::debug!(error = %message, "Rejected request body");
                Failure {
                    success: false,
                    error: message,
                    query: None,
                }
            }
            Self::Gateway { error, query } => {
                tracing::warn!(kind = error.kind(), error = %error, "Gateway request failed");
                Failure {
                    success: false,
                    error: error.to_string(),
                    query,
                }
            }
            Self::Export(error) => {
                tracing::error!(error = %error, "Ledger export failed");
                Failure {
                    success: false,
                    error: error.to_string(),
                    query: None,
                }
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<GatewayError> for ApiError {
    fn from(error: GatewayError) -> Self {
        Self::Gateway { error, query: None }
    }
}
