//! Connection test endpoint

use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use serde::Serialize;
use serde_json::Value;

use crate::db::server_time;
use crate::http::error::ApiError;
use crate::http::extractors::OptionalDescriptor;
use crate::http::server::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionCheck {
    pub success: bool,
    pub message: &'static str,
    pub server_time: Value,
}

/// POST /test-connection - probe the database the body describes
///
/// Always builds an ephemeral pool; a missing body is a descriptor with
/// no host, which fails validation.
async fn test_connection(
    State(state): State<Arc<AppState>>,
    OptionalDescriptor(descriptor): OptionalDescriptor,
) -> Result<Json<ConnectionCheck>, ApiError> {
    let descriptor = descriptor.unwrap_or_default();
    let server_time = server_time(&state.gateway, Some(&descriptor)).await?;

    Ok(Json(ConnectionCheck {
        success: true,
        message: "Connection successful",
        server_time,
    }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/test-connection", post(test_connection))
}
