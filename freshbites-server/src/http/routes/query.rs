//! Raw SQL endpoint

use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use freshbites_core::{ConnectionDescriptor, Row};
use serde::{Deserialize, Serialize};

use crate::db::QueryParam;
use crate::http::error::ApiError;
use crate::http::extractors::JsonBody;
use crate::http::server::AppState;

/// Body of `POST /erp-data`
#[derive(Deserialize)]
pub struct ErpDataRequest {
    pub query: String,
    #[serde(default)]
    pub params: Vec<QueryParam>,
    #[serde(default)]
    pub config: Option<ConnectionDescriptor>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErpDataResponse {
    pub success: bool,
    pub results: Vec<Row>,
    pub row_count: u64,
}

/// POST /erp-data - run caller SQL on the default or a described database
async fn erp_data(
    State(state): State<Arc<AppState>>,
    JsonBody(request): JsonBody<ErpDataRequest>,
) -> Result<Json<ErpDataResponse>, ApiError> {
    let target = request.config.as_ref().filter(|d| !d.is_blank());
    let result = state
        .gateway
        .run_raw(target, &request.query, &request.params)
        .await
        .map_err(|e| ApiError::with_query(e, request.query.as_str()))?;

    Ok(Json(ErpDataResponse {
        success: true,
        results: result.rows,
        row_count: result.row_count,
    }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/erp-data", post(erp_data))
}
