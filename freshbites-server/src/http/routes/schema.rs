//! Schema introspection and sample rows

use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use freshbites_core::Row;
use serde::Serialize;

use crate::db::ledger::SAMPLE_SQL;
use crate::db::{introspect, Schema};
use crate::http::error::ApiError;
use crate::http::extractors::OptionalDescriptor;
use crate::http::server::AppState;

#[derive(Serialize)]
pub struct SchemaResponse {
    pub success: bool,
    pub schema: Schema,
}

#[derive(Serialize)]
pub struct SampleResponse {
    pub success: bool,
    pub results: Vec<Row>,
    pub message: String,
}

/// POST /schema - tables and columns of the `public` schema
async fn schema(
    State(state): State<Arc<AppState>>,
    OptionalDescriptor(descriptor): OptionalDescriptor,
) -> Result<Json<SchemaResponse>, ApiError> {
    let schema = introspect(&state.gateway, descriptor.as_ref()).await?;
    tracing::debug!(tables = schema.tables().count(), "Introspected schema");

    Ok(Json(SchemaResponse {
        success: true,
        schema,
    }))
}

/// POST /sample-data - first ledger rows
async fn sample_data(
    State(state): State<Arc<AppState>>,
    OptionalDescriptor(descriptor): OptionalDescriptor,
) -> Result<Json<SampleResponse>, ApiError> {
    let result = state.gateway.run(descriptor.as_ref(), SAMPLE_SQL, &[]).await?;

    Ok(Json(SampleResponse {
        success: true,
        message: format!("Fetched {} sample rows from baseline_forecast", result.rows.len()),
        results: result.rows,
    }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/schema", post(schema))
        .route("/sample-data", post(sample_data))
}
