//! Ledger export and forecast accuracy

use std::sync::Arc;

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::db::LedgerRepo;
use crate::http::error::ApiError;
use crate::http::server::AppState;

pub const EXPORT_FILENAME: &str = "baseline_forecast_export.csv";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccuracyResponse {
    pub success: bool,
    pub rows: usize,
    pub naive_mape: Option<f64>,
    pub adjusted_mape: Option<f64>,
    pub improvement: Option<f64>,
}

/// GET /export-baseline - the whole ledger as a CSV attachment
async fn export_baseline(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let csv = LedgerRepo::new(state.gateway.registry().default_pool())
        .export_csv()
        .await
        .map_err(ApiError::Export)?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", EXPORT_FILENAME),
            ),
        ],
        csv,
    )
        .into_response())
}

/// GET /forecast-accuracy - MAPE of naive vs festival-adjusted forecasts
async fn forecast_accuracy(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AccuracyResponse>, ApiError> {
    let report = LedgerRepo::new(state.gateway.registry().default_pool())
        .accuracy()
        .await?;

    Ok(Json(match report {
        Some(report) => AccuracyResponse {
            success: true,
            rows: report.rows,
            naive_mape: Some(report.naive_mape),
            adjusted_mape: Some(report.adjusted_mape),
            improvement: Some(report.improvement),
        },
        None => AccuracyResponse {
            success: true,
            rows: 0,
            naive_mape: None,
            adjusted_mape: None,
            improvement: None,
        },
    }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/export-baseline", get(export_baseline))
        .route("/forecast-accuracy", get(forecast_accuracy))
}
