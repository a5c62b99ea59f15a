//! Forecast feedback endpoint

use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use chrono::Local;
use freshbites_core::{FeedbackEntry, FeedbackRequest};
use serde::Serialize;

use crate::db::LedgerRepo;
use crate::http::error::ApiError;
use crate::http::extractors::JsonBody;
use crate::http::server::AppState;

#[derive(Serialize)]
pub struct FeedbackResponse {
    pub success: bool,
    pub message: &'static str,
    pub feedback: FeedbackEntry,
}

/// POST /feedback - derive a ledger row and append it to the default database
async fn feedback(
    State(state): State<Arc<AppState>>,
    JsonBody(request): JsonBody<FeedbackRequest>,
) -> Result<Json<FeedbackResponse>, ApiError> {
    let entry = request.to_entry(Local::now().date_naive());
    if entry.sku.is_empty() {
        tracing::warn!(product = %request.product, "Unrecognised product, recording empty sku");
    }

    LedgerRepo::new(state.gateway.registry().default_pool())
        .insert(&entry)
        .await?;

    Ok(Json(FeedbackResponse {
        success: true,
        message: "Feedback recorded",
        feedback: entry,
    }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/feedback", post(feedback))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn response_nests_the_recorded_row() {
        let response = FeedbackResponse {
            success: true,
            message: "Feedback recorded",
            feedback: FeedbackEntry {
                week: 42,
                sku: "SKU003_Cheese".into(),
                dc: "Mumbai".into(),
                naive_forecast: 100.0,
                festival_adjusted_forecast: 80.0,
                actual: 120.0,
            },
        };

        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "success": true,
                "message": "Feedback recorded",
                "feedback": {
                    "week": 42,
                    "sku": "SKU003_Cheese",
                    "dc": "Mumbai",
                    "naive_forecast": 100.0,
                    "festival_adjusted_forecast": 80.0,
                    "actual": 120.0
                }
            })
        );
    }
}
