//! POST /feedback

use axum::{extract::State, routing::post, Json, Router};
use chrono::Utc;
use serde_json::{json, Value};

use crate::models::{FeedbackRecord, FeedbackRequest};
use crate::{ApiError, ApiResult, AppState};

/// Append the submitted feedback to the log
pub async fn submit_feedback(
    State(state): State<AppState>,
    Json(request): Json<FeedbackRequest>,
) -> ApiResult<Json<Value>> {
    let record = FeedbackRecord::from_request(request, Utc::now());

    state.feedback_log.append(&record).await.map_err(|e| {
        ApiError::Internal(format!("Failed to store feedback: {}", e))
    })?;

    tracing::info!(sku = ?record.sku, feedback = ?record.feedback, "Feedback stored");
    Ok(Json(json!({ "status": "success" })))
}

pub fn feedback_routes() -> Router<AppState> {
    Router::new().route("/feedback", post(submit_feedback))
}
