//! Analysis job endpoints
//!
//! - POST /analyze/:sku - start a job, returns immediately
//! - GET /status/:job_id - poll stage progress
//! - GET /results/:job_id - final result, only once complete
//! - GET /summary/:job_id - narrative summary generated on demand

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

use crate::models::{AnalysisResult, CleanSubsteps, Job, JobStatus, Stage, StatsSummary};
use crate::services::{validate_sku, SummarizeOutcome, ERROR_MARKER};
use crate::{ApiError, ApiResult, AppState};

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub job_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: JobStatus,
    /// Position of the current stage in the pipeline (0-based)
    pub step: u8,
    pub stage: Stage,
    /// Only present while the job is in the clean stage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleantext_substeps: Option<CleanSubsteps>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<Stage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&Job> for StatusResponse {
    fn from(job: &Job) -> Self {
        Self {
            status: job.status,
            step: job.stage.sequence_index(),
            stage: job.stage,
            cleantext_substeps: (job.stage == Stage::Clean).then(|| job.clean_substeps.clone()),
            failed_stage: job.failed_stage,
            error: job.error.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub summary: String,
    pub stats: StatsSummary,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /analyze/:sku
pub async fn analyze(
    State(state): State<AppState>,
    Path(sku): Path<String>,
) -> ApiResult<Json<AnalyzeResponse>> {
    validate_sku(&sku).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let job_id = state.orchestrator.run_analysis(&sku).await?;
    Ok(Json(AnalyzeResponse { job_id }))
}

/// GET /status/:job_id
pub async fn status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<StatusResponse>> {
    let job = load_job(&state, &job_id).await?;
    Ok(Json(StatusResponse::from(&job)))
}

/// GET /results/:job_id
pub async fn results(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<AnalysisResult>> {
    let job = load_job(&state, &job_id).await?;
    match (job.status, job.result) {
        (JobStatus::Complete, Some(result)) => Ok(Json(result)),
        _ => Err(ApiError::NotFound("Results not available".to_string())),
    }
}

/// GET /summary/:job_id
pub async fn summary(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<SummaryResponse>> {
    let job = load_job(&state, &job_id).await?;
    let stats = job.stats_summary.ok_or_else(|| {
        ApiError::NotFound("Stats summary not available for this job.".to_string())
    })?;

    let outcome = state.summarizer.summarize(&stats).await.map_err(|e| {
        tracing::warn!(job_id = %job.id, error = %e, "Summarizer call failed");
        ApiError::Upstream(format!("{:#}", e))
    })?;

    match outcome {
        SummarizeOutcome::Generated(summary) => Ok(Json(SummaryResponse { summary, stats })),
        SummarizeOutcome::Refused(reason) => {
            tracing::warn!(job_id = %job.id, reason = %reason, "Summarizer returned error marker");
            Err(ApiError::Generation(format!("{} {}", ERROR_MARKER, reason)))
        }
    }
}

/// Unknown and malformed job ids are both "not found"
async fn load_job(state: &AppState, job_id: &str) -> ApiResult<Job> {
    let id = Uuid::parse_str(job_id).map_err(|_| ApiError::NotFound("Job not found".to_string()))?;
    state
        .jobs
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Job not found".to_string()))
}

/// Build analysis routes
pub fn analysis_routes() -> Router<AppState> {
    Router::new()
        .route("/analyze/:sku", post(analyze))
        .route("/status/:job_id", get(status))
        .route("/results/:job_id", get(results))
        .route("/summary/:job_id", get(summary))
}
