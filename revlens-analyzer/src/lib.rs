//! revlens-analyzer library interface
//!
//! Exposes the pipeline, its components and the HTTP router for the binary
//! and for integration tests.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::http::{HeaderValue, Method};
use axum::Router;
use chrono::{DateTime, Utc};
use services::{FeedbackLog, JobStore, PipelineOrchestrator, Summarizer};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Starts jobs in the background
    pub orchestrator: Arc<PipelineOrchestrator>,
    /// Job registry read by the polling endpoints
    pub jobs: Arc<dyn JobStore>,
    /// Generates the on-demand narrative summary
    pub summarizer: Arc<dyn Summarizer>,
    pub feedback_log: Arc<FeedbackLog>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        orchestrator: Arc<PipelineOrchestrator>,
        summarizer: Arc<dyn Summarizer>,
        feedback_log: Arc<FeedbackLog>,
    ) -> Self {
        Self {
            jobs: Arc::clone(orchestrator.store()),
            orchestrator,
            summarizer,
            feedback_log,
            startup_time: Utc::now(),
        }
    }
}

/// CORS policy allowing the configured frontend origin
///
/// An origin that is not a valid header value falls back to allowing none.
pub fn cors_layer(frontend_origin: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    match HeaderValue::from_str(frontend_origin) {
        Ok(origin) => layer.allow_origin(origin),
        Err(e) => {
            tracing::warn!(origin = frontend_origin, error = %e, "Invalid frontend origin, CORS disabled");
            layer
        }
    }
}

/// Build application router
///
/// Analysis routes are served at the root and again under `/api`.
pub fn build_router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .merge(api::analysis_routes())
        .merge(api::feedback_routes())
        .nest(
            "/api",
            Router::new()
                .merge(api::analysis_routes())
                .merge(api::feedback_routes()),
        )
        .merge(api::health_routes())
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
