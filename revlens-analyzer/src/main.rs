//! revlens-analyzer - Review Analytics Microservice
//!
//! Accepts analysis jobs per product SKU, runs the review pipeline in the
//! background and serves status, results, on-demand summaries and feedback
//! over HTTP.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use revlens_analyzer::config::{self, AnalyzerConfig, Args};
use revlens_analyzer::services::{
    Collaborators, FeedbackLog, FrequencyKeywordExtractor, InMemoryJobStore, JsonFileCheckpointSink,
    JsonlReviewSource, LinearSentimentClassifier, MissingModelClassifier, OpenAiClient,
    PipelineOrchestrator, SentimentClassifier, StandardCleaner,
};
use revlens_analyzer::AppState;
use revlens_common::config::RootFolderInitializer;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let (config_path, toml_config) = config::load_toml(&args)?;

    init_tracing(&toml_config.logging.level, toml_config.logging.file.as_deref())?;

    info!("Starting revlens-analyzer (Review Analytics) microservice");
    info!(
        "Version: {} (git {}, built {}, {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    match &config_path {
        Some(path) => info!("Config file: {}", path.display()),
        None => warn!("No config directory on this platform, using compiled defaults"),
    }

    let config = AnalyzerConfig::resolve(&args, &toml_config)?;

    // Step 1: Root folder layout
    let initializer = RootFolderInitializer::new(config.root_folder.clone());
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;
    info!("Root folder: {}", config.root_folder.display());

    // Step 2: Collaborators
    let openai = Arc::new(OpenAiClient::new(config.openai.clone()).context("Failed to build OpenAI client")?);
    let model_path = config.root_folder.join("models").join("sentiment_model.json");
    let collaborators = Collaborators {
        source: Arc::new(JsonlReviewSource::new(initializer.reviews_dir())),
        cleaner: Arc::new(StandardCleaner::new()),
        embedder: openai.clone(),
        classifier: load_classifier(&model_path),
        aspects: openai.clone(),
        keywords: Arc::new(FrequencyKeywordExtractor::new()),
    };
    info!("Review files: {}", initializer.reviews_dir().display());

    // Step 3: Pipeline and application state
    let orchestrator = Arc::new(PipelineOrchestrator::new(
        Arc::new(InMemoryJobStore::new()),
        Arc::new(JsonFileCheckpointSink::new(initializer.checkpoint_dir())),
        collaborators,
        config.pipeline.clone(),
    ));
    let feedback_log = Arc::new(FeedbackLog::new(initializer.feedback_log_path()));
    info!("Feedback log: {}", feedback_log.path().display());

    let state = AppState::new(orchestrator, openai, feedback_log);
    let app = revlens_analyzer::build_router(state, revlens_analyzer::cors_layer(&config.frontend_origin));

    // Step 4: Serve
    let bind_addr = format!("{}:{}", config.bind_address, config.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;
    info!("Listening on http://{}", bind_addr);
    info!("Health check: http://{}/health", bind_addr);
    info!("CORS origin: {}", config.frontend_origin);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Console logging, plus a plain-text copy to `log_file` when configured
///
/// `RUST_LOG` overrides the configured level.
fn init_tracing(level: &str, log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("revlens_analyzer={level},tower_http={level}").into());

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(std::sync::Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();
    Ok(())
}

/// Trained classifier from disk; a missing or invalid model fails jobs at CLASSIFY
fn load_classifier(path: &Path) -> Arc<dyn SentimentClassifier> {
    match LinearSentimentClassifier::load(path) {
        Ok(classifier) => {
            info!("Sentiment model: {}", path.display());
            Arc::new(classifier)
        }
        Err(e) => {
            warn!("Sentiment model unavailable ({:#}); jobs will fail at the classify stage", e);
            Arc::new(MissingModelClassifier::new(path.to_path_buf(), format!("{:#}", e)))
        }
    }
}
