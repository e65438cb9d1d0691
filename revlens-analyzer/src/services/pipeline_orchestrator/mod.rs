//! Review analysis pipeline orchestrator
//!
//! Drives one job through the fixed stage sequence:
//! FETCH → CLEAN → EMBED → CLASSIFY → ASPECT_EXTRACT → KEYWORD_EXTRACT → STATS_BUILD → SUMMARY → DONE
//!
//! Each stage is handled by a dedicated `stage_*` method in its own module.
//! The orchestrator keeps a working copy of the [`Job`] and saves it to the
//! [`JobStore`] after every transition, so pollers always read a whole
//! snapshot. Jobs share no mutable state besides the store.
//!
//! A stage error or a panic anywhere in the run marks the job `failed`, with
//! the stage it failed in and the error message. Failed batches inside a
//! stage never fail the job; they only reduce coverage.

use crate::models::{Job, PartitionedReviews, PipelineParameters, Stage};
use crate::services::checkpoint::{Checkpoint, CheckpointSink};
use crate::services::collaborators::Collaborators;
use crate::services::index_alignment::merge_branches;
use crate::services::job_store::JobStore;
use anyhow::Result;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

// Stage modules (internal implementation)
mod stage_aspects;
mod stage_clean;
mod stage_fetch;
mod stage_keywords;
mod stage_sentiment;
mod stage_stats;
mod stage_summary;

/// A stage that could not complete
#[derive(Debug, Error)]
#[error("{stage} stage failed: {source:#}")]
pub struct StageError {
    pub stage: Stage,
    #[source]
    pub source: anyhow::Error,
}

impl StageError {
    /// `map_err` adapter tagging an error with its stage
    fn at(stage: Stage) -> impl FnOnce(anyhow::Error) -> StageError {
        move |source| StageError { stage, source }
    }
}

/// Pipeline orchestrator service
pub struct PipelineOrchestrator {
    store: Arc<dyn JobStore>,
    checkpoints: Arc<dyn CheckpointSink>,
    collaborators: Collaborators,
    params: PipelineParameters,
}

impl PipelineOrchestrator {
    /// # Arguments
    /// * `store` - Job registry, the only state the orchestrator mutates
    /// * `checkpoints` - Sink receiving each completed stage's output
    /// * `collaborators` - Review source, cleaner and model clients
    /// * `params` - Batch sizes, concurrency permits, caps and delays
    pub fn new(
        store: Arc<dyn JobStore>,
        checkpoints: Arc<dyn CheckpointSink>,
        collaborators: Collaborators,
        params: PipelineParameters,
    ) -> Self {
        Self {
            store,
            checkpoints,
            collaborators,
            params,
        }
    }

    pub fn params(&self) -> &PipelineParameters {
        &self.params
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    /// Create a pending job for `sku` and start it in the background
    ///
    /// Returns as soon as the job record is saved.
    pub async fn run_analysis(self: &Arc<Self>, sku: &str) -> Result<Uuid> {
        let job = Job::new(sku.trim());
        let job_id = job.id;
        self.store.save(&job).await?;

        tracing::info!(job_id = %job_id, sku = %job.sku, "Analysis job created");

        let orchestrator = Arc::clone(self);
        tokio::spawn(async move {
            orchestrator.supervise(job).await;
        });

        Ok(job_id)
    }

    /// Run a job to completion, turning any error or panic into `failed`
    async fn supervise(self: Arc<Self>, job: Job) {
        let job_id = job.id;
        let worker = Arc::clone(&self);
        let handle = tokio::spawn(async move { worker.execute(job).await });

        let message = match handle.await {
            Ok(Ok(())) => return,
            Ok(Err(e)) => e.to_string(),
            Err(join_error) if join_error.is_panic() => {
                let panic = join_error.into_panic();
                let detail = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                format!("pipeline task panicked: {}", detail)
            }
            Err(join_error) => format!("pipeline task aborted: {}", join_error),
        };

        self.handle_failure(job_id, message).await;
    }

    /// Mark the saved job as failed in the stage it last reached
    async fn handle_failure(&self, job_id: Uuid, message: String) {
        let mut job = match self.store.get(job_id).await {
            Ok(Some(job)) => job,
            Ok(None) => {
                tracing::error!(job_id = %job_id, error = %message, "Failed job missing from store");
                return;
            }
            Err(e) => {
                tracing::error!(job_id = %job_id, error = %e, "Failed to load job for failure update");
                return;
            }
        };

        job.fail(message.clone());

        tracing::error!(
            job_id = %job_id,
            sku = %job.sku,
            stage = %job.stage,
            fetched = job.counts.fetched,
            with_text = job.counts.with_text,
            rating_only = job.counts.rating_only,
            cleaned = job.counts.cleaned,
            embedded = job.counts.embedded,
            classified = job.counts.classified,
            error = %message,
            "Analysis job failed"
        );

        if let Err(e) = self.store.save(&job).await {
            tracing::error!(job_id = %job_id, error = %e, "Failed to save failed job state");
        }
    }

    /// Execute every stage in order
    async fn execute(&self, mut job: Job) -> std::result::Result<(), StageError> {
        let start_time = std::time::Instant::now();

        job.mark_processing();
        self.save(&job).await.map_err(StageError::at(Stage::Fetch))?;

        tracing::info!(job_id = %job.id, sku = %job.sku, "Starting analysis pipeline");

        // Stage 0: FETCH - raw reviews, null/blank/duplicate filter, branch split
        let partitioned = self
            .stage_fetch(&mut job)
            .await
            .map_err(StageError::at(Stage::Fetch))?;

        let PartitionedReviews {
            with_text,
            rating_only,
            text_positions,
            rating_only_positions,
            ..
        } = partitioned;

        // Stage 1: CLEAN - text branch only
        let mut reviews = self
            .stage_clean(&mut job, with_text)
            .await
            .map_err(StageError::at(Stage::Clean))?;

        // Stage 2: EMBED - reviews with usable cleaned text
        self.stage_embed(&mut job, &mut reviews)
            .await
            .map_err(StageError::at(Stage::Embed))?;

        // Stage 3: CLASSIFY - embedded reviews, then rejoin the rating-only branch in source order
        self.stage_classify(&mut job, &mut reviews)
            .await
            .map_err(StageError::at(Stage::Classify))?;
        let reviews = merge_branches(
            reviews,
            &text_positions,
            rating_only,
            &rating_only_positions,
        );

        // Stage 4: ASPECT_EXTRACT
        self.stage_aspects(&mut job, &reviews)
            .await
            .map_err(StageError::at(Stage::AspectExtract))?;

        // Stage 5: KEYWORD_EXTRACT - keywords and keyword-matched samples
        self.stage_keywords(&mut job, &reviews)
            .await
            .map_err(StageError::at(Stage::KeywordExtract))?;

        // Stage 6: STATS_BUILD
        self.stage_stats(&mut job, &reviews)
            .await
            .map_err(StageError::at(Stage::StatsBuild))?;

        // Stage 7: SUMMARY → DONE
        self.stage_summary(&mut job)
            .await
            .map_err(StageError::at(Stage::Summary))?;

        tracing::info!(
            job_id = %job.id,
            sku = %job.sku,
            reviews = reviews.len(),
            duration_ms = start_time.elapsed().as_millis() as u64,
            "Analysis pipeline completed"
        );

        Ok(())
    }

    /// Transition to `stage` and publish the new state
    async fn enter_stage(&self, job: &mut Job, stage: Stage) -> Result<()> {
        let transition = job.transition_to(stage);
        self.save(job).await?;

        tracing::info!(
            job_id = %job.id,
            from = %transition.old_stage,
            stage = %stage,
            step = stage.sequence_index(),
            "Stage started"
        );
        Ok(())
    }

    async fn save(&self, job: &Job) -> Result<()> {
        self.store.save(job).await
    }

    /// Hand a stage's output to the checkpoint sink; sink errors are logged only
    async fn checkpoint<T: Serialize + ?Sized>(&self, job: &Job, stage: Stage, payload: &T) {
        let payload = match serde_json::to_value(payload) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(job_id = %job.id, stage = %stage, error = %e, "Checkpoint serialization failed");
                return;
            }
        };

        let checkpoint = Checkpoint {
            job_id: job.id,
            stage,
            payload,
        };
        if let Err(e) = self.checkpoints.record(checkpoint).await {
            tracing::warn!(job_id = %job.id, stage = %stage, error = %e, "Checkpoint write failed");
        }
    }
}
