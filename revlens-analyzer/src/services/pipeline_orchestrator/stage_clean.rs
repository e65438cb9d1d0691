//! Stage 1: CLEAN
//!
//! Runs the text cleaner over the text branch in bounded concurrent batches.
//! The named substeps advance together: all `in_progress` while batches run,
//! all `done` afterwards, held briefly so pollers can observe the done state.

use super::PipelineOrchestrator;
use crate::models::{Job, Review, Stage, SubstepStatus};
use crate::services::batch_executor::BatchExecutor;
use anyhow::Result;
use serde_json::json;
use std::sync::Arc;

impl PipelineOrchestrator {
    pub(super) async fn stage_clean(&self, job: &mut Job, mut reviews: Vec<Review>) -> Result<Vec<Review>> {
        job.clean_substeps.set_all(SubstepStatus::Pending);
        self.enter_stage(job, Stage::Clean).await?;

        job.clean_substeps.set_all(SubstepStatus::InProgress);
        self.save(job).await?;

        let texts: Vec<String> = reviews
            .iter()
            .map(|r| r.text.clone().unwrap_or_default())
            .collect();

        let cleaner = Arc::clone(&self.collaborators.cleaner);
        let run = BatchExecutor::new(
            Stage::Clean.name(),
            self.params.clean_batch_size,
            self.params.max_concurrent_batches,
        )
        .run(texts, move |_, batch| {
            let cleaner = Arc::clone(&cleaner);
            async move { cleaner.clean_batch(batch).await }
        })
        .await;

        let degraded_batches = run.degraded_batches;
        for (review, cleaned) in reviews.iter_mut().zip(run.results) {
            if let Some(cleaned) = cleaned {
                review.apply_cleaning(cleaned);
            }
        }

        job.counts.cleaned = reviews
            .iter()
            .filter(|r| r.usable_clean_text().is_some())
            .count();
        job.clean_substeps.set_all(SubstepStatus::Done);
        self.save(job).await?;

        tracing::info!(
            job_id = %job.id,
            reviews = reviews.len(),
            cleaned = job.counts.cleaned,
            degraded_batches,
            "Stage 1: CLEAN complete"
        );

        self.checkpoint(
            job,
            Stage::Clean,
            &json!({
                "reviews": reviews.len(),
                "cleaned": job.counts.cleaned,
                "degraded_batches": degraded_batches,
                "sample": reviews.iter().take(5).collect::<Vec<_>>(),
            }),
        )
        .await;

        tokio::time::sleep(self.params.clean_done_delay()).await;

        Ok(reviews)
    }
}
