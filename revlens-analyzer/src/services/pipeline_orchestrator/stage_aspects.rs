//! Stage 4: ASPECT_EXTRACT

use super::PipelineOrchestrator;
use crate::models::{Job, Review, Stage};
use crate::services::aspect_aggregator::aggregate_aspects;
use crate::services::batch_executor::BatchExecutor;
use crate::services::index_alignment::{filter_valid, project};
use anyhow::{Context, Result};
use std::sync::Arc;

impl PipelineOrchestrator {
    pub(super) async fn stage_aspects(&self, job: &mut Job, reviews: &[Review]) -> Result<()> {
        self.enter_stage(job, Stage::AspectExtract).await?;
        self.collaborators
            .aspects
            .ensure_configured()
            .context("Aspect extraction service not configured")?;

        let texts: Vec<Option<String>> = reviews
            .iter()
            .map(|r| r.usable_clean_text().map(str::to_string))
            .collect();
        let (valid_texts, valid_indices) = filter_valid(&texts, |text| text.is_some());
        let valid_texts: Vec<String> = valid_texts.into_iter().flatten().collect();

        let extractor = Arc::clone(&self.collaborators.aspects);
        let run = BatchExecutor::new(
            Stage::AspectExtract.name(),
            self.params.aspect_batch_size,
            self.params.max_concurrent_batches,
        )
        .run(valid_texts, move |_, batch| {
            let extractor = Arc::clone(&extractor);
            async move { extractor.extract_aspects(batch).await }
        })
        .await;

        let extracted = run.succeeded();
        let degraded_batches = run.degraded_batches;
        let per_review: Vec<_> = project(&valid_indices, run.results, reviews.len())
            .into_iter()
            .map(Option::flatten)
            .collect();

        let records = aggregate_aspects(
            &per_review,
            reviews,
            self.params.aspect_top_n,
            self.params.samples_per_aspect,
        );

        job.counts.aspect_extracted = extracted;
        job.aspect_summary = Some(records);
        self.save(job).await?;

        tracing::info!(
            job_id = %job.id,
            eligible = valid_indices.len(),
            extracted,
            degraded_batches,
            aspects = job.aspect_summary.as_ref().map_or(0, Vec::len),
            "Stage 4: ASPECT_EXTRACT complete"
        );

        self.checkpoint(job, Stage::AspectExtract, &job.aspect_summary).await;

        Ok(())
    }
}
