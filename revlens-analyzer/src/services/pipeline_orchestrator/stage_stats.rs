//! Stage 6: STATS_BUILD

use super::PipelineOrchestrator;
use crate::models::{Job, Review, Stage};
use crate::services::stats_aggregator::build_summary_seeded;
use anyhow::Result;

impl PipelineOrchestrator {
    pub(super) async fn stage_stats(&self, job: &mut Job, reviews: &[Review]) -> Result<()> {
        self.enter_stage(job, Stage::StatsBuild).await?;

        let top_keywords = job.top_keywords.clone().unwrap_or_default();
        let keyword_samples = job.keyword_samples.clone().unwrap_or_default();
        let summary = build_summary_seeded(
            reviews,
            &top_keywords,
            &keyword_samples,
            self.params.stats_samples,
            self.params.sample_seed,
        );

        tracing::info!(
            job_id = %job.id,
            total_reviews = summary.total_reviews,
            unlabeled = summary.unlabeled_reviews,
            "Stage 6: STATS_BUILD complete"
        );

        job.stats_summary = Some(summary);
        self.save(job).await?;

        self.checkpoint(job, Stage::StatsBuild, &job.stats_summary).await;

        Ok(())
    }
}
