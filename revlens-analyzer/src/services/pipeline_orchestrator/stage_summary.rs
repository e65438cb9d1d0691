//! Stage 7: SUMMARY → DONE
//!
//! Assembles the final result. The narrative summary is generated on demand
//! by GET /summary, not here. The pauses around the stage change keep the
//! summary stage visible to pollers.

use super::PipelineOrchestrator;
use crate::models::{AnalysisResult, Job, Stage};
use anyhow::{Context, Result};

impl PipelineOrchestrator {
    pub(super) async fn stage_summary(&self, job: &mut Job) -> Result<()> {
        tokio::time::sleep(self.params.summary_stage_delay()).await;
        self.enter_stage(job, Stage::Summary).await?;
        tokio::time::sleep(self.params.summary_stage_delay()).await;

        let stats = job
            .stats_summary
            .clone()
            .context("Stats snapshot missing at summary stage")?;

        let result = AnalysisResult {
            sku: job.sku.clone(),
            summary: format!("Fetched {} reviews for SKU {}", job.counts.fetched, job.sku),
            stats,
            aspect_summary: job.aspect_summary.clone().unwrap_or_default(),
        };

        job.complete(result);
        self.save(job).await?;

        tracing::info!(
            job_id = %job.id,
            sku = %job.sku,
            "Stage 7: SUMMARY complete, job done"
        );

        self.checkpoint(job, Stage::Done, &job.result).await;

        Ok(())
    }
}
