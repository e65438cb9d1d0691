//! Stage 5: KEYWORD_EXTRACT

use super::PipelineOrchestrator;
use crate::models::{Job, Review, Stage};
use crate::services::keyword_matcher::match_keywords;
use anyhow::{Context, Result};
use serde_json::json;

impl PipelineOrchestrator {
    pub(super) async fn stage_keywords(&self, job: &mut Job, reviews: &[Review]) -> Result<()> {
        self.enter_stage(job, Stage::KeywordExtract).await?;

        let top_keywords = self
            .collaborators
            .keywords
            .extract_keywords(reviews, self.params.keyword_top_n)
            .context("Keyword extraction failed")?;
        let keyword_samples = match_keywords(&top_keywords, reviews, self.params.samples_per_keyword);

        job.top_keywords = Some(top_keywords);
        job.keyword_samples = Some(keyword_samples);
        self.save(job).await?;

        tracing::info!(
            job_id = %job.id,
            keywords = job.top_keywords.as_ref().map_or(0, |k| k.values().map(Vec::len).sum::<usize>()),
            "Stage 5: KEYWORD_EXTRACT complete"
        );

        self.checkpoint(
            job,
            Stage::KeywordExtract,
            &json!({
                "top_keywords": job.top_keywords,
                "keyword_matched_samples": job.keyword_samples,
            }),
        )
        .await;

        Ok(())
    }
}
