//! Stage 0: FETCH
//!
//! Pulls raw reviews from the review source up to the fetch cap, then splits
//! them into the text branch and the rating-only branch.

use super::PipelineOrchestrator;
use crate::models::{partition_reviews, Job, PartitionedReviews, RawReview, Stage};
use anyhow::{Context, Result};
use futures::{StreamExt, TryStreamExt};
use serde_json::json;

impl PipelineOrchestrator {
    pub(super) async fn stage_fetch(&self, job: &mut Job) -> Result<PartitionedReviews> {
        self.enter_stage(job, Stage::Fetch).await?;

        let source = &self.collaborators.source;
        let stream = source
            .fetch_reviews(&job.sku)
            .await
            .with_context(|| format!("Review source '{}' failed to open", source.name()))?;

        // One row past the cap tells a truncated source from one that fits exactly
        let mut raw: Vec<RawReview> = stream
            .take(self.params.max_reviews.saturating_add(1))
            .try_collect()
            .await
            .with_context(|| format!("Review source '{}' failed mid-stream", source.name()))?;

        let truncated = raw.len() > self.params.max_reviews;
        if truncated {
            raw.truncate(self.params.max_reviews);
            tracing::warn!(
                job_id = %job.id,
                cap = self.params.max_reviews,
                "Fetch cap reached, remaining reviews ignored"
            );
        }
        let fetched = raw.len();

        let partitioned = partition_reviews(raw);

        job.counts.fetched = fetched;
        job.counts.with_text = partitioned.with_text.len();
        job.counts.rating_only = partitioned.rating_only.len();
        job.counts.dropped = partitioned.dropped;
        self.save(job).await?;

        tracing::info!(
            job_id = %job.id,
            sku = %job.sku,
            fetched,
            with_text = job.counts.with_text,
            rating_only = job.counts.rating_only,
            dropped = job.counts.dropped,
            "Stage 0: FETCH complete"
        );

        self.checkpoint(
            job,
            Stage::Fetch,
            &json!({
                "fetched": fetched,
                "truncated": truncated,
                "with_text": job.counts.with_text,
                "rating_only": job.counts.rating_only,
                "dropped": job.counts.dropped,
            }),
        )
        .await;

        Ok(partitioned)
    }
}
