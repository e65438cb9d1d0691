//! Stages 2-3: EMBED and CLASSIFY
//!
//! Only reviews with usable cleaned text are embedded; only embedded reviews
//! are classified. Results are projected back onto the working set so
//! positions never shift.

use super::PipelineOrchestrator;
use crate::models::{Job, Review, Stage};
use crate::services::batch_executor::BatchExecutor;
use crate::services::index_alignment::{filter_valid, project};
use anyhow::{bail, Context, Result};
use serde_json::json;
use std::sync::Arc;

impl PipelineOrchestrator {
    pub(super) async fn stage_embed(&self, job: &mut Job, reviews: &mut [Review]) -> Result<()> {
        self.enter_stage(job, Stage::Embed).await?;
        self.collaborators
            .embedder
            .ensure_configured()
            .context("Embedding service not configured")?;

        let texts: Vec<Option<String>> = reviews
            .iter()
            .map(|r| r.usable_clean_text().map(str::to_string))
            .collect();
        let (valid_texts, valid_indices) = filter_valid(&texts, |text| text.is_some());
        let valid_texts: Vec<String> = valid_texts.into_iter().flatten().collect();

        let mut degraded_batches = 0;
        if valid_texts.is_empty() {
            tracing::warn!(job_id = %job.id, "No cleaned text to embed, skipping");
        } else {
            let embedder = Arc::clone(&self.collaborators.embedder);
            let run = BatchExecutor::new(
                Stage::Embed.name(),
                self.params.embed_batch_size,
                self.params.max_concurrent_batches,
            )
            .run(valid_texts, move |_, batch| {
                let embedder = Arc::clone(&embedder);
                async move { embedder.embed(batch).await }
            })
            .await;
            degraded_batches = run.degraded_batches;

            let projected = project(&valid_indices, run.results, reviews.len());
            for (review, embedding) in reviews.iter_mut().zip(projected) {
                review.embedding = embedding.flatten();
            }
        }

        job.counts.embedded = reviews.iter().filter(|r| r.embedding.is_some()).count();
        self.save(job).await?;

        tracing::info!(
            job_id = %job.id,
            eligible = valid_indices.len(),
            embedded = job.counts.embedded,
            degraded_batches,
            "Stage 2: EMBED complete"
        );

        self.checkpoint(
            job,
            Stage::Embed,
            &json!({
                "eligible": valid_indices.len(),
                "embedded": job.counts.embedded,
                "skipped": reviews.len() - job.counts.embedded,
                "degraded_batches": degraded_batches,
            }),
        )
        .await;

        Ok(())
    }

    pub(super) async fn stage_classify(&self, job: &mut Job, reviews: &mut [Review]) -> Result<()> {
        self.enter_stage(job, Stage::Classify).await?;

        let embeddings: Vec<Option<Vec<f32>>> = reviews.iter().map(|r| r.embedding.clone()).collect();
        let (valid, valid_indices) = filter_valid(&embeddings, |embedding| embedding.is_some());
        let vectors: Vec<Vec<f32>> = valid.into_iter().flatten().collect();

        if vectors.is_empty() {
            tracing::warn!(job_id = %job.id, "No embeddings to classify, skipping");
        } else {
            let classifications = self
                .collaborators
                .classifier
                .classify(&vectors)
                .context("Sentiment classifier failed")?;
            if classifications.len() != vectors.len() {
                bail!(
                    "Sentiment classifier returned {} labels for {} vectors",
                    classifications.len(),
                    vectors.len()
                );
            }

            let projected = project(&valid_indices, classifications, reviews.len());
            for (review, classification) in reviews.iter_mut().zip(projected) {
                if let Some(classification) = classification {
                    review.apply_classification(classification);
                }
            }
        }

        job.counts.classified = reviews.iter().filter(|r| r.sentiment.is_some()).count();
        self.save(job).await?;

        tracing::info!(
            job_id = %job.id,
            classified = job.counts.classified,
            "Stage 3: CLASSIFY complete"
        );

        let mut label_counts = std::collections::BTreeMap::new();
        for sentiment in reviews.iter().filter_map(|r| r.sentiment) {
            *label_counts.entry(sentiment).or_insert(0usize) += 1;
        }
        self.checkpoint(
            job,
            Stage::Classify,
            &json!({
                "classified": job.counts.classified,
                "labels": label_counts,
            }),
        )
        .await;

        Ok(())
    }
}
