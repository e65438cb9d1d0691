//! Review sources
//!
//! `JsonlReviewSource` reads `<dir>/<sku>.jsonl`, one raw review object per
//! line, as a lazy stream. `InMemoryReviewSource` serves fixed rows.

use super::collaborators::{ReviewSource, ReviewStream};
use crate::models::RawReview;
use anyhow::{bail, Context, Result};
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Reject SKUs that could escape the review directory
pub fn validate_sku(sku: &str) -> Result<()> {
    let sku = sku.trim();
    if sku.is_empty() {
        bail!("SKU must not be empty");
    }
    if sku.contains(['/', '\\']) || sku.contains("..") {
        bail!("SKU contains path characters: {}", sku);
    }
    Ok(())
}

/// Reads reviews from JSON-lines files
#[derive(Debug, Clone)]
pub struct JsonlReviewSource {
    dir: PathBuf,
}

impl JsonlReviewSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, sku: &str) -> PathBuf {
        self.dir.join(format!("{}.jsonl", sku.trim()))
    }
}

#[async_trait::async_trait]
impl ReviewSource for JsonlReviewSource {
    fn name(&self) -> &'static str {
        "jsonl"
    }

    async fn fetch_reviews(&self, sku: &str) -> Result<ReviewStream> {
        validate_sku(sku)?;
        let path = self.path_for(sku);

        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tracing::warn!(sku = %sku, path = %path.display(), "No review file for SKU");
            return Ok(stream::empty().boxed());
        }

        let file = tokio::fs::File::open(&path)
            .await
            .with_context(|| format!("Failed to open review file {}", path.display()))?;
        let sku = sku.trim().to_string();

        let rows = async_stream::try_stream! {
            let mut lines = BufReader::new(file).lines();
            let mut line_number = 0usize;

            while let Some(line) = lines
                .next_line()
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?
            {
                line_number += 1;
                if line.trim().is_empty() {
                    continue;
                }

                match serde_json::from_str::<RawReview>(&line) {
                    Ok(mut review) => {
                        if review.sku.is_empty() {
                            review.sku = sku.clone();
                        }
                        yield review;
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            line = line_number,
                            error = %e,
                            "Skipping malformed review line"
                        );
                    }
                }
            }
        };

        Ok(rows.boxed())
    }
}

/// Fixed reviews keyed by SKU
#[derive(Debug, Clone, Default)]
pub struct InMemoryReviewSource {
    reviews: HashMap<String, Vec<RawReview>>,
}

impl InMemoryReviewSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reviews(mut self, sku: impl Into<String>, reviews: Vec<RawReview>) -> Self {
        self.reviews.insert(sku.into(), reviews);
        self
    }
}

#[async_trait::async_trait]
impl ReviewSource for InMemoryReviewSource {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn fetch_reviews(&self, sku: &str) -> Result<ReviewStream> {
        let rows = self.reviews.get(sku).cloned().unwrap_or_default();
        Ok(stream::iter(rows.into_iter().map(Ok)).boxed())
    }
}
