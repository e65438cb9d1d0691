//! Collaborator interfaces consumed by the pipeline
//!
//! The orchestrator only sees these traits. Default implementations live in
//! sibling modules (`review_source`, `text_cleaner`, `sentiment_classifier`,
//! `keyword_extractor`, `openai_client`); tests plug in in-process fakes.

use crate::models::{Classification, CleanedText, KeywordSet, RawReview, Review, ReviewAspects, StatsSummary};
use anyhow::Result;
use futures::stream::BoxStream;
use std::sync::Arc;

/// Prefix a summarizer reply uses to signal an explicit generation failure
pub const ERROR_MARKER: &str = "[ERROR]";

/// Finite, non-restartable sequence of raw reviews
pub type ReviewStream = BoxStream<'static, Result<RawReview>>;

// ============================================================================
// Data collaborators
// ============================================================================

/// Source of raw reviews for a SKU
#[async_trait::async_trait]
pub trait ReviewSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Open a lazy stream of reviews; an unknown SKU yields an empty stream
    async fn fetch_reviews(&self, sku: &str) -> Result<ReviewStream>;
}

/// Batched text cleaner
///
/// Must return exactly one [`CleanedText`] per input, in input order.
#[async_trait::async_trait]
pub trait TextCleaner: Send + Sync {
    async fn clean_batch(&self, texts: Vec<String>) -> Result<Vec<CleanedText>>;
}

// ============================================================================
// Model collaborators
// ============================================================================

/// Text → vector embedding
#[async_trait::async_trait]
pub trait Embedder: Send + Sync {
    /// Fails before any work starts when required configuration is missing
    fn ensure_configured(&self) -> Result<()> {
        Ok(())
    }

    /// One vector per text, in input order; an empty input is an error
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>>;
}

/// Vector → sentiment label with class probabilities
pub trait SentimentClassifier: Send + Sync {
    fn classify(&self, vectors: &[Vec<f32>]) -> Result<Vec<Classification>>;
}

/// Per-review aspect and aspect-sentiment extraction
#[async_trait::async_trait]
pub trait AspectExtractor: Send + Sync {
    fn ensure_configured(&self) -> Result<()> {
        Ok(())
    }

    /// One entry per text; callers treat a wrong-length reply as a failed batch
    async fn extract_aspects(&self, texts: Vec<String>) -> Result<Vec<ReviewAspects>>;
}

/// Top keywords per sentiment bucket
pub trait KeywordExtractor: Send + Sync {
    fn extract_keywords(&self, reviews: &[Review], top_n: usize) -> Result<KeywordSet>;
}

// ============================================================================
// Narrative summary
// ============================================================================

/// Result of a summarizer call that reached the model
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummarizeOutcome {
    /// Narrative summary text
    Generated(String),
    /// The model answered with an explicit error marker
    Refused(String),
}

impl SummarizeOutcome {
    /// Classify a raw reply by its error marker
    pub fn from_reply(reply: impl Into<String>) -> Self {
        let reply = reply.into();
        match reply.trim_start().strip_prefix(ERROR_MARKER) {
            Some(rest) => SummarizeOutcome::Refused(rest.trim().to_string()),
            None => SummarizeOutcome::Generated(reply),
        }
    }
}

/// Stats snapshot → narrative text
///
/// Transport failures are `Err`; an explicit refusal is `Ok(Refused)`.
#[async_trait::async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, stats: &StatsSummary) -> Result<SummarizeOutcome>;
}

/// Full set of collaborators a pipeline run needs
#[derive(Clone)]
pub struct Collaborators {
    pub source: Arc<dyn ReviewSource>,
    pub cleaner: Arc<dyn TextCleaner>,
    pub embedder: Arc<dyn Embedder>,
    pub classifier: Arc<dyn SentimentClassifier>,
    pub aspects: Arc<dyn AspectExtractor>,
    pub keywords: Arc<dyn KeywordExtractor>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_marker_is_recognized() {
        assert_eq!(
            SummarizeOutcome::from_reply("[ERROR] context length exceeded"),
            SummarizeOutcome::Refused("context length exceeded".to_string())
        );
        assert_eq!(
            SummarizeOutcome::from_reply("### AI Overview\nCustomers love it."),
            SummarizeOutcome::Generated("### AI Overview\nCustomers love it.".to_string())
        );
    }
}
