//! Test Helper Utilities
//!
//! In-process fake collaborators and pipeline builders shared by the
//! integration tests.

// Each test binary uses a different subset of these helpers
#![allow(dead_code)]

use anyhow::{bail, Result};
use revlens_analyzer::models::{
    AspectMention, Classification, Job, KeywordSet, PipelineParameters, RawRating, RawReview, Review,
    ReviewAspects, Sentiment, StatsSummary,
};
use revlens_analyzer::services::{
    AspectExtractor, CheckpointSink, Collaborators, Embedder, FrequencyKeywordExtractor,
    InMemoryJobStore, InMemoryReviewSource, JobStore, KeywordExtractor, MemoryCheckpointSink,
    PipelineOrchestrator, SentimentClassifier, StandardCleaner, SummarizeOutcome, Summarizer,
};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

pub const SKU: &str = "SKU1";

// ============================================================================
// Review fixtures
// ============================================================================

pub fn raw(text: Option<&str>, rating: Option<f64>, created_date: Option<&str>) -> RawReview {
    RawReview {
        sku: SKU.to_string(),
        text: text.map(str::to_string),
        rating: rating.map(RawRating::Number),
        created_date: created_date.map(str::to_string),
    }
}

/// One positive text review, one negative text review, one rating-only review
pub fn three_reviews() -> Vec<RawReview> {
    vec![
        raw(Some("Great toy, my dog loves it!"), Some(5.0), Some("2024-03-02")),
        raw(Some("Broke after one day. Terrible."), Some(1.0), Some("2024-03-15")),
        raw(None, Some(4.0), Some("2024-04-01")),
    ]
}

/// Text review, rating-only review, blank unrated review
pub fn mixed_branch_reviews() -> Vec<RawReview> {
    vec![
        raw(Some("Great toy, my dog loves it!"), Some(5.0), None),
        raw(None, Some(2.0), None),
        raw(Some(""), None, None),
    ]
}

pub fn source_with(reviews: Vec<RawReview>) -> InMemoryReviewSource {
    InMemoryReviewSource::new().with_reviews(SKU, reviews)
}

// ============================================================================
// Fake collaborators
// ============================================================================

/// Keyword-driven embedder: "great"/"love" → positive axis, "broke"/"terrible" → negative axis
#[derive(Default)]
pub struct FakeEmbedder {
    /// Any batch containing this substring fails
    pub fail_on: Option<String>,
    pub unconfigured: bool,
    /// Every text received, in call order
    pub seen: Mutex<Vec<String>>,
}

impl FakeEmbedder {
    pub fn seen_texts(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Embedder for FakeEmbedder {
    fn ensure_configured(&self) -> Result<()> {
        if self.unconfigured {
            bail!("OPENAI_API_KEY not set");
        }
        Ok(())
    }

    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        self.seen.lock().unwrap().extend(texts.iter().cloned());
        if let Some(marker) = &self.fail_on {
            if texts.iter().any(|t| t.contains(marker.as_str())) {
                bail!("embedding request rejected");
            }
        }
        Ok(texts.iter().map(|t| embed_text(t)).collect())
    }
}

fn embed_text(text: &str) -> Vec<f32> {
    let lower = text.to_lowercase();
    if lower.contains("great") || lower.contains("love") {
        vec![0.9, 0.05, 0.05]
    } else if lower.contains("broke") || lower.contains("terrible") {
        vec![0.05, 0.05, 0.9]
    } else {
        vec![0.1, 0.8, 0.1]
    }
}

/// Arg-max over `[positive, neutral, negative]`
pub struct ArgmaxClassifier;

impl SentimentClassifier for ArgmaxClassifier {
    fn classify(&self, vectors: &[Vec<f32>]) -> Result<Vec<Classification>> {
        vectors
            .iter()
            .map(|v| {
                if v.len() != 3 {
                    bail!("expected 3 dimensions, got {}", v.len());
                }
                let probabilities: BTreeMap<Sentiment, f64> = Sentiment::ALL
                    .iter()
                    .zip(v)
                    .map(|(&s, &p)| (s, p as f64))
                    .collect();
                let label = Sentiment::ALL
                    .iter()
                    .copied()
                    .zip(v)
                    .fold((Sentiment::Neutral, f32::MIN), |best, (s, &p)| {
                        if p > best.1 {
                            (s, p)
                        } else {
                            best
                        }
                    })
                    .0;
                Ok(Classification { label, probabilities })
            })
            .collect()
    }
}

/// Returns one aspect list per text from fixed word rules
#[derive(Default)]
pub struct FakeAspectExtractor {
    pub unconfigured: bool,
}

#[async_trait::async_trait]
impl AspectExtractor for FakeAspectExtractor {
    fn ensure_configured(&self) -> Result<()> {
        if self.unconfigured {
            bail!("OPENAI_API_KEY not set");
        }
        Ok(())
    }

    async fn extract_aspects(&self, texts: Vec<String>) -> Result<Vec<ReviewAspects>> {
        Ok(texts
            .iter()
            .map(|text| {
                let lower = text.to_lowercase();
                let mut aspects = Vec::new();
                if lower.contains("great") {
                    aspects.push(mention("Quality", "positive"));
                }
                if lower.contains("broke") {
                    aspects.push(mention("quality ", "negative"));
                    aspects.push(mention("durability", "negative"));
                }
                ReviewAspects { aspects }
            })
            .collect())
    }
}

fn mention(aspect: &str, sentiment: &str) -> AspectMention {
    AspectMention {
        aspect: aspect.to_string(),
        sentiment: sentiment.to_string(),
    }
}

pub struct FailingKeywordExtractor;

impl KeywordExtractor for FailingKeywordExtractor {
    fn extract_keywords(&self, _reviews: &[Review], _top_n: usize) -> Result<KeywordSet> {
        bail!("keyword model crashed")
    }
}

pub struct PanickingKeywordExtractor;

impl KeywordExtractor for PanickingKeywordExtractor {
    fn extract_keywords(&self, _reviews: &[Review], _top_n: usize) -> Result<KeywordSet> {
        panic!("keyword extractor bug")
    }
}

/// Summarizer with a canned reply
pub enum FakeSummarizer {
    Reply(String),
    Unreachable,
}

#[async_trait::async_trait]
impl Summarizer for FakeSummarizer {
    async fn summarize(&self, _stats: &StatsSummary) -> Result<SummarizeOutcome> {
        match self {
            FakeSummarizer::Reply(reply) => Ok(SummarizeOutcome::from_reply(reply.clone())),
            FakeSummarizer::Unreachable => bail!("connection refused"),
        }
    }
}

// ============================================================================
// Pipeline builders
// ============================================================================

pub fn collaborators(source: InMemoryReviewSource) -> Collaborators {
    Collaborators {
        source: Arc::new(source),
        cleaner: Arc::new(StandardCleaner::new()),
        embedder: Arc::new(FakeEmbedder::default()),
        classifier: Arc::new(ArgmaxClassifier),
        aspects: Arc::new(FakeAspectExtractor::default()),
        keywords: Arc::new(FrequencyKeywordExtractor::new()),
    }
}

/// Defaults without scheduling pauses, seeded sampling
pub fn fast_params() -> PipelineParameters {
    PipelineParameters {
        sample_seed: Some(42),
        ..PipelineParameters::default()
    }
    .without_delays()
}

pub struct TestPipeline {
    pub orchestrator: Arc<PipelineOrchestrator>,
    pub store: Arc<InMemoryJobStore>,
    pub checkpoints: MemoryCheckpointSink,
}

pub fn pipeline(collaborators: Collaborators, params: PipelineParameters) -> TestPipeline {
    let store = Arc::new(InMemoryJobStore::new());
    let checkpoints = MemoryCheckpointSink::new();
    let orchestrator = Arc::new(PipelineOrchestrator::new(
        store.clone() as Arc<dyn JobStore>,
        Arc::new(checkpoints.clone()) as Arc<dyn CheckpointSink>,
        collaborators,
        params,
    ));
    TestPipeline {
        orchestrator,
        store,
        checkpoints,
    }
}

/// Poll the store until the job is complete or failed
pub async fn wait_for_terminal(store: &dyn JobStore, job_id: Uuid) -> Job {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        if let Some(job) = store.get(job_id).await.unwrap() {
            if job.is_terminal() {
                return job;
            }
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "job {} did not finish in time",
            job_id
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
