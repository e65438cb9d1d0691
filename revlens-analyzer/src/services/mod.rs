//! Service modules for review analysis
//!
//! Pure transforms (batching, alignment, aggregation, matching, stats), the
//! collaborator interfaces with their default implementations, and the
//! pipeline orchestrator that ties them together.

pub mod aspect_aggregator;
pub mod batch_executor;
pub mod checkpoint;
pub mod collaborators;
pub mod feedback_log;
pub mod index_alignment;
pub mod job_store;
pub mod keyword_extractor;
pub mod keyword_matcher;
pub mod openai_client;
pub mod pipeline_orchestrator;
pub mod review_source;
pub mod sentiment_classifier;
pub mod stats_aggregator;
pub mod text_cleaner;

pub use aspect_aggregator::aggregate_aspects;
pub use batch_executor::{run_batched, BatchExecutor, BatchRun};
pub use checkpoint::{Checkpoint, CheckpointSink, JsonFileCheckpointSink, MemoryCheckpointSink, NoopCheckpointSink};
pub use collaborators::{
    AspectExtractor, Collaborators, Embedder, KeywordExtractor, ReviewSource, ReviewStream,
    SentimentClassifier, SummarizeOutcome, Summarizer, TextCleaner, ERROR_MARKER,
};
pub use feedback_log::FeedbackLog;
pub use index_alignment::{filter_valid, merge_branches, project};
pub use job_store::{InMemoryJobStore, JobStore};
pub use keyword_extractor::FrequencyKeywordExtractor;
pub use keyword_matcher::match_keywords;
pub use openai_client::{OpenAiClient, OpenAiError, OpenAiSettings};
pub use pipeline_orchestrator::{PipelineOrchestrator, StageError};
pub use review_source::{validate_sku, InMemoryReviewSource, JsonlReviewSource};
pub use sentiment_classifier::{LinearSentimentClassifier, MissingModelClassifier};
pub use stats_aggregator::{build_summary, build_summary_seeded};
pub use text_cleaner::StandardCleaner;
