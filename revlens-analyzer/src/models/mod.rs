//! Data models for revlens-analyzer
//!
//! - Review records and sentiment labels
//! - Analysis job state machine
//! - Aspect, keyword and stats aggregates

pub mod aspect;
pub mod feedback;
pub mod job;
pub mod keywords;
pub mod parameters;
pub mod review;
pub mod stats;

pub use aspect::{AspectMention, AspectRecord, ReviewAspects};
pub use feedback::{FeedbackRecord, FeedbackRequest};
pub use job::{
    AnalysisResult, CleanSubsteps, Job, JobStatus, ReviewCounts, Stage, StageTransition,
    SubstepStatus,
};
pub use keywords::{KeywordMatch, KeywordSampleIndex, KeywordSet};
pub use parameters::PipelineParameters;
pub use review::{
    partition_reviews, Classification, CleanedText, PartitionedReviews, RawRating, RawReview,
    Review, Sentiment, SentimentSource,
};
pub use stats::{ConfidenceStats, LengthStats, StatsSummary};
