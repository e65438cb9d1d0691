//! Read-only analytics snapshot handed to the narrative summarizer

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{KeywordSampleIndex, KeywordSet, Sentiment};

/// Classifier confidence statistics for one label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceStats {
    pub avg: f64,
    pub min: f64,
    pub max: f64,
    pub std: f64,
}

/// Review length statistics in words
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LengthStats {
    pub avg: f64,
    pub min: usize,
    pub max: usize,
    pub median: f64,
}

/// Aggregate snapshot of one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSummary {
    pub total_reviews: usize,
    /// Reviews that never received a sentiment (e.g. invalid rating)
    pub unlabeled_reviews: usize,
    pub sentiment_counts: BTreeMap<Sentiment, usize>,
    /// Percent of `total_reviews`, so unlabeled reviews pull every share down
    pub sentiment_percentages: BTreeMap<Sentiment, f64>,
    pub star_rating_distribution: BTreeMap<String, usize>,
    pub top_keywords: KeywordSet,
    pub sample_reviews: BTreeMap<Sentiment, Vec<String>>,
    pub keyword_matched_samples: KeywordSampleIndex,
    /// `None` when no review carries a probability for the label
    pub sentiment_confidence: BTreeMap<Sentiment, Option<ConfidenceStats>>,
    /// `None` when the bucket has no cleaned text
    pub review_length_stats: BTreeMap<Sentiment, Option<LengthStats>>,
    /// `YYYY-MM` → sentiment counts
    pub time_trends: BTreeMap<String, BTreeMap<Sentiment, usize>>,
    pub common_bigrams: BTreeMap<Sentiment, Vec<String>>,
}
