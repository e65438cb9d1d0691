//! Aspect extraction payloads and aggregated aspect records

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::Sentiment;

/// One `{aspect, sentiment}` mention returned by the aspect extractor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AspectMention {
    pub aspect: String,
    pub sentiment: String,
}

/// Extractor output for one review
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewAspects {
    #[serde(default)]
    pub aspects: Vec<AspectMention>,
}

/// Ranked aspect theme with per-sentiment counts and sample quotes
///
/// `mentions` always equals the sum of the three per-sentiment counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AspectRecord {
    /// Lower-cased, trimmed aspect name
    pub aspect: String,
    pub positive_count: usize,
    pub neutral_count: usize,
    pub negative_count: usize,
    pub mentions: usize,
    /// Share of mentions per sentiment, in percent
    pub positive: f64,
    pub neutral: f64,
    pub negative: f64,
    pub sample_reviews: BTreeMap<Sentiment, Vec<String>>,
}
