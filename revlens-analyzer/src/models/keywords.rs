//! Keyword sets and keyword-matched review samples

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::Sentiment;

/// Sentiment → keywords in rank order
pub type KeywordSet = BTreeMap<Sentiment, Vec<String>>;

/// Sample reviews matched to one keyword
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordMatch {
    pub keyword: String,
    pub samples: Vec<String>,
}

/// Sentiment → keyword matches, in keyword rank order
///
/// Keywords without any matching review are omitted.
pub type KeywordSampleIndex = BTreeMap<Sentiment, Vec<KeywordMatch>>;
