//! Review records and sentiment labels
//!
//! A [`Review`] starts as the raw `{sku, text?, rating?, created_date?}` tuple from the
//! review source and gains fields as it moves through the pipeline. Fields are only ever
//! added, never cleared, for the lifetime of a job.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Sentiment assigned to a review or an aspect mention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    /// All labels in display order
    pub const ALL: [Sentiment; 3] = [Sentiment::Positive, Sentiment::Neutral, Sentiment::Negative];

    pub fn as_str(self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Negative => "negative",
        }
    }

    /// Parse a classifier or LLM label
    ///
    /// Accepts the names in any case as well as the numeric class ids used by
    /// the trained classifier (`0` negative, `1` neutral, `2` positive).
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "positive" | "pos" | "2" => Some(Sentiment::Positive),
            "neutral" | "neu" | "1" => Some(Sentiment::Neutral),
            "negative" | "neg" | "0" => Some(Sentiment::Negative),
            _ => None,
        }
    }

    /// Fixed star-rating table: 1-2 negative, 3 neutral, 4-5 positive
    pub fn from_star(stars: i64) -> Option<Self> {
        match stars {
            1 | 2 => Some(Sentiment::Negative),
            3 => Some(Sentiment::Neutral),
            4 | 5 => Some(Sentiment::Positive),
            _ => None,
        }
    }
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a review's sentiment came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentSource {
    /// Classified from the embedded review text
    Text,
    /// Mapped from the star rating (review had no text)
    RatingOnly,
}

/// Star rating as delivered by the source
///
/// Upstream data is loosely typed, so ratings may arrive as numbers or strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawRating {
    Number(f64),
    Text(String),
}

impl RawRating {
    /// Integer star value, if the rating is numeric
    ///
    /// Numbers are truncated toward zero; strings must parse as integers.
    pub fn as_stars(&self) -> Option<i64> {
        match self {
            RawRating::Number(n) if n.is_finite() => Some(n.trunc() as i64),
            RawRating::Number(_) => None,
            RawRating::Text(s) => s.trim().parse::<i64>().ok(),
        }
    }

    /// Sentiment from the fixed rating table; `None` for anything invalid
    pub fn sentiment(&self) -> Option<Sentiment> {
        self.as_stars().and_then(Sentiment::from_star)
    }

    /// Histogram key for the star-rating distribution
    pub fn histogram_key(&self) -> String {
        match self {
            RawRating::Number(n) if n.fract() == 0.0 && n.is_finite() => format!("{}", *n as i64),
            RawRating::Number(n) => n.to_string(),
            RawRating::Text(s) => s.trim().to_string(),
        }
    }
}

/// One row from the review source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawReview {
    #[serde(default)]
    pub sku: String,
    #[serde(default, alias = "customer_review")]
    pub text: Option<String>,
    #[serde(default, alias = "product_rating")]
    pub rating: Option<RawRating>,
    #[serde(default)]
    pub created_date: Option<String>,
}

/// Output of the text cleaner for one review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanedText {
    /// Cleaned text; `None` when the cleaner rejected the review (e.g. non-English)
    pub clean: Option<String>,
    pub lang: String,
    /// SHA-256 hex digest of the original text
    pub hash: String,
}

/// Classifier output for one embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub label: Sentiment,
    pub probabilities: BTreeMap<Sentiment, f64>,
}

/// Working-set review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub sku: String,
    pub text: Option<String>,
    pub rating: Option<RawRating>,
    pub created_date: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub clean_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<Sentiment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment_probabilities: Option<BTreeMap<Sentiment, f64>>,
    pub sentiment_source: SentimentSource,
}

impl Review {
    pub fn from_raw(raw: RawReview, source: SentimentSource) -> Self {
        Self {
            sku: raw.sku,
            text: raw.text,
            rating: raw.rating,
            created_date: raw.created_date,
            clean_text: None,
            language: None,
            content_hash: None,
            embedding: None,
            sentiment: None,
            sentiment_probabilities: None,
            sentiment_source: source,
        }
    }

    /// Cleaned text if present and non-blank
    pub fn usable_clean_text(&self) -> Option<&str> {
        self.clean_text
            .as_deref()
            .filter(|text| !text.trim().is_empty())
    }

    pub fn apply_cleaning(&mut self, cleaned: CleanedText) {
        self.clean_text = cleaned.clean;
        self.language = Some(cleaned.lang);
        self.content_hash = Some(cleaned.hash);
    }

    pub fn apply_classification(&mut self, classification: Classification) {
        self.sentiment = Some(classification.label);
        self.sentiment_probabilities = Some(classification.probabilities);
    }
}

/// Reviews after the null/blank/duplicate filter
#[derive(Debug, Clone, Default)]
pub struct PartitionedReviews {
    /// Non-blank text, de-duplicated on exact text (first occurrence wins)
    pub with_text: Vec<Review>,
    /// Blank or missing text but a rating is present
    pub rating_only: Vec<Review>,
    /// Rows that were neither (duplicates, or no text and no rating)
    pub dropped: usize,
    /// Position of each `with_text` review among the kept rows, in source order
    pub text_positions: Vec<usize>,
    /// Position of each `rating_only` review among the kept rows, in source order
    pub rating_only_positions: Vec<usize>,
}

impl PartitionedReviews {
    /// Number of rows that survived the filter
    pub fn kept(&self) -> usize {
        self.text_positions.len() + self.rating_only_positions.len()
    }
}

/// Split raw reviews into the text branch and the rating-only branch
pub fn partition_reviews(raw: Vec<RawReview>) -> PartitionedReviews {
    let mut seen: HashSet<String> = HashSet::new();
    let mut partitioned = PartitionedReviews::default();

    for review in raw {
        let has_text = review
            .text
            .as_deref()
            .map(|t| !t.trim().is_empty())
            .unwrap_or(false);

        if has_text {
            let key = review.text.clone().unwrap_or_default();
            if seen.insert(key) {
                let position = partitioned.kept();
                partitioned.text_positions.push(position);
                partitioned
                    .with_text
                    .push(Review::from_raw(review, SentimentSource::Text));
            } else {
                partitioned.dropped += 1;
            }
        } else if review.rating.is_some() {
            let mut scored = Review::from_raw(review, SentimentSource::RatingOnly);
            scored.sentiment = scored.rating.as_ref().and_then(RawRating::sentiment);
            let position = partitioned.kept();
            partitioned.rating_only_positions.push(position);
            partitioned.rating_only.push(scored);
        } else {
            partitioned.dropped += 1;
        }
    }

    partitioned
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(text: Option<&str>, rating: Option<RawRating>) -> RawReview {
        RawReview {
            sku: "SKU1".to_string(),
            text: text.map(str::to_string),
            rating,
            created_date: None,
        }
    }

    #[test]
    fn test_rating_table() {
        let cases = [
            (1.0, Some(Sentiment::Negative)),
            (2.0, Some(Sentiment::Negative)),
            (3.0, Some(Sentiment::Neutral)),
            (4.0, Some(Sentiment::Positive)),
            (5.0, Some(Sentiment::Positive)),
            (0.0, None),
            (6.0, None),
        ];
        for (stars, expected) in cases {
            assert_eq!(RawRating::Number(stars).sentiment(), expected, "rating {}", stars);
        }
    }

    #[test]
    fn test_invalid_rating_has_no_sentiment() {
        assert_eq!(RawRating::Text("five".to_string()).sentiment(), None);
        assert_eq!(RawRating::Text("".to_string()).sentiment(), None);
        assert_eq!(RawRating::Number(f64::NAN).sentiment(), None);
        assert_eq!(RawRating::Text(" 4 ".to_string()).sentiment(), Some(Sentiment::Positive));
    }

    #[test]
    fn test_histogram_key() {
        assert_eq!(RawRating::Number(5.0).histogram_key(), "5");
        assert_eq!(RawRating::Number(4.5).histogram_key(), "4.5");
        assert_eq!(RawRating::Text("3".to_string()).histogram_key(), "3");
    }

    #[test]
    fn test_from_label_accepts_names_and_class_ids() {
        assert_eq!(Sentiment::from_label("Positive"), Some(Sentiment::Positive));
        assert_eq!(Sentiment::from_label("0"), Some(Sentiment::Negative));
        assert_eq!(Sentiment::from_label("1"), Some(Sentiment::Neutral));
        assert_eq!(Sentiment::from_label("mixed"), None);
    }

    #[test]
    fn test_partition_splits_branches() {
        let partitioned = partition_reviews(vec![
            raw(Some("Great toy, my dog loves it!"), Some(RawRating::Number(5.0))),
            raw(None, Some(RawRating::Number(2.0))),
            raw(Some(""), None),
            raw(Some("Great toy, my dog loves it!"), Some(RawRating::Number(4.0))),
            raw(Some("   "), Some(RawRating::Number(3.0))),
        ]);

        assert_eq!(partitioned.with_text.len(), 1);
        assert_eq!(partitioned.with_text[0].rating, Some(RawRating::Number(5.0)));
        assert_eq!(partitioned.rating_only.len(), 2);
        assert_eq!(partitioned.rating_only[0].sentiment, Some(Sentiment::Negative));
        assert_eq!(partitioned.rating_only[1].sentiment, Some(Sentiment::Neutral));
        assert!(partitioned
            .rating_only
            .iter()
            .all(|r| r.sentiment_source == SentimentSource::RatingOnly && r.embedding.is_none()));
        assert_eq!(partitioned.dropped, 2);
        assert_eq!(partitioned.text_positions, vec![0]);
        assert_eq!(partitioned.rating_only_positions, vec![1, 2]);
        assert_eq!(partitioned.kept(), 3);
    }

    #[test]
    fn test_raw_review_accepts_source_column_names() {
        let json = r#"{"sku":"A1","customer_review":"ok","product_rating":"4","created_date":"2024-01-02"}"#;
        let review: RawReview = serde_json::from_str(json).unwrap();
        assert_eq!(review.text.as_deref(), Some("ok"));
        assert_eq!(review.rating, Some(RawRating::Text("4".to_string())));
    }
}
