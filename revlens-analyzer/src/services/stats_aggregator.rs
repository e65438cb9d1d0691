//! Analytics snapshot builder
//!
//! [`build_summary`] is a pure function over the merged working set: it never
//! mutates its inputs, and with a seeded RNG it is fully deterministic.

use crate::models::{
    ConfidenceStats, KeywordSampleIndex, KeywordSet, LengthStats, Review, Sentiment, StatsSummary,
};
use crate::services::aspect_aggregator::share;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use regex::Regex;
use std::collections::{BTreeMap, HashMap};

/// Bigrams reported per sentiment
const TOP_BIGRAMS: usize = 10;

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").expect("static regex"));

/// Build the snapshot with a fresh RNG (seeded when `seed` is set)
pub fn build_summary_seeded(
    reviews: &[Review],
    top_keywords: &KeywordSet,
    keyword_samples: &KeywordSampleIndex,
    n_samples: usize,
    seed: Option<u64>,
) -> StatsSummary {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    build_summary(reviews, top_keywords, keyword_samples, n_samples, &mut rng)
}

/// Build the analytics snapshot
///
/// # Arguments
/// * `reviews` - Merged working set (text and rating-only reviews)
/// * `top_keywords` - Keyword extractor output, copied into the snapshot
/// * `keyword_samples` - Keyword matcher output, copied into the snapshot
/// * `n_samples` - Random cleaned-text samples per sentiment
/// * `rng` - Source of randomness for `sample_reviews` only
pub fn build_summary<G: Rng + ?Sized>(
    reviews: &[Review],
    top_keywords: &KeywordSet,
    keyword_samples: &KeywordSampleIndex,
    n_samples: usize,
    rng: &mut G,
) -> StatsSummary {
    let mut sentiment_counts: BTreeMap<Sentiment, usize> = BTreeMap::new();
    let mut unlabeled_reviews = 0;
    for review in reviews {
        match review.sentiment {
            Some(sentiment) => *sentiment_counts.entry(sentiment).or_insert(0) += 1,
            None => unlabeled_reviews += 1,
        }
    }
    // Shares are of all reviews; unlabeled ones only appear in `unlabeled_reviews`
    let sentiment_percentages = sentiment_counts
        .iter()
        .map(|(&sentiment, &count)| (sentiment, share(count, reviews.len())))
        .collect();

    let mut star_rating_distribution: BTreeMap<String, usize> = BTreeMap::new();
    for rating in reviews.iter().filter_map(|r| r.rating.as_ref()) {
        *star_rating_distribution.entry(rating.histogram_key()).or_insert(0) += 1;
    }

    let mut sample_reviews = BTreeMap::new();
    let mut sentiment_confidence = BTreeMap::new();
    let mut review_length_stats = BTreeMap::new();
    let mut common_bigrams = BTreeMap::new();

    for sentiment in Sentiment::ALL {
        let texts = clean_texts_for(reviews, sentiment);

        let samples: Vec<String> = texts
            .choose_multiple(rng, n_samples.min(texts.len()))
            .map(|t| t.to_string())
            .collect();
        sample_reviews.insert(sentiment, samples);

        let probabilities: Vec<f64> = reviews
            .iter()
            .filter_map(|r| r.sentiment_probabilities.as_ref())
            .filter_map(|p| p.get(&sentiment).copied())
            .collect();
        sentiment_confidence.insert(sentiment, confidence_stats(&probabilities));

        let lengths: Vec<usize> = texts.iter().map(|t| t.split_whitespace().count()).collect();
        review_length_stats.insert(sentiment, length_stats(lengths));

        common_bigrams.insert(sentiment, top_bigrams(&texts, TOP_BIGRAMS));
    }

    StatsSummary {
        total_reviews: reviews.len(),
        unlabeled_reviews,
        sentiment_counts,
        sentiment_percentages,
        star_rating_distribution,
        top_keywords: top_keywords.clone(),
        sample_reviews,
        keyword_matched_samples: keyword_samples.clone(),
        sentiment_confidence,
        review_length_stats,
        time_trends: time_trends(reviews),
        common_bigrams,
    }
}

fn clean_texts_for(reviews: &[Review], sentiment: Sentiment) -> Vec<&str> {
    reviews
        .iter()
        .filter(|r| r.sentiment == Some(sentiment))
        .filter_map(Review::usable_clean_text)
        .collect()
}

fn confidence_stats(values: &[f64]) -> Option<ConfidenceStats> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let avg = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / n;

    Some(ConfidenceStats {
        avg,
        min: values.iter().copied().fold(f64::INFINITY, f64::min),
        max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        std: variance.sqrt(),
    })
}

fn length_stats(mut lengths: Vec<usize>) -> Option<LengthStats> {
    if lengths.is_empty() {
        return None;
    }
    lengths.sort_unstable();
    let n = lengths.len();
    let median = if n % 2 == 1 {
        lengths[n / 2] as f64
    } else {
        (lengths[n / 2 - 1] + lengths[n / 2]) as f64 / 2.0
    };

    Some(LengthStats {
        avg: lengths.iter().sum::<usize>() as f64 / n as f64,
        min: lengths[0],
        max: lengths[n - 1],
        median,
    })
}

/// `YYYY-MM` bucket of a creation date; `None` when the date does not parse
pub fn month_bucket(date: &str) -> Option<String> {
    let date = date.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(date) {
        return Some(dt.format("%Y-%m").to_string());
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(date, format) {
            return Some(dt.format("%Y-%m").to_string());
        }
    }
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .ok()
        .map(|d| d.format("%Y-%m").to_string())
}

fn time_trends(reviews: &[Review]) -> BTreeMap<String, BTreeMap<Sentiment, usize>> {
    let mut trends: BTreeMap<String, BTreeMap<Sentiment, usize>> = BTreeMap::new();
    for review in reviews {
        let (Some(sentiment), Some(date)) = (review.sentiment, review.created_date.as_deref()) else {
            continue;
        };
        if let Some(month) = month_bucket(date) {
            *trends.entry(month).or_default().entry(sentiment).or_insert(0) += 1;
        }
    }
    trends
}

/// Most frequent adjacent word pairs; ties keep first-seen order
fn top_bigrams(texts: &[&str], limit: usize) -> Vec<String> {
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    let mut next_order = 0usize;

    for text in texts {
        let lowered = text.to_lowercase();
        let tokens: Vec<&str> = WORD_RE.find_iter(&lowered).map(|m| m.as_str()).collect();
        for pair in tokens.windows(2) {
            let entry = counts
                .entry(format!("{} {}", pair[0], pair[1]))
                .or_insert_with(|| {
                    next_order += 1;
                    (0, next_order)
                });
            entry.0 += 1;
        }
    }

    let mut ranked: Vec<(String, (usize, usize))> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then(a.1 .1.cmp(&b.1 .1)));
    ranked.into_iter().take(limit).map(|(bigram, _)| bigram).collect()
}
