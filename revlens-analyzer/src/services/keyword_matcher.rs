//! Keyword-to-review sample matching
//!
//! For every top keyword of a sentiment bucket, collects up to `M` reviews of
//! that sentiment mentioning the keyword:
//!
//! - Tier 1: every keyword token appears in the review's token set
//! - Tier 2 (only when tier 1 under-fills): at least one keyword token appears,
//!   skipping reviews already collected
//!
//! Keywords that match nothing are left out of the index.

use crate::models::{KeywordMatch, KeywordSampleIndex, KeywordSet, Review};
use std::collections::HashSet;

/// Lower-case, strip ASCII punctuation, split on whitespace
pub fn normalize_tokens(text: &str) -> Vec<String> {
    let stripped: String = text
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_ascii_punctuation())
        .collect();
    stripped.split_whitespace().map(str::to_string).collect()
}

struct Candidate<'a> {
    text: &'a str,
    tokens: HashSet<String>,
}

/// Build the keyword sample index for every sentiment bucket in `top_keywords`
pub fn match_keywords(
    top_keywords: &KeywordSet,
    reviews: &[Review],
    samples_per_keyword: usize,
) -> KeywordSampleIndex {
    let mut index = KeywordSampleIndex::new();

    for (&sentiment, keywords) in top_keywords {
        let candidates: Vec<Candidate<'_>> = reviews
            .iter()
            .filter(|r| r.sentiment == Some(sentiment))
            .filter_map(|r| r.usable_clean_text())
            .map(|text| Candidate {
                text,
                tokens: normalize_tokens(text).into_iter().collect(),
            })
            .collect();

        let mut matches = Vec::new();
        for keyword in keywords {
            let samples = samples_for_keyword(keyword, &candidates, samples_per_keyword);
            if samples.is_empty() {
                tracing::debug!(%sentiment, keyword = %keyword, "No review matched keyword");
                continue;
            }
            matches.push(KeywordMatch {
                keyword: keyword.clone(),
                samples,
            });
        }

        tracing::debug!(
            %sentiment,
            candidates = candidates.len(),
            keywords = keywords.len(),
            matched = matches.len(),
            "Matched keyword samples"
        );
        index.insert(sentiment, matches);
    }

    index
}

fn samples_for_keyword(keyword: &str, candidates: &[Candidate<'_>], cap: usize) -> Vec<String> {
    let keyword_tokens = normalize_tokens(keyword);
    if keyword_tokens.is_empty() || cap == 0 {
        return Vec::new();
    }

    let mut taken = vec![false; candidates.len()];
    let mut samples = Vec::new();

    for (i, candidate) in candidates.iter().enumerate() {
        if samples.len() >= cap {
            break;
        }
        if keyword_tokens.iter().all(|t| candidate.tokens.contains(t)) {
            taken[i] = true;
            samples.push(candidate.text.to_string());
        }
    }

    for (i, candidate) in candidates.iter().enumerate() {
        if samples.len() >= cap {
            break;
        }
        if !taken[i] && keyword_tokens.iter().any(|t| candidate.tokens.contains(t)) {
            samples.push(candidate.text.to_string());
        }
    }

    samples
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RawReview, Sentiment, SentimentSource};

    fn review(clean: &str, sentiment: Sentiment) -> Review {
        let mut review = Review::from_raw(
            RawReview {
                sku: "SKU1".to_string(),
                text: Some(clean.to_string()),
                rating: None,
                created_date: None,
            },
            SentimentSource::Text,
        );
        review.clean_text = Some(clean.to_string());
        review.sentiment = Some(sentiment);
        review
    }

    fn keywords(sentiment: Sentiment, words: &[&str]) -> KeywordSet {
        let mut set = KeywordSet::new();
        set.insert(sentiment, words.iter().map(|w| w.to_string()).collect());
        set
    }

    #[test]
    fn test_normalize_tokens() {
        assert_eq!(
            normalize_tokens("Shipping was FREE, and fast!"),
            vec!["shipping", "was", "free", "and", "fast"]
        );
        assert!(normalize_tokens("?!...").is_empty());
    }

    #[test]
    fn test_tier_one_only_when_cap_is_met() {
        let reviews = vec![
            review("Shipping was free and fast", Sentiment::Positive),
            review("Totally free item", Sentiment::Positive),
        ];
        let index = match_keywords(&keywords(Sentiment::Positive, &["free shipping"]), &reviews, 1);

        let matches = &index[&Sentiment::Positive];
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].samples, vec!["Shipping was free and fast"]);
    }

    #[test]
    fn test_tier_two_fills_remaining_cap() {
        let reviews = vec![
            review("Totally free item", Sentiment::Positive),
            review("Shipping was free and fast", Sentiment::Positive),
        ];
        let index = match_keywords(&keywords(Sentiment::Positive, &["free shipping"]), &reviews, 20);

        // Full matches first, then partial matches in review order
        assert_eq!(
            index[&Sentiment::Positive][0].samples,
            vec!["Shipping was free and fast", "Totally free item"]
        );
    }

    #[test]
    fn test_only_same_sentiment_reviews_are_candidates() {
        let reviews = vec![
            review("free shipping, nice", Sentiment::Negative),
            review("", Sentiment::Positive),
        ];
        let index = match_keywords(&keywords(Sentiment::Positive, &["free shipping"]), &reviews, 20);

        assert!(index[&Sentiment::Positive].is_empty());
    }

    #[test]
    fn test_cap_is_never_exceeded() {
        let reviews: Vec<Review> = (0..30)
            .map(|i| review(&format!("soft toy number {}", i), Sentiment::Neutral))
            .collect();
        let index = match_keywords(&keywords(Sentiment::Neutral, &["soft toy", "toy"]), &reviews, 20);

        for matched in &index[&Sentiment::Neutral] {
            assert_eq!(matched.samples.len(), 20);
        }
    }

    #[test]
    fn test_tokens_must_match_whole_words() {
        let reviews = vec![review("freedom is great", Sentiment::Positive)];
        let index = match_keywords(&keywords(Sentiment::Positive, &["free"]), &reviews, 20);
        assert!(index[&Sentiment::Positive].is_empty());
    }
}
