//! Default keyword extractor
//!
//! Ranks unigram and bigram phrases per sentiment bucket by frequency over the
//! cleaned review text. English stop words never start or end a phrase, and a
//! bigram has to occur at least twice to compete with single words.

use super::collaborators::KeywordExtractor;
use crate::models::{KeywordSet, Review, Sentiment};
use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").expect("static regex"));

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "about", "above", "after", "again", "against", "all", "also", "am", "an", "and",
        "any", "are", "as", "at", "be", "because", "been", "before", "being", "below",
        "between", "both", "but", "by", "can", "could", "did", "do", "does", "doing", "don",
        "down", "during", "each", "even", "ever", "few", "for", "from", "further", "get",
        "got", "had", "has", "have", "having", "he", "her", "here", "hers", "herself", "him",
        "himself", "his", "how", "i", "if", "in", "into", "is", "it", "its", "itself", "just",
        "ll", "me", "more", "most", "much", "my", "myself", "no", "nor", "not", "now", "of",
        "off", "on", "once", "one", "only", "or", "other", "our", "ours", "ourselves", "out",
        "over", "own", "re", "really", "s", "same", "she", "should", "so", "some", "still",
        "such", "t", "than", "that", "the", "their", "theirs", "them", "themselves", "then",
        "there", "these", "they", "this", "those", "through", "to", "too", "under", "until",
        "up", "us", "ve", "very", "was", "we", "were", "what", "when", "where", "which",
        "while", "who", "whom", "why", "will", "with", "would", "you", "your", "yours",
        "yourself", "yourselves",
    ]
    .into_iter()
    .collect()
});

/// Minimum occurrences for a bigram to be ranked
const MIN_BIGRAM_COUNT: usize = 2;

#[derive(Debug, Clone, Default)]
pub struct FrequencyKeywordExtractor;

impl FrequencyKeywordExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Top `top_n` phrases for one bucket of texts
    pub fn rank_phrases(&self, texts: &[&str], top_n: usize) -> Vec<String> {
        // phrase -> (count, first-seen order, is_bigram)
        let mut counts: HashMap<String, (usize, usize, bool)> = HashMap::new();
        let mut order = 0usize;
        let mut bump = |phrase: String, bigram: bool| {
            let entry = counts.entry(phrase).or_insert_with(|| {
                order += 1;
                (0, order, bigram)
            });
            entry.0 += 1;
        };

        for text in texts {
            let lowered = text.to_lowercase();
            let tokens: Vec<&str> = WORD_RE.find_iter(&lowered).map(|m| m.as_str()).collect();

            for token in &tokens {
                if is_content_word(token) {
                    bump(token.to_string(), false);
                }
            }
            for pair in tokens.windows(2) {
                if is_content_word(pair[0]) && is_content_word(pair[1]) {
                    bump(format!("{} {}", pair[0], pair[1]), true);
                }
            }
        }

        let mut ranked: Vec<(String, (usize, usize, bool))> = counts
            .into_iter()
            .filter(|(_, (count, _, bigram))| !bigram || *count >= MIN_BIGRAM_COUNT)
            .collect();
        ranked.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then(a.1 .1.cmp(&b.1 .1)));
        ranked.into_iter().take(top_n).map(|(phrase, _)| phrase).collect()
    }
}

fn is_content_word(token: &str) -> bool {
    token.chars().count() >= 2
        && !token.chars().all(|c| c.is_ascii_digit())
        && !STOP_WORDS.contains(token)
}

impl KeywordExtractor for FrequencyKeywordExtractor {
    fn extract_keywords(&self, reviews: &[Review], top_n: usize) -> Result<KeywordSet> {
        let mut keywords = KeywordSet::new();
        for sentiment in Sentiment::ALL {
            let texts: Vec<&str> = reviews
                .iter()
                .filter(|r| r.sentiment == Some(sentiment))
                .filter_map(Review::usable_clean_text)
                .collect();
            keywords.insert(sentiment, self.rank_phrases(&texts, top_n));
        }
        Ok(keywords)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RawReview, SentimentSource};

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

    #[test]
    fn test_stop_words_and_numbers_excluded() {
        let phrases = FrequencyKeywordExtractor::new()
            .rank_phrases(&["The toy is the best toy", "it is 100 percent the best"], 10);
        assert_eq!(phrases[0], "toy");
        assert_eq!(phrases[1], "best");
        assert!(!phrases.iter().any(|p| p == "the" || p == "is" || p == "100"));
    }

    #[test]
    fn test_bigrams_need_repeats() {
        let phrases = FrequencyKeywordExtractor::new().rank_phrases(
            &["free shipping rocks", "free shipping again", "squeaky ball"],
            10,
        );
        assert!(phrases.contains(&"free shipping".to_string()));
        assert!(!phrases.contains(&"squeaky ball".to_string()));
    }

    #[test]
    fn test_every_sentiment_bucket_present() {
        let reviews = vec![
            review("durable chew toy", Sentiment::Positive),
            review("durable and sturdy", Sentiment::Positive),
        ];

        let keywords = FrequencyKeywordExtractor::new()
            .extract_keywords(&reviews, 25)
            .unwrap();

        assert_eq!(keywords.len(), 3);
        assert_eq!(keywords[&Sentiment::Positive][0], "durable");
        assert!(keywords[&Sentiment::Negative].is_empty());
    }

    #[test]
    fn test_top_n_respected() {
        let phrases = FrequencyKeywordExtractor::new()
            .rank_phrases(&["alpha beta gamma delta epsilon"], 3);
        assert_eq!(phrases, vec!["alpha", "beta", "gamma"]);
    }
}
