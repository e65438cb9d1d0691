//! Aspect aggregation
//!
//! Merges per-review `{aspect, sentiment}` extractions into ranked
//! [`AspectRecord`]s. Aspect names are canonicalized by lower-casing and
//! trimming only; differently phrased mentions of the same theme stay separate.

use crate::models::{AspectRecord, Review, ReviewAspects, Sentiment};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Default)]
struct AspectTally {
    aspect: String,
    counts: BTreeMap<Sentiment, usize>,
    mentions: usize,
    samples: BTreeMap<Sentiment, Vec<String>>,
}

/// Build ranked aspect records
///
/// # Arguments
/// * `per_review_aspects` - Extractor output aligned with `reviews`; `None` marks a failed extraction
/// * `reviews` - Working-set reviews supplying the sample quotes (cleaned text)
/// * `top_n` - Maximum number of records returned
/// * `samples_per_aspect` - Maximum quotes kept per aspect and sentiment
///
/// Records are ordered by total mentions descending; ties keep first-seen order.
pub fn aggregate_aspects(
    per_review_aspects: &[Option<ReviewAspects>],
    reviews: &[Review],
    top_n: usize,
    samples_per_aspect: usize,
) -> Vec<AspectRecord> {
    let mut tallies: Vec<AspectTally> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut skipped_mentions = 0usize;

    for (extraction, review) in per_review_aspects.iter().zip(reviews) {
        let Some(extraction) = extraction else {
            continue;
        };

        for mention in &extraction.aspects {
            let aspect = mention.aspect.trim().to_lowercase();
            if aspect.is_empty() {
                skipped_mentions += 1;
                continue;
            }
            let Some(sentiment) = Sentiment::from_label(&mention.sentiment) else {
                skipped_mentions += 1;
                continue;
            };

            let position = *positions.entry(aspect.clone()).or_insert_with(|| {
                tallies.push(AspectTally {
                    aspect,
                    ..Default::default()
                });
                tallies.len() - 1
            });
            let tally = &mut tallies[position];

            *tally.counts.entry(sentiment).or_insert(0) += 1;
            tally.mentions += 1;

            let quotes = tally.samples.entry(sentiment).or_default();
            if quotes.len() < samples_per_aspect {
                if let Some(text) = review.usable_clean_text() {
                    quotes.push(text.to_string());
                }
            }
        }
    }

    if skipped_mentions > 0 {
        tracing::debug!(
            skipped_mentions,
            "Skipped aspect mentions with empty name or unknown sentiment"
        );
    }

    // Stable sort keeps first-seen order among equal counts
    tallies.sort_by(|a, b| b.mentions.cmp(&a.mentions));
    tallies.truncate(top_n);

    tallies.into_iter().map(into_record).collect()
}

fn into_record(tally: AspectTally) -> AspectRecord {
    let count = |s: Sentiment| tally.counts.get(&s).copied().unwrap_or(0);
    let positive_count = count(Sentiment::Positive);
    let neutral_count = count(Sentiment::Neutral);
    let negative_count = count(Sentiment::Negative);

    let mut sample_reviews = tally.samples;
    for sentiment in Sentiment::ALL {
        sample_reviews.entry(sentiment).or_default();
    }

    AspectRecord {
        aspect: tally.aspect,
        positive_count,
        neutral_count,
        negative_count,
        mentions: tally.mentions,
        positive: share(positive_count, tally.mentions),
        neutral: share(neutral_count, tally.mentions),
        negative: share(negative_count, tally.mentions),
        sample_reviews,
    }
}

/// Percentage rounded to two decimals
pub(crate) fn share(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (count as f64 / total as f64 * 10_000.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AspectMention, RawReview, SentimentSource};

    fn review(clean: &str) -> Review {
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
        review
    }

    fn aspects(mentions: &[(&str, &str)]) -> Option<ReviewAspects> {
        Some(ReviewAspects {
            aspects: mentions
                .iter()
                .map(|(aspect, sentiment)| AspectMention {
                    aspect: aspect.to_string(),
                    sentiment: sentiment.to_string(),
                })
                .collect(),
        })
    }

    #[test]
    fn test_counts_sum_to_mentions_and_sorted() {
        let reviews = vec![
            review("battery died fast"),
            review("battery is great, screen is dim"),
            review("Screen ok"),
            review("battery fine"),
        ];
        let extracted = vec![
            aspects(&[("Battery", "negative")]),
            aspects(&[(" battery ", "positive"), ("screen", "negative")]),
            aspects(&[("SCREEN", "neutral")]),
            aspects(&[("battery", "neutral")]),
        ];

        let records = aggregate_aspects(&extracted, &reviews, 10, 3);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].aspect, "battery");
        assert_eq!(records[0].mentions, 3);
        assert_eq!(records[1].aspect, "screen");
        for record in &records {
            assert_eq!(
                record.positive_count + record.neutral_count + record.negative_count,
                record.mentions
            );
        }
        assert!(records.windows(2).all(|w| w[0].mentions >= w[1].mentions));
        assert_eq!(records[1].negative, 50.0);
    }

    #[test]
    fn test_failed_extractions_are_skipped() {
        let reviews = vec![review("a"), review("b")];
        let extracted = vec![None, Some(ReviewAspects::default())];

        assert!(aggregate_aspects(&extracted, &reviews, 10, 3).is_empty());
    }

    #[test]
    fn test_quotes_capped_but_mentions_counted() {
        let reviews: Vec<Review> = (0..5).map(|i| review(&format!("price review {}", i))).collect();
        let extracted: Vec<_> = (0..5).map(|_| aspects(&[("price", "positive")])).collect();

        let records = aggregate_aspects(&extracted, &reviews, 10, 2);

        assert_eq!(records[0].positive_count, 5);
        assert_eq!(records[0].sample_reviews[&Sentiment::Positive].len(), 2);
        assert_eq!(records[0].sample_reviews[&Sentiment::Positive][0], "price review 0");
        assert!(records[0].sample_reviews[&Sentiment::Negative].is_empty());
    }

    #[test]
    fn test_ties_keep_first_seen_order_and_truncate() {
        let reviews = vec![review("x"), review("y"), review("z")];
        let extracted = vec![
            aspects(&[("size", "positive")]),
            aspects(&[("color", "positive")]),
            aspects(&[("smell", "negative")]),
        ];

        let records = aggregate_aspects(&extracted, &reviews, 2, 3);

        let names: Vec<&str> = records.iter().map(|r| r.aspect.as_str()).collect();
        assert_eq!(names, vec!["size", "color"]);
    }

    #[test]
    fn test_unknown_sentiment_is_not_counted() {
        let reviews = vec![review("x")];
        let extracted = vec![aspects(&[("fit", "mixed"), ("fit", "positive")])];

        let records = aggregate_aspects(&extracted, &reviews, 10, 3);
        assert_eq!(records[0].mentions, 1);
        assert_eq!(records[0].positive, 100.0);
    }

    #[test]
    fn test_share_rounding() {
        assert_eq!(share(1, 3), 33.33);
        assert_eq!(share(2, 3), 66.67);
        assert_eq!(share(0, 0), 0.0);
    }
}
