//! Pipeline tuning parameters
//!
//! Batch sizes and the concurrency permit count exist to stay inside upstream
//! rate limits. Raising `max_concurrent_batches` lowers latency but makes
//! upstream throttling more likely.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Pipeline parameters (decoded from the `[pipeline]` TOML table)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineParameters {
    /// Stop fetching after this many raw reviews (default: 15000)
    #[serde(default = "default_max_reviews")]
    pub max_reviews: usize,

    /// Reviews per cleaner call (default: 100)
    #[serde(default = "default_clean_batch_size")]
    pub clean_batch_size: usize,

    /// Texts per embedding request (default: 2048)
    #[serde(default = "default_embed_batch_size")]
    pub embed_batch_size: usize,

    /// Reviews per aspect-extraction request (default: 25)
    #[serde(default = "default_aspect_batch_size")]
    pub aspect_batch_size: usize,

    /// Concurrent batches per batch stage (default: 15)
    #[serde(default = "default_max_concurrent_batches")]
    pub max_concurrent_batches: usize,

    /// Aspect records kept (default: 10)
    #[serde(default = "default_aspect_top_n")]
    pub aspect_top_n: usize,

    /// Quotes per aspect and sentiment (default: 3)
    #[serde(default = "default_samples_per_aspect")]
    pub samples_per_aspect: usize,

    /// Keywords per sentiment (default: 25)
    #[serde(default = "default_keyword_top_n")]
    pub keyword_top_n: usize,

    /// Matched reviews per keyword (default: 20)
    #[serde(default = "default_samples_per_keyword")]
    pub samples_per_keyword: usize,

    /// Random sample reviews per sentiment in the stats snapshot (default: 20)
    #[serde(default = "default_stats_samples")]
    pub stats_samples: usize,

    /// Seed for stats sampling; random when unset
    #[serde(default)]
    pub sample_seed: Option<u64>,

    /// Pause after the clean substeps reach "done" so pollers can see it (default: 2000ms)
    #[serde(default = "default_clean_done_delay_ms")]
    pub clean_done_delay_ms: u64,

    /// Pause on either side of entering the summary stage (default: 4000ms)
    #[serde(default = "default_summary_stage_delay_ms")]
    pub summary_stage_delay_ms: u64,
}

impl PipelineParameters {
    pub fn clean_done_delay(&self) -> Duration {
        Duration::from_millis(self.clean_done_delay_ms)
    }

    pub fn summary_stage_delay(&self) -> Duration {
        Duration::from_millis(self.summary_stage_delay_ms)
    }

    /// Same parameters with both scheduling pauses removed
    pub fn without_delays(mut self) -> Self {
        self.clean_done_delay_ms = 0;
        self.summary_stage_delay_ms = 0;
        self
    }
}

impl Default for PipelineParameters {
    fn default() -> Self {
        Self {
            max_reviews: default_max_reviews(),
            clean_batch_size: default_clean_batch_size(),
            embed_batch_size: default_embed_batch_size(),
            aspect_batch_size: default_aspect_batch_size(),
            max_concurrent_batches: default_max_concurrent_batches(),
            aspect_top_n: default_aspect_top_n(),
            samples_per_aspect: default_samples_per_aspect(),
            keyword_top_n: default_keyword_top_n(),
            samples_per_keyword: default_samples_per_keyword(),
            stats_samples: default_stats_samples(),
            sample_seed: None,
            clean_done_delay_ms: default_clean_done_delay_ms(),
            summary_stage_delay_ms: default_summary_stage_delay_ms(),
        }
    }
}

// Default value functions
fn default_max_reviews() -> usize {
    15_000
}

fn default_clean_batch_size() -> usize {
    100
}

fn default_embed_batch_size() -> usize {
    2048
}

fn default_aspect_batch_size() -> usize {
    25
}

fn default_max_concurrent_batches() -> usize {
    15
}

fn default_aspect_top_n() -> usize {
    10
}

fn default_samples_per_aspect() -> usize {
    3
}

fn default_keyword_top_n() -> usize {
    25
}

fn default_samples_per_keyword() -> usize {
    20
}

fn default_stats_samples() -> usize {
    20
}

fn default_clean_done_delay_ms() -> u64 {
    2000
}

fn default_summary_stage_delay_ms() -> u64 {
    4000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_table_fills_defaults() {
        let params: PipelineParameters =
            serde_json::from_str(r#"{"max_concurrent_batches": 4}"#).unwrap();
        assert_eq!(params.max_concurrent_batches, 4);
        assert_eq!(params.aspect_batch_size, 25);
        assert_eq!(params.samples_per_keyword, 20);
        assert_eq!(params.clean_done_delay(), Duration::from_secs(2));
    }

    #[test]
    fn test_without_delays() {
        let params = PipelineParameters::default().without_delays();
        assert_eq!(params.clean_done_delay(), Duration::ZERO);
        assert_eq!(params.summary_stage_delay(), Duration::ZERO);
    }
}
