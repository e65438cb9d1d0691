//! User feedback on generated summaries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// POST /feedback body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedbackRequest {
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub feedback: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// One line of the append-only feedback log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub user: Option<String>,
    pub sku: Option<String>,
    pub summary: Option<String>,
    pub feedback: Option<String>,
    pub comment: Option<String>,
    pub timestamp: String,
}

impl FeedbackRecord {
    /// Build a record, stamping the current UTC time when the client sent none
    pub fn from_request(request: FeedbackRequest, now: DateTime<Utc>) -> Self {
        let timestamp = request
            .timestamp
            .filter(|ts| !ts.trim().is_empty())
            .unwrap_or_else(|| now.to_rfc3339());

        Self {
            user: request.user,
            sku: request.sku,
            summary: request.summary,
            feedback: request.feedback,
            comment: request.comment,
            timestamp,
        }
    }
}
