//! Analysis job state machine
//!
//! A job moves through a fixed, ordered stage sequence:
//! FETCH → CLEAN → EMBED → CLASSIFY → ASPECT_EXTRACT → KEYWORD_EXTRACT → STATS_BUILD → SUMMARY → DONE
//!
//! Status is tracked separately from the stage: a failed job keeps the stage it
//! failed in so pollers can see where it stopped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AspectRecord, KeywordSampleIndex, KeywordSet, StatsSummary};

/// Job lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Created, not yet picked up by the background task
    Pending,
    /// Stages running
    Processing,
    /// All stages finished, result available
    Complete,
    /// A stage failed; see `failed_stage` and `error`
    Failed,
}

/// Pipeline stage, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Fetch,
    Clean,
    Embed,
    Classify,
    AspectExtract,
    KeywordExtract,
    StatsBuild,
    Summary,
    Done,
}

impl Stage {
    pub const ORDERED: [Stage; 9] = [
        Stage::Fetch,
        Stage::Clean,
        Stage::Embed,
        Stage::Classify,
        Stage::AspectExtract,
        Stage::KeywordExtract,
        Stage::StatsBuild,
        Stage::Summary,
        Stage::Done,
    ];

    /// Position in the stage sequence (0-based)
    pub fn sequence_index(self) -> u8 {
        match self {
            Stage::Fetch => 0,
            Stage::Clean => 1,
            Stage::Embed => 2,
            Stage::Classify => 3,
            Stage::AspectExtract => 4,
            Stage::KeywordExtract => 5,
            Stage::StatsBuild => 6,
            Stage::Summary => 7,
            Stage::Done => 8,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Stage::Fetch => "fetch",
            Stage::Clean => "clean",
            Stage::Embed => "embed",
            Stage::Classify => "classify",
            Stage::AspectExtract => "aspect_extract",
            Stage::KeywordExtract => "keyword_extract",
            Stage::StatsBuild => "stats_build",
            Stage::Summary => "summary",
            Stage::Done => "done",
        }
    }

    pub fn next(self) -> Option<Stage> {
        Stage::ORDERED
            .get(self.sequence_index() as usize + 1)
            .copied()
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Progress of one named cleaning substep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubstepStatus {
    Pending,
    InProgress,
    Done,
}

/// Named cleaning substeps, reported while the job is in the clean stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanSubsteps {
    pub html: SubstepStatus,
    pub encoding: SubstepStatus,
    pub emoji: SubstepStatus,
    pub control: SubstepStatus,
    pub whitespace: SubstepStatus,
}

impl CleanSubsteps {
    /// The substeps advance together as one barrier
    pub fn set_all(&mut self, status: SubstepStatus) {
        self.html = status;
        self.encoding = status;
        self.emoji = status;
        self.control = status;
        self.whitespace = status;
    }
}

impl Default for CleanSubsteps {
    fn default() -> Self {
        Self {
            html: SubstepStatus::Pending,
            encoding: SubstepStatus::Pending,
            emoji: SubstepStatus::Pending,
            control: SubstepStatus::Pending,
            whitespace: SubstepStatus::Pending,
        }
    }
}

/// Item counts recorded as stages complete
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewCounts {
    pub fetched: usize,
    pub with_text: usize,
    pub rating_only: usize,
    pub dropped: usize,
    pub cleaned: usize,
    pub embedded: usize,
    pub classified: usize,
    pub aspect_extracted: usize,
}

/// Final payload served by GET /results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub sku: String,
    pub summary: String,
    pub stats: StatsSummary,
    pub aspect_summary: Vec<AspectRecord>,
}

/// Stage change record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageTransition {
    pub job_id: Uuid,
    pub old_stage: Stage,
    pub new_stage: Stage,
    pub transitioned_at: DateTime<Utc>,
}

/// One tracked analysis run for a SKU
///
/// Every artifact is optional: `None` means "not computed yet", while
/// `Some(empty)` means the stage ran and found nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub sku: String,
    pub status: JobStatus,
    pub stage: Stage,
    pub clean_substeps: CleanSubsteps,
    pub counts: ReviewCounts,

    pub aspect_summary: Option<Vec<AspectRecord>>,
    pub top_keywords: Option<KeywordSet>,
    pub keyword_samples: Option<KeywordSampleIndex>,
    pub stats_summary: Option<StatsSummary>,
    pub result: Option<AnalysisResult>,

    pub failed_stage: Option<Stage>,
    pub error: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(sku: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            sku: sku.into(),
            status: JobStatus::Pending,
            stage: Stage::Fetch,
            clean_substeps: CleanSubsteps::default(),
            counts: ReviewCounts::default(),
            aspect_summary: None,
            top_keywords: None,
            keyword_samples: None,
            stats_summary: None,
            result: None,
            failed_stage: None,
            error: None,
            created_at: now,
            updated_at: now,
            finished_at: None,
        }
    }

    /// Move to a new stage
    pub fn transition_to(&mut self, new_stage: Stage) -> StageTransition {
        let transition = StageTransition {
            job_id: self.id,
            old_stage: self.stage,
            new_stage,
            transitioned_at: Utc::now(),
        };
        self.stage = new_stage;
        self.updated_at = transition.transitioned_at;
        transition
    }

    pub fn mark_processing(&mut self) {
        self.status = JobStatus::Processing;
        self.updated_at = Utc::now();
    }

    pub fn complete(&mut self, result: AnalysisResult) {
        let now = Utc::now();
        self.stage = Stage::Done;
        self.status = JobStatus::Complete;
        self.result = Some(result);
        self.updated_at = now;
        self.finished_at = Some(now);
    }

    /// Record a failure in the current stage
    pub fn fail(&mut self, message: impl Into<String>) {
        let now = Utc::now();
        self.status = JobStatus::Failed;
        self.failed_stage = Some(self.stage);
        self.error = Some(message.into());
        self.updated_at = now;
        self.finished_at = Some(now);
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, JobStatus::Complete | JobStatus::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_sequence_is_ordered() {
        for (i, stage) in Stage::ORDERED.iter().enumerate() {
            assert_eq!(stage.sequence_index() as usize, i);
        }
        assert_eq!(Stage::Classify.next(), Some(Stage::AspectExtract));
        assert_eq!(Stage::Done.next(), None);
        assert!(Stage::AspectExtract < Stage::KeywordExtract);
    }

    #[test]
    fn test_new_job_is_pending() {
        let job = Job::new("SKU1");
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.stage, Stage::Fetch);
        assert!(job.stats_summary.is_none());
        assert!(!job.is_terminal());
    }

    #[test]
    fn test_fail_records_stage() {
        let mut job = Job::new("SKU1");
        job.mark_processing();
        job.transition_to(Stage::Embed);
        job.fail("embedding service unavailable");

        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.failed_stage, Some(Stage::Embed));
        assert!(job.finished_at.is_some());
        assert!(job.is_terminal());
    }

    #[test]
    fn test_substeps_move_together() {
        let mut substeps = CleanSubsteps::default();
        substeps.set_all(SubstepStatus::InProgress);
        assert_eq!(substeps.whitespace, SubstepStatus::InProgress);
        substeps.set_all(SubstepStatus::Done);
        assert_eq!(substeps.html, SubstepStatus::Done);

        let json = serde_json::to_value(&substeps).unwrap();
        assert_eq!(json["emoji"], "done");
    }
}
