//! Stage checkpoint sinks
//!
//! After each completed stage the orchestrator hands the stage output to a
//! sink for audit and debugging. Checkpoints are never read back to resume a
//! job.

use crate::models::Stage;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// One recorded stage output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub job_id: Uuid,
    pub stage: Stage,
    pub payload: serde_json::Value,
}

#[async_trait::async_trait]
pub trait CheckpointSink: Send + Sync {
    async fn record(&self, checkpoint: Checkpoint) -> Result<()>;
}

/// Discards every checkpoint
#[derive(Debug, Clone, Default)]
pub struct NoopCheckpointSink;

#[async_trait::async_trait]
impl CheckpointSink for NoopCheckpointSink {
    async fn record(&self, _checkpoint: Checkpoint) -> Result<()> {
        Ok(())
    }
}

/// Keeps checkpoints in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryCheckpointSink {
    entries: Arc<Mutex<Vec<Checkpoint>>>,
}

impl MemoryCheckpointSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entries(&self) -> Vec<Checkpoint> {
        self.entries.lock().await.clone()
    }

    /// Stages recorded for one job, in recording order
    pub async fn stages_for(&self, job_id: Uuid) -> Vec<Stage> {
        self.entries
            .lock()
            .await
            .iter()
            .filter(|c| c.job_id == job_id)
            .map(|c| c.stage)
            .collect()
    }
}

#[async_trait::async_trait]
impl CheckpointSink for MemoryCheckpointSink {
    async fn record(&self, checkpoint: Checkpoint) -> Result<()> {
        self.entries.lock().await.push(checkpoint);
        Ok(())
    }
}

/// Writes `<dir>/<job_id>/<seq>_<stage>.json`
#[derive(Debug, Clone)]
pub struct JsonFileCheckpointSink {
    dir: PathBuf,
}

impl JsonFileCheckpointSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, job_id: Uuid, stage: Stage) -> PathBuf {
        self.dir
            .join(job_id.to_string())
            .join(format!("{:02}_{}.json", stage.sequence_index(), stage.name()))
    }
}

#[async_trait::async_trait]
impl CheckpointSink for JsonFileCheckpointSink {
    async fn record(&self, checkpoint: Checkpoint) -> Result<()> {
        let path = self.path_for(checkpoint.job_id, checkpoint.stage);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let content = serde_json::to_vec_pretty(&checkpoint.payload)?;
        tokio::fs::write(&path, content)
            .await
            .with_context(|| format!("Failed to write checkpoint {}", path.display()))?;

        tracing::debug!(
            job_id = %checkpoint.job_id,
            stage = %checkpoint.stage,
            path = %path.display(),
            "Checkpoint written"
        );
        Ok(())
    }
}
