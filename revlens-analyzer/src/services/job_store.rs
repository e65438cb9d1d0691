//! Job registry
//!
//! The orchestrator owns a working copy of each job and saves it here after
//! every transition. Readers only ever see whole saved snapshots; fields that
//! are still `None` simply have not been computed yet.

use crate::models::Job;
use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Keyed store of job records
#[async_trait::async_trait]
pub trait JobStore: Send + Sync {
    /// Insert or replace the record for `job.id`
    async fn save(&self, job: &Job) -> Result<()>;

    async fn get(&self, id: Uuid) -> Result<Option<Job>>;

    /// Number of tracked jobs
    async fn count(&self) -> Result<usize>;
}

/// Process-memory job store
#[derive(Debug, Clone, Default)]
pub struct InMemoryJobStore {
    jobs: Arc<RwLock<HashMap<Uuid, Job>>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl JobStore for InMemoryJobStore {
    async fn save(&self, job: &Job) -> Result<()> {
        self.jobs.write().await.insert(job.id, job.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Job>> {
        Ok(self.jobs.read().await.get(&id).cloned())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.jobs.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{JobStatus, Stage};

    #[tokio::test]
    async fn test_save_and_get_snapshot() {
        let store = InMemoryJobStore::new();
        let mut job = Job::new("SKU1");
        store.save(&job).await.unwrap();

        job.mark_processing();
        job.transition_to(Stage::Clean);

        // Unsaved changes are invisible to readers
        let stored = store.get(job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Pending);

        store.save(&job).await.unwrap();
        let stored = store.get(job.id).await.unwrap().unwrap();
        assert_eq!(stored.stage, Stage::Clean);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unknown_id() {
        let store = InMemoryJobStore::new();
        assert!(store.get(Uuid::new_v4()).await.unwrap().is_none());
    }
}
