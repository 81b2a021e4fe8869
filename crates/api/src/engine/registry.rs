//! In-memory job registry.
//!
//! Two lock levels: the map lock is held only long enough to look up or
//! insert a slot, and every record sits behind its own lock. Executors
//! updating different jobs therefore never wait on each other, and each
//! mutation (including completion, which sets status, message and artifact
//! together) is applied under a single write lock, so readers only ever see
//! whole records.
//!
//! Records are never removed; the registry lives as long as the process.

use std::collections::HashMap;
use std::sync::Arc;

use scenegen_core::error::CoreError;
use scenegen_core::job::{JobRecord, JobStatus};
use scenegen_core::types::JobId;
use serde::Serialize;
use tokio::sync::RwLock;

type Slot = Arc<RwLock<JobRecord>>;

/// Per-status job counts, reported by `GET /health`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub total: usize,
    pub queued: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
}

#[derive(Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<JobId, Slot>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a new record. Fails with `Conflict` if the id is already taken.
    pub async fn insert(&self, record: JobRecord) -> Result<(), CoreError> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(record.id()) {
            return Err(CoreError::Conflict(format!(
                "Job id {} is already in use",
                record.id()
            )));
        }
        jobs.insert(record.id().clone(), Arc::new(RwLock::new(record)));
        Ok(())
    }

    /// Snapshot of one record.
    pub async fn get(&self, id: &JobId) -> Result<JobRecord, CoreError> {
        let slot = self.slot(id).await?;
        let record = slot.read().await.clone();
        Ok(record)
    }

    /// Snapshot of every record, oldest first.
    pub async fn list_all(&self) -> Vec<JobRecord> {
        let slots: Vec<Slot> = self.jobs.read().await.values().cloned().collect();

        let mut records = Vec::with_capacity(slots.len());
        for slot in slots {
            records.push(slot.read().await.clone());
        }
        records.sort_by(|a, b| {
            a.created_at()
                .cmp(&b.created_at())
                .then_with(|| a.id().cmp(b.id()))
        });
        records
    }

    /// Apply a non-completing transition and return the updated snapshot.
    pub async fn update_status(
        &self,
        id: &JobId,
        status: JobStatus,
        message: impl Into<String>,
    ) -> Result<JobRecord, CoreError> {
        let slot = self.slot(id).await?;
        let mut record = slot.write().await;
        record.transition(status, message)?;
        Ok(record.clone())
    }

    /// Attach the output artifact, completing the job in the same step.
    pub async fn set_output_artifact(
        &self,
        id: &JobId,
        artifact: impl Into<String>,
    ) -> Result<JobRecord, CoreError> {
        let slot = self.slot(id).await?;
        let mut record = slot.write().await;
        record.complete(artifact)?;
        Ok(record.clone())
    }

    pub async fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for record in self.list_all().await {
            counts.total += 1;
            match record.status() {
                JobStatus::Queued => counts.queued += 1,
                JobStatus::Running => counts.running += 1,
                JobStatus::Completed => counts.completed += 1,
                JobStatus::Failed => counts.failed += 1,
            }
        }
        counts
    }

    async fn slot(&self, id: &JobId) -> Result<Slot, CoreError> {
        self.jobs
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound {
                entity: "Job",
                id: id.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use assert_matches::assert_matches;
    use scenegen_core::job::{
        JobInput, JobMode, JobOptions, NewJob, MSG_COMPLETE, MSG_GENERATING, MSG_INITIALIZING,
    };

    use super::*;

    fn record(id: &str) -> JobRecord {
        JobRecord::new(
            JobId::parse(id).unwrap(),
            NewJob {
                mode: JobMode::TextToScene,
                input: JobInput::Prompt(format!("scene {id}")),
                options: JobOptions::default(),
            },
        )
    }

    fn id(raw: &str) -> JobId {
        JobId::parse(raw).unwrap()
    }

    #[tokio::test]
    async fn insert_then_get() {
        let registry = JobRegistry::new();
        registry.insert(record("aaaa0001")).await.unwrap();

        let job = registry.get(&id("aaaa0001")).await.unwrap();
        assert_eq!(job.status(), JobStatus::Queued);
        assert_eq!(job.input().as_str(), "scene aaaa0001");
    }

    #[tokio::test]
    async fn duplicate_insert_is_a_conflict() {
        let registry = JobRegistry::new();
        registry.insert(record("aaaa0001")).await.unwrap();

        assert_matches!(
            registry.insert(record("aaaa0001")).await,
            Err(CoreError::Conflict(_))
        );
        assert_eq!(registry.list_all().await.len(), 1);
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let registry = JobRegistry::new();
        assert_matches!(
            registry.get(&id("deadbeef")).await,
            Err(CoreError::NotFound { entity: "Job", .. })
        );
        assert_matches!(
            registry
                .update_status(&id("deadbeef"), JobStatus::Running, MSG_INITIALIZING)
                .await,
            Err(CoreError::NotFound { .. })
        );
    }

    #[tokio::test]
    async fn completion_is_applied_atomically() {
        let registry = JobRegistry::new();
        registry.insert(record("aaaa0001")).await.unwrap();
        let job_id = id("aaaa0001");

        registry
            .update_status(&job_id, JobStatus::Running, MSG_INITIALIZING)
            .await
            .unwrap();
        let done = registry
            .set_output_artifact(&job_id, "aaaa0001.ply")
            .await
            .unwrap();

        assert_eq!(done.status(), JobStatus::Completed);
        assert_eq!(done.message(), MSG_COMPLETE);
        assert_eq!(done.output_artifact(), Some("aaaa0001.ply"));
        assert_eq!(registry.get(&job_id).await.unwrap(), done);
    }

    #[tokio::test]
    async fn rejected_transition_leaves_record_untouched() {
        let registry = JobRegistry::new();
        registry.insert(record("aaaa0001")).await.unwrap();
        let job_id = id("aaaa0001");

        assert_matches!(
            registry.set_output_artifact(&job_id, "aaaa0001.ply").await,
            Err(CoreError::Conflict(_))
        );
        let job = registry.get(&job_id).await.unwrap();
        assert_eq!(job.status(), JobStatus::Queued);
        assert!(job.output_artifact().is_none());
    }

    #[tokio::test]
    async fn list_is_oldest_first() {
        let registry = JobRegistry::new();
        registry.insert(record("00000002")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(2)).await;
        registry.insert(record("00000001")).await.unwrap();

        let ids: Vec<String> = registry
            .list_all()
            .await
            .iter()
            .map(|r| r.id().to_string())
            .collect();
        assert_eq!(ids, ["00000002", "00000001"]);
    }

    #[tokio::test]
    async fn held_record_lock_does_not_block_other_jobs() {
        let registry = Arc::new(JobRegistry::new());
        registry.insert(record("aaaa0001")).await.unwrap();
        registry.insert(record("bbbb0002")).await.unwrap();

        // Hold job A's record lock while job B is updated.
        let slot_a = registry.slot(&id("aaaa0001")).await.unwrap();
        let _guard = slot_a.write().await;

        let updated = tokio::time::timeout(
            Duration::from_secs(1),
            registry.update_status(&id("bbbb0002"), JobStatus::Running, MSG_GENERATING),
        )
        .await
        .expect("update of an unrelated job must not wait")
        .unwrap();
        assert_eq!(updated.status(), JobStatus::Running);
    }

    #[tokio::test]
    async fn counts_by_status() {
        let registry = JobRegistry::new();
        for raw in ["00000001", "00000002", "00000003"] {
            registry.insert(record(raw)).await.unwrap();
        }
        registry
            .update_status(&id("00000002"), JobStatus::Running, MSG_INITIALIZING)
            .await
            .unwrap();
        registry
            .update_status(&id("00000003"), JobStatus::Running, MSG_INITIALIZING)
            .await
            .unwrap();
        registry
            .update_status(&id("00000003"), JobStatus::Failed, "boom")
            .await
            .unwrap();

        let counts = registry.counts().await;
        assert_eq!(
            counts,
            StatusCounts {
                total: 3,
                queued: 1,
                running: 1,
                completed: 0,
                failed: 1,
            }
        );
    }
}
