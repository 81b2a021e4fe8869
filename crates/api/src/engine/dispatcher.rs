//! Job admission and launch.
//!
//! Submitting validates the request, registers a `queued` record under a
//! fresh id and spawns one tracked task that runs the executor. The caller
//! gets the id back immediately; generation never runs on the request path.
//!
//! An id is free only if no record uses it and the artifact store holds no
//! file under it. The store outlives the process, so a fresh id may still
//! match an artifact written by an earlier run.

use std::sync::Arc;
use std::time::Duration;

use scenegen_core::error::CoreError;
use scenegen_core::job::{JobRecord, NewJob};
use scenegen_core::submission::GenerateRequest;
use scenegen_core::types::JobId;
use scenegen_events::{EventBus, JobEvent};
use scenegen_pipeline::ArtifactStore;
use tokio_util::task::TaskTracker;

use super::executor::JobExecutor;
use super::registry::JobRegistry;

/// How many fresh ids to try before giving up on a submission.
const MAX_ID_ATTEMPTS: usize = 8;

pub struct Dispatcher {
    registry: Arc<JobRegistry>,
    executor: Arc<JobExecutor>,
    store: ArtifactStore,
    event_bus: Arc<EventBus>,
    tracker: TaskTracker,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<JobRegistry>,
        executor: Arc<JobExecutor>,
        store: ArtifactStore,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            registry,
            executor,
            store,
            event_bus,
            tracker: TaskTracker::new(),
        }
    }

    /// Validate and enqueue a request, returning the new job's id.
    pub async fn submit(&self, request: &GenerateRequest) -> Result<JobId, CoreError> {
        let job = request.validate()?;
        let record = self.admit(job, JobId::generate).await?;
        let job_id = record.id().clone();

        tracing::info!(
            job_id = %job_id,
            mode = %record.mode(),
            use_sharp = record.options().use_sharp,
            return_mesh = record.options().return_mesh,
            "Job submitted",
        );
        self.event_bus.publish(JobEvent::from_record(&record));

        self.launch(job_id.clone());
        Ok(job_id)
    }

    /// Insert a queued record, minting another id on collision.
    async fn admit(
        &self,
        job: NewJob,
        mut mint: impl FnMut() -> JobId,
    ) -> Result<JobRecord, CoreError> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let record = JobRecord::new(mint(), job.clone());
            if self.store.has_artifact(record.id()).await {
                tracing::warn!(
                    job_id = %record.id(),
                    "Job id already names a stored artifact, minting another",
                );
                continue;
            }
            match self.registry.insert(record.clone()).await {
                Ok(()) => return Ok(record),
                Err(CoreError::Conflict(_)) => {
                    tracing::warn!(job_id = %record.id(), "Job id collision, minting another");
                }
                Err(e) => return Err(e),
            }
        }
        Err(CoreError::Internal(format!(
            "No free job id after {MAX_ID_ATTEMPTS} attempts"
        )))
    }

    fn launch(&self, job_id: JobId) {
        let executor = Arc::clone(&self.executor);
        self.tracker.spawn(async move {
            executor.run(job_id).await;
        });
    }

    /// Number of jobs whose task has not finished yet.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Wait up to `timeout` for every launched job to finish.
    ///
    /// Returns `false` if jobs were still running when the timeout expired.
    pub async fn drain(&self, timeout: Duration) -> bool {
        self.tracker.close();
        tokio::time::timeout(timeout, self.tracker.wait())
            .await
            .is_ok()
    }
}
