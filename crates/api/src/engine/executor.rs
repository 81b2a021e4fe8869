//! Runs one job from `queued` to a terminal state.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use scenegen_core::job::{
    JobRecord, JobStatus, MSG_GENERATING, MSG_INITIALIZING, MSG_SAVING,
};
use scenegen_core::naming::ArtifactFormat;
use scenegen_core::types::JobId;
use scenegen_events::{EventBus, JobEvent};
use scenegen_pipeline::{ArtifactStore, GenerationBackend, PipelineError};

use super::registry::JobRegistry;

/// Message recorded when the generation task panics.
pub const MSG_PANICKED: &str = "generation task panicked";

pub struct JobExecutor {
    registry: Arc<JobRegistry>,
    backend: Arc<dyn GenerationBackend>,
    store: ArtifactStore,
    event_bus: Arc<EventBus>,
}

impl JobExecutor {
    pub fn new(
        registry: Arc<JobRegistry>,
        backend: Arc<dyn GenerationBackend>,
        store: ArtifactStore,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            registry,
            backend,
            store,
            event_bus,
        }
    }

    /// Execute the job to completion or failure.
    ///
    /// Never returns an error: every failure, including a panic inside the
    /// backend, ends up as a `failed` record with the reason as its message.
    pub async fn run(&self, job_id: JobId) {
        let started = Instant::now();

        let record = match self
            .registry
            .update_status(&job_id, JobStatus::Running, MSG_INITIALIZING)
            .await
        {
            Ok(record) => record,
            Err(e) => {
                tracing::error!(job_id = %job_id, error = %e, "Cannot start job");
                return;
            }
        };
        self.event_bus.publish(JobEvent::from_record(&record));

        let outcome = AssertUnwindSafe(self.generate(&record))
            .catch_unwind()
            .await;

        let finished = match outcome {
            Ok(Ok(artifact)) => {
                tracing::info!(
                    job_id = %job_id,
                    artifact = %artifact,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Job completed",
                );
                self.registry.set_output_artifact(&job_id, artifact).await
            }
            Ok(Err(e)) => {
                tracing::warn!(
                    job_id = %job_id,
                    kind = e.kind(),
                    error = %e,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Job failed",
                );
                self.registry
                    .update_status(&job_id, JobStatus::Failed, e.to_string())
                    .await
            }
            Err(_) => {
                tracing::error!(
                    job_id = %job_id,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Generation task panicked",
                );
                self.registry
                    .update_status(&job_id, JobStatus::Failed, MSG_PANICKED)
                    .await
            }
        };

        match finished {
            Ok(record) => self.event_bus.publish(JobEvent::from_record(&record)),
            Err(e) => {
                tracing::error!(job_id = %job_id, error = %e, "Cannot record job outcome")
            }
        }
    }

    /// Initialize, generate and persist; returns the artifact name.
    async fn generate(&self, job: &JobRecord) -> Result<String, PipelineError> {
        let mut session = self.backend.initialize(job.mode()).await?;
        tracing::debug!(job_id = %job.id(), device = session.device(), "Backend ready");

        self.progress(job.id(), MSG_GENERATING).await;
        let options = job.options();
        let scene = session.generate(job.input(), &options).await?;

        self.progress(job.id(), MSG_SAVING).await;
        self.store
            .persist(job.id(), ArtifactFormat::for_options(&options), &*scene)
            .await
    }

    async fn progress(&self, job_id: &JobId, message: &str) {
        match self
            .registry
            .update_status(job_id, JobStatus::Running, message)
            .await
        {
            Ok(record) => self.event_bus.publish(JobEvent::from_record(&record)),
            Err(e) => tracing::warn!(job_id = %job_id, error = %e, "Progress update rejected"),
        }
    }
}
