//! The generation backend seam.
//!
//! A job executor drives a backend in three steps, each of which may fail
//! independently:
//!
//! 1. [`GenerationBackend::initialize`] prepares a session for a mode and
//!    picks the compute device.
//! 2. [`GenerationSession::generate`] runs the (long) generation workflow.
//! 3. [`GeneratedScene::save`] writes the result to a path chosen by the
//!    artifact store.

use std::path::Path;

use async_trait::async_trait;
use scenegen_core::job::{JobInput, JobMode, JobOptions};

use crate::error::PipelineError;

#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Prepare a session for `mode`. Errors map to
    /// [`PipelineError::Initialization`].
    async fn initialize(&self, mode: JobMode)
        -> Result<Box<dyn GenerationSession>, PipelineError>;
}

#[async_trait]
pub trait GenerationSession: Send {
    /// Human-readable name of the device this session runs on.
    fn device(&self) -> &str;

    /// Run generation. May take minutes; must only suspend, never block the
    /// runtime thread.
    async fn generate(
        &mut self,
        input: &JobInput,
        options: &JobOptions,
    ) -> Result<Box<dyn GeneratedScene>, PipelineError>;
}

#[async_trait]
pub trait GeneratedScene: Send + Sync {
    /// Write the scene to `path`.
    async fn save(&self, path: &Path) -> Result<(), PipelineError>;
}
