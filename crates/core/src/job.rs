//! Job record and lifecycle state machine.
//!
//! A [`JobRecord`] is created in [`JobStatus::Queued`] and advances through
//! `running` to exactly one terminal state. The mutating methods refuse any
//! transition outside that path, so a record can never be observed as
//! `completed` without an output artifact or `failed` with one.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{JobId, Timestamp};

// ---------------------------------------------------------------------------
// Progress messages
// ---------------------------------------------------------------------------

pub const MSG_QUEUED: &str = "Job queued";
pub const MSG_INITIALIZING: &str = "initializing";
pub const MSG_GENERATING: &str = "generating scene";
pub const MSG_SAVING: &str = "saving artifact";
pub const MSG_COMPLETE: &str = "generation complete";

// ---------------------------------------------------------------------------
// Mode
// ---------------------------------------------------------------------------

/// Generation variant. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobMode {
    #[serde(rename = "t2s")]
    TextToScene,
    #[serde(rename = "i2s")]
    ImageToScene,
}

impl JobMode {
    /// Wire identifier (`"t2s"` / `"i2s"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TextToScene => "t2s",
            Self::ImageToScene => "i2s",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "t2s" => Some(Self::TextToScene),
            "i2s" => Some(Self::ImageToScene),
            _ => None,
        }
    }

    pub fn all() -> [JobMode; 2] {
        [Self::TextToScene, Self::ImageToScene]
    }
}

impl std::fmt::Display for JobMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Input & options
// ---------------------------------------------------------------------------

/// The job's subject: prompt text for text-to-scene, an image reference for
/// image-to-scene. Serialized as the bare string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum JobInput {
    Prompt(String),
    ImagePath(String),
}

impl JobInput {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Prompt(s) | Self::ImagePath(s) => s,
        }
    }
}

/// Optional generation behaviours.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobOptions {
    /// High-detail refinement pass.
    #[serde(default)]
    pub use_sharp: bool,
    /// Produce a mesh (`.glb`) instead of a point cloud (`.ply`).
    #[serde(default)]
    pub return_mesh: bool,
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Allowed edges: `queued -> running`, `running -> running` (progress
    /// message update), `running -> completed | failed`.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (Self::Queued, Self::Running)
                | (Self::Running, Self::Running)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Failed)
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// A validated submission, ready to become a [`JobRecord`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewJob {
    pub mode: JobMode,
    pub input: JobInput,
    pub options: JobOptions,
}

/// One generation request and its lifecycle state.
///
/// Serializes to the wire shape clients poll:
/// `{id, mode, prompt, options, status, message, created, output_file}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobRecord {
    id: JobId,
    mode: JobMode,
    #[serde(rename = "prompt")]
    input: JobInput,
    options: JobOptions,
    status: JobStatus,
    message: String,
    #[serde(rename = "created")]
    created_at: Timestamp,
    #[serde(rename = "output_file")]
    output_artifact: Option<String>,
}

impl JobRecord {
    /// Create a queued record stamped with the current time.
    pub fn new(id: JobId, job: NewJob) -> Self {
        Self {
            id,
            mode: job.mode,
            input: job.input,
            options: job.options,
            status: JobStatus::Queued,
            message: MSG_QUEUED.to_string(),
            created_at: chrono::Utc::now(),
            output_artifact: None,
        }
    }

    pub fn id(&self) -> &JobId {
        &self.id
    }

    pub fn mode(&self) -> JobMode {
        self.mode
    }

    pub fn input(&self) -> &JobInput {
        &self.input
    }

    pub fn options(&self) -> JobOptions {
        self.options
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn output_artifact(&self) -> Option<&str> {
        self.output_artifact.as_deref()
    }

    /// Move to `next` (anything but `completed`) and replace the message.
    ///
    /// Completion carries an artifact and goes through
    /// [`complete`](Self::complete) instead.
    pub fn transition(
        &mut self,
        next: JobStatus,
        message: impl Into<String>,
    ) -> Result<(), CoreError> {
        if next == JobStatus::Completed {
            return Err(CoreError::Conflict(format!(
                "Job {} cannot complete without an output artifact",
                self.id
            )));
        }
        self.check_transition(next)?;

        self.status = next;
        self.message = message.into();
        Ok(())
    }

    /// Mark the job completed with its artifact, in one step.
    pub fn complete(&mut self, artifact: impl Into<String>) -> Result<(), CoreError> {
        let artifact = artifact.into();
        if artifact.is_empty() {
            return Err(CoreError::InvalidRequest(
                "Output artifact name must not be empty".into(),
            ));
        }
        self.check_transition(JobStatus::Completed)?;

        self.status = JobStatus::Completed;
        self.message = MSG_COMPLETE.to_string();
        self.output_artifact = Some(artifact);
        Ok(())
    }

    fn check_transition(&self, next: JobStatus) -> Result<(), CoreError> {
        if self.status.can_transition_to(next) {
            Ok(())
        } else {
            Err(CoreError::Conflict(format!(
                "Job {} cannot move from {} to {}",
                self.id, self.status, next
            )))
        }
    }
}
