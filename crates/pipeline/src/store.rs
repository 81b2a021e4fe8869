//! Filesystem artifact store.
//!
//! Finished scenes live flat in one directory, named `{job_id}.{ext}`.
//! Writes go to a hidden `.{name}.partial` file first and are renamed into
//! place only once complete, so a reader never sees a half-written artifact
//! and a job that is still running has nothing to fetch.

use std::path::{Path, PathBuf};

use scenegen_core::naming::{
    artifact_filename, parse_artifact_filename, partial_filename, ArtifactFormat,
};
use scenegen_core::types::{JobId, Timestamp};
use serde::Serialize;

use crate::backend::GeneratedScene;
use crate::error::PipelineError;

/// Listing entry for `GET /outputs`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactInfo {
    pub name: String,
    pub size: u64,
    pub modified: Timestamp,
}

/// An opened artifact, ready to stream.
#[derive(Debug)]
pub struct ArtifactFile {
    pub name: String,
    pub format: ArtifactFormat,
    pub size: u64,
    pub file: tokio::fs::File,
}

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the store directory if needed.
    pub async fn ensure_root(&self) -> Result<(), PipelineError> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    /// Whether any artifact, in either format, already exists for `job_id`.
    pub async fn has_artifact(&self, job_id: &JobId) -> bool {
        for format in ArtifactFormat::ALL {
            let path = self.root.join(artifact_filename(job_id, format));
            if tokio::fs::symlink_metadata(&path).await.is_ok() {
                return true;
            }
        }
        false
    }

    /// Save `scene` as the artifact for `job_id` and return its name.
    ///
    /// Any failure is reported as [`PipelineError::Persistence`] and leaves
    /// no file behind under the final name.
    pub async fn persist(
        &self,
        job_id: &JobId,
        format: ArtifactFormat,
        scene: &dyn GeneratedScene,
    ) -> Result<String, PipelineError> {
        let name = artifact_filename(job_id, format);
        let partial = self.root.join(partial_filename(&name));
        let target = self.root.join(&name);

        tokio::fs::create_dir_all(&self.root).await.map_err(|e| {
            PipelineError::Persistence(format!(
                "Cannot create output directory {}: {e}",
                self.root.display()
            ))
        })?;

        if let Err(e) = scene.save(&partial).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(PipelineError::Persistence(e.to_string()));
        }

        if let Err(e) = tokio::fs::rename(&partial, &target).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(PipelineError::Persistence(format!(
                "Failed to finalize artifact {name}: {e}"
            )));
        }

        tracing::debug!(job_id = %job_id, artifact = %name, "Artifact persisted");
        Ok(name)
    }

    /// Open an artifact by its client-supplied name.
    ///
    /// Names outside the `{job_id}.{ply|glb}` convention are treated as
    /// missing, never resolved against the filesystem.
    pub async fn open(&self, name: &str) -> Result<ArtifactFile, PipelineError> {
        let (_, format) =
            parse_artifact_filename(name).ok_or_else(|| PipelineError::NotFound(name.into()))?;
        let path = self.root.join(name);

        let file = match tokio::fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PipelineError::NotFound(name.into()))
            }
            Err(e) => return Err(e.into()),
        };

        let meta = file.metadata().await?;
        if !meta.is_file() {
            return Err(PipelineError::NotFound(name.into()));
        }

        Ok(ArtifactFile {
            name: name.to_string(),
            format,
            size: meta.len(),
            file,
        })
    }

    /// List stored artifacts, sorted by name.
    ///
    /// Only names [`open`](Self::open) would accept are listed.
    ///
    /// A store directory that does not exist yet is simply empty.
    pub async fn list(&self) -> Result<Vec<ArtifactInfo>, PipelineError> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut artifacts = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if parse_artifact_filename(&name).is_none() {
                continue;
            }

            let meta = entry.metadata().await?;
            if !meta.is_file() {
                continue;
            }
            let modified = meta
                .modified()
                .map(Timestamp::from)
                .unwrap_or_else(|_| chrono::Utc::now());

            artifacts.push(ArtifactInfo {
                name,
                size: meta.len(),
                modified,
            });
        }

        artifacts.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(artifacts)
    }
}
