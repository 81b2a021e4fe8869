//! Artifact naming convention.
//!
//! Convention: `{job_id}.{ext}` where `ext` is `ply` for point clouds and
//! `glb` for mesh output. Only names that parse back into a valid job id and
//! a known extension are ever served, which keeps artifact lookups confined
//! to the store root.

use crate::job::JobOptions;
use crate::types::JobId;

/// Output file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactFormat {
    Ply,
    Glb,
}

/// Suffix of files still being written into the store.
pub const PARTIAL_SUFFIX: &str = ".partial";

impl ArtifactFormat {
    /// Every format an artifact can be stored in.
    pub const ALL: [ArtifactFormat; 2] = [Self::Ply, Self::Glb];

    /// Format implied by a job's options.
    pub fn for_options(options: &JobOptions) -> Self {
        if options.return_mesh {
            Self::Glb
        } else {
            Self::Ply
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Ply => "ply",
            Self::Glb => "glb",
        }
    }

    /// MIME type used when serving the artifact.
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Ply => "application/octet-stream",
            Self::Glb => "model/gltf-binary",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "ply" => Some(Self::Ply),
            "glb" => Some(Self::Glb),
            _ => None,
        }
    }
}

/// Build the artifact filename for a job.
///
/// ```
/// use scenegen_core::naming::{artifact_filename, ArtifactFormat};
/// use scenegen_core::types::JobId;
///
/// let id = JobId::parse("ab12cd34").unwrap();
/// assert_eq!(artifact_filename(&id, ArtifactFormat::Ply), "ab12cd34.ply");
/// assert_eq!(artifact_filename(&id, ArtifactFormat::Glb), "ab12cd34.glb");
/// ```
pub fn artifact_filename(job_id: &JobId, format: ArtifactFormat) -> String {
    format!("{job_id}.{}", format.extension())
}

/// Parse a client-supplied artifact name back into its parts.
///
/// Returns `None` for anything that does not follow the convention exactly,
/// including path separators, parent references and hidden files.
pub fn parse_artifact_filename(name: &str) -> Option<(JobId, ArtifactFormat)> {
    let (stem, ext) = name.split_once('.')?;
    let format = ArtifactFormat::from_extension(ext)?;
    let job_id = JobId::parse(stem)?;
    Some((job_id, format))
}

/// Hidden staging name for an artifact that is still being written.
pub fn partial_filename(name: &str) -> String {
    format!(".{name}{PARTIAL_SUFFIX}")
}
