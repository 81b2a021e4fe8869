//! Generation pipeline: the backend seam the job executor drives, the
//! external-command backend used in production, and the filesystem
//! artifact store that holds finished scenes.

pub mod backend;
pub mod command;
pub mod device;
pub mod error;
pub mod store;

pub use backend::{GeneratedScene, GenerationBackend, GenerationSession};
pub use command::{CommandBackend, CommandConfig};
pub use device::{Device, DevicePreference};
pub use error::PipelineError;
pub use store::{ArtifactFile, ArtifactInfo, ArtifactStore};
