//! Generation backend that runs an external generator program.
//!
//! The program is invoked once per job as
//!
//! ```text
//! <program> <args...> --mode <t2s|i2s> --device <cuda|cpu>
//!     --input=<prompt-or-image-path> --output <file>
//!     [--use-sharp] [--return-mesh]
//! ```
//!
//! and must write the scene to `--output` and exit with status 0. The input
//! is user text and may start with `-`, so it is always attached to its flag
//! with `=` rather than passed as a separate argument. On failure
//! the last non-empty line of its stderr becomes the error description.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use scenegen_core::job::{JobInput, JobMode, JobOptions};
use scenegen_core::naming::ArtifactFormat;
use tokio::process::Command;

use crate::backend::{GeneratedScene, GenerationBackend, GenerationSession};
use crate::device::{self, Device, DevicePreference};
use crate::error::PipelineError;

/// Settings for [`CommandBackend`].
#[derive(Debug, Clone)]
pub struct CommandConfig {
    /// Generator program; `None` means no generator is installed.
    pub program: Option<String>,
    /// Arguments placed before the protocol arguments.
    pub args: Vec<String>,
    pub device: DevicePreference,
    /// Directory for in-progress generator output.
    pub staging_dir: PathBuf,
}

pub struct CommandBackend {
    config: CommandConfig,
}

impl CommandBackend {
    pub fn new(config: CommandConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl GenerationBackend for CommandBackend {
    async fn initialize(
        &self,
        mode: JobMode,
    ) -> Result<Box<dyn GenerationSession>, PipelineError> {
        let configured = self.config.program.as_deref().ok_or_else(|| {
            PipelineError::Initialization(
                "No generator program configured (set GENERATOR_COMMAND)".into(),
            )
        })?;

        let program = find_program(configured).await.ok_or_else(|| {
            PipelineError::Initialization(format!("Generator program '{configured}' not found"))
        })?;

        tokio::fs::create_dir_all(&self.config.staging_dir)
            .await
            .map_err(|e| {
                PipelineError::Initialization(format!(
                    "Cannot create staging directory {}: {e}",
                    self.config.staging_dir.display()
                ))
            })?;

        let device = device::resolve(self.config.device).await;

        tracing::debug!(
            %mode,
            %device,
            program = %program.display(),
            "Generator session initialized",
        );

        Ok(Box::new(CommandSession {
            program,
            args: self.config.args.clone(),
            mode,
            device,
            staging_dir: self.config.staging_dir.clone(),
        }))
    }
}

struct CommandSession {
    program: PathBuf,
    args: Vec<String>,
    mode: JobMode,
    device: Device,
    staging_dir: PathBuf,
}

#[async_trait]
impl GenerationSession for CommandSession {
    fn device(&self) -> &str {
        self.device.as_str()
    }

    async fn generate(
        &mut self,
        input: &JobInput,
        options: &JobOptions,
    ) -> Result<Box<dyn GeneratedScene>, PipelineError> {
        let format = ArtifactFormat::for_options(options);
        let output = self.staging_dir.join(format!(
            "{}.{}",
            uuid::Uuid::new_v4().simple(),
            format.extension()
        ));

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg("--mode")
            .arg(self.mode.as_str())
            .arg("--device")
            .arg(self.device.as_str())
            .arg(format!("--input={}", input.as_str()))
            .arg("--output")
            .arg(&output);
        if options.use_sharp {
            cmd.arg("--use-sharp");
        }
        if options.return_mesh {
            cmd.arg("--return-mesh");
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let out = cmd
            .output()
            .await
            .map_err(|e| PipelineError::Generation(format!("Failed to launch generator: {e}")))?;

        if !out.stdout.is_empty() {
            tracing::debug!(
                output = %String::from_utf8_lossy(&out.stdout).trim_end(),
                "Generator stdout",
            );
        }

        // Wrap first so the staged file is cleaned up on every error path.
        let scene = StagedScene { path: output };

        if !out.status.success() {
            let message = last_line(&out.stderr)
                .unwrap_or_else(|| format!("Generator exited with {}", out.status));
            return Err(PipelineError::Generation(message));
        }

        if !is_file(&scene.path).await {
            return Err(PipelineError::Generation(format!(
                "Generator finished without writing {}",
                scene.path.display()
            )));
        }

        Ok(Box::new(scene))
    }
}

/// Generator output waiting in the staging directory.
struct StagedScene {
    path: PathBuf,
}

#[async_trait]
impl GeneratedScene for StagedScene {
    async fn save(&self, path: &Path) -> Result<(), PipelineError> {
        if tokio::fs::rename(&self.path, path).await.is_ok() {
            return Ok(());
        }

        // Staging and store may live on different filesystems.
        tokio::fs::copy(&self.path, path)
            .await
            .map_err(|e| PipelineError::Persistence(format!("Failed to save artifact: {e}")))?;
        let _ = tokio::fs::remove_file(&self.path).await;
        Ok(())
    }
}

impl Drop for StagedScene {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Resolve a program name the way a shell would: explicit paths must exist,
/// bare names are looked up on `PATH`.
async fn find_program(program: &str) -> Option<PathBuf> {
    let path = Path::new(program);
    if path.is_absolute() || path.components().count() > 1 {
        return is_file(path).await.then(|| path.to_path_buf());
    }

    let paths = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&paths) {
        let candidate = dir.join(program);
        if is_file(&candidate).await {
            return Some(candidate);
        }
    }
    None
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

fn last_line(bytes: &[u8]) -> Option<String> {
    String::from_utf8_lossy(bytes)
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .last()
        .map(str::to_string)
}
