//! Compute device selection.

use std::time::Duration;

use tokio::process::Command;
use tokio::sync::OnceCell;

/// Device a generation session runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Cuda,
    Cpu,
}

impl Device {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cuda => "cuda",
            Self::Cpu => "cpu",
        }
    }
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configured device choice (`GENERATION_DEVICE`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DevicePreference {
    /// Use CUDA when a GPU is visible, otherwise CPU.
    #[default]
    Auto,
    Cuda,
    Cpu,
}

impl DevicePreference {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "cuda" | "gpu" => Some(Self::Cuda),
            "cpu" => Some(Self::Cpu),
            _ => None,
        }
    }
}

/// Upper bound on the `nvidia-smi` call; a wedged driver means CPU.
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Result of the GPU probe; computed at most once per process.
static PROBED: OnceCell<Device> = OnceCell::const_new();

/// Resolve a preference to a concrete device.
pub async fn resolve(preference: DevicePreference) -> Device {
    match preference {
        DevicePreference::Cuda => Device::Cuda,
        DevicePreference::Cpu => Device::Cpu,
        DevicePreference::Auto => *PROBED.get_or_init(probe_cuda).await,
    }
}

/// Ask `nvidia-smi` for visible GPUs.
async fn probe_cuda() -> Device {
    let detected = probe_with(
        Command::new("nvidia-smi").arg("-L").kill_on_drop(true),
        PROBE_TIMEOUT,
    )
    .await;

    if detected {
        tracing::info!("CUDA device detected");
        Device::Cuda
    } else {
        tracing::info!("No CUDA device detected, falling back to CPU");
        Device::Cpu
    }
}

/// Run a GPU listing command; `true` if it succeeds in time and lists a GPU.
async fn probe_with(cmd: &mut Command, timeout: Duration) -> bool {
    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(out)) => {
            out.status.success() && String::from_utf8_lossy(&out.stdout).contains("GPU")
        }
        Ok(Err(e)) => {
            tracing::debug!(error = %e, "GPU probe could not run");
            false
        }
        Err(_) => {
            tracing::warn!(timeout_secs = timeout.as_secs(), "GPU probe timed out");
            false
        }
    }
}
