use std::path::PathBuf;
use std::str::FromStr;

use scenegen_pipeline::{CommandConfig, DevicePreference};

/// Configuration errors reported at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} must be a valid {expected}, got '{value}'")]
    Invalid {
        key: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `5000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`). Does not bound jobs.
    pub request_timeout_secs: u64,
    /// How long shutdown waits for in-flight jobs (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Artifact store root (default: `output`).
    pub output_dir: PathBuf,
    /// Directory holding the presentation page (default: `static`).
    pub static_dir: PathBuf,
    /// External generator settings.
    pub generator: CommandConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                  |
    /// |-------------------------|--------------------------|
    /// | `HOST`                  | `0.0.0.0`                |
    /// | `PORT`                  | `5000`                   |
    /// | `CORS_ORIGINS`          | `http://localhost:5000`  |
    /// | `REQUEST_TIMEOUT_SECS`  | `30`                     |
    /// | `SHUTDOWN_TIMEOUT_SECS` | `30`                     |
    /// | `OUTPUT_DIR`            | `output`                 |
    /// | `STATIC_DIR`            | `static`                 |
    /// | `GENERATOR_COMMAND`     | unset                    |
    /// | `GENERATOR_ARGS`        | empty                    |
    /// | `GENERATION_DEVICE`     | `auto`                   |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let host = var("HOST", "0.0.0.0");
        let port = parse(&lookup, "PORT", 5000u16, "u16")?;

        let cors_origins: Vec<String> = var("CORS_ORIGINS", "http://localhost:5000")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs = parse(&lookup, "REQUEST_TIMEOUT_SECS", 30u64, "u64")?;
        let shutdown_timeout_secs = parse(&lookup, "SHUTDOWN_TIMEOUT_SECS", 30u64, "u64")?;

        let output_dir = PathBuf::from(var("OUTPUT_DIR", "output"));
        let static_dir = PathBuf::from(var("STATIC_DIR", "static"));

        let device_raw = var("GENERATION_DEVICE", "auto");
        let device = DevicePreference::parse(&device_raw).ok_or(ConfigError::Invalid {
            key: "GENERATION_DEVICE",
            expected: "device (auto, cuda, cpu)",
            value: device_raw.clone(),
        })?;

        let generator = CommandConfig {
            program: lookup("GENERATOR_COMMAND").filter(|s| !s.trim().is_empty()),
            args: var("GENERATOR_ARGS", "")
                .split_whitespace()
                .map(str::to_string)
                .collect(),
            device,
            staging_dir: output_dir.join(".staging"),
        };

        Ok(Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            output_dir,
            static_dir,
            generator,
        })
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
    expected: &'static str,
) -> Result<T, ConfigError> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            key,
            expected,
            value: raw,
        }),
    }
}
