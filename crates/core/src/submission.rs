//! Validation of incoming generation requests.
//!
//! Turns the loosely-typed request fields into a [`NewJob`], or rejects the
//! request with [`CoreError::InvalidRequest`] before any job exists.

use serde::Deserialize;

use crate::error::CoreError;
use crate::job::{JobInput, JobMode, JobOptions, NewJob};

/// Mode assumed when the request omits one.
pub const DEFAULT_MODE: JobMode = JobMode::TextToScene;

/// Maximum prompt length in characters.
pub const MAX_PROMPT_LEN: usize = 2000;

/// Body of `POST /generate`.
///
/// Every field is optional on the wire; [`validate`](Self::validate) decides
/// what a usable request looks like.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateRequest {
    pub mode: Option<String>,
    pub prompt: Option<String>,
    pub image_path: Option<String>,
    #[serde(default)]
    pub use_sharp: bool,
    #[serde(default)]
    pub return_mesh: bool,
}

impl GenerateRequest {
    pub fn validate(&self) -> Result<NewJob, CoreError> {
        validate_submission(
            self.mode.as_deref(),
            self.prompt.as_deref(),
            self.image_path.as_deref(),
            JobOptions {
                use_sharp: self.use_sharp,
                return_mesh: self.return_mesh,
            },
        )
    }
}

/// Validate a submission.
///
/// - `mode` must be `"t2s"` or `"i2s"` (absent means `"t2s"`).
/// - Text-to-scene requires a non-blank `prompt` of at most
///   [`MAX_PROMPT_LEN`] characters.
/// - Image-to-scene requires a non-blank `image_path`.
///
/// Surrounding whitespace is trimmed from the chosen input.
pub fn validate_submission(
    mode: Option<&str>,
    prompt: Option<&str>,
    image_path: Option<&str>,
    options: JobOptions,
) -> Result<NewJob, CoreError> {
    let mode = match mode {
        None => DEFAULT_MODE,
        Some(raw) => JobMode::parse(raw).ok_or_else(|| {
            CoreError::InvalidRequest(format!(
                "Unsupported mode '{raw}'. Must be one of: t2s, i2s"
            ))
        })?,
    };

    let input = match mode {
        JobMode::TextToScene => {
            let prompt = required(prompt, "prompt", mode)?;
            if prompt.chars().count() > MAX_PROMPT_LEN {
                return Err(CoreError::InvalidRequest(format!(
                    "prompt exceeds {MAX_PROMPT_LEN} characters"
                )));
            }
            JobInput::Prompt(prompt)
        }
        JobMode::ImageToScene => JobInput::ImagePath(required(image_path, "image_path", mode)?),
    };

    Ok(NewJob {
        mode,
        input,
        options,
    })
}

fn required(value: Option<&str>, field: &str, mode: JobMode) -> Result<String, CoreError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(CoreError::InvalidRequest(format!(
            "{field} is required for mode '{mode}'"
        ))),
    }
}
