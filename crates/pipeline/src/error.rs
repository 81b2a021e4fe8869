/// Errors raised by the generation pipeline and the artifact store.
///
/// The first three variants display their description verbatim so the
/// executor can surface it as the job's message unchanged.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The backend could not be prepared (missing program, no device).
    #[error("{0}")]
    Initialization(String),

    /// The generation workflow itself failed.
    #[error("{0}")]
    Generation(String),

    /// A result was produced but could not be written to the store.
    #[error("{0}")]
    Persistence(String),

    /// No artifact with this name exists in the store.
    #[error("Artifact not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Short machine-readable failure class, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Initialization(_) => "backend_initialization",
            Self::Generation(_) => "generation",
            Self::Persistence(_) => "persistence",
            Self::NotFound(_) => "not_found",
            Self::Io(_) => "io",
        }
    }
}
