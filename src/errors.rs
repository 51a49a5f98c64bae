use thiserror::Error;

/// Error taxonomy for the whole crate.
///
/// `Configuration` and `DimensionMismatch` are fatal and raised before any
/// work begins; they are never retried. `Extraction` is per-source and never
/// aborts an ingestion batch. `Provider` covers transient upstream failures,
/// while `InvalidCredentials` marks a model-initialization failure the caller
/// should not retry blindly. `Retrieval` aborts the current conversation turn
/// only.
#[derive(Debug, Error)]
pub enum ChatbotError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("extraction failed for {path}: {reason}")]
    Extraction { path: String, reason: String },
    #[error("provider error: {0}")]
    Provider(String),
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),
    #[error("retrieval failed: {0}")]
    Retrieval(String),
}

impl ChatbotError {
    pub fn provider<E: std::fmt::Display>(err: E) -> Self {
        ChatbotError::Provider(err.to_string())
    }

    pub fn configuration<E: std::fmt::Display>(err: E) -> Self {
        ChatbotError::Configuration(err.to_string())
    }

    /// Whether a retry of the same operation could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, ChatbotError::Provider(_))
    }
}
