/// Result type for pipeline operations
pub type InferenceResult<T> = Result<T, InferenceError>;

/// Failures inside the classification pipeline. None of these reach the
/// caller as a transport error; the orchestrator maps each kind onto a
/// response payload or a fallback prediction.
#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Model load failed: {0}")]
    Load(String),

    #[error("Model is not loaded")]
    ModelNotReady,

    #[error("Preprocessing failed: {0}")]
    Preprocess(String),

    #[error("Scoring failed: {0}")]
    Scoring(String),

    #[error("{0}")]
    Unexpected(String),
}

impl From<image::ImageError> for InferenceError {
    fn from(e: image::ImageError) -> Self {
        InferenceError::Preprocess(e.to_string())
    }
}
