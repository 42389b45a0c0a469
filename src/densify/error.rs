use thiserror::Error;

/// Why one densification attempt failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DensifyError {
    #[error("Densifier temporarily unavailable: {0}")]
    Transient(String),

    #[error("Densifier timed out: {0}")]
    Timeout(String),

    #[error("Densifier tool not found: {0}")]
    ToolNotFound(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model {model} is unavailable: {message}")]
    ModelUnavailable {
        model: String,
        message: String,
        suggestions: Vec<String>,
    },

    #[error("Densifier rejected the request: {0}")]
    Rejected(String),

    #[error("Input too long: about {estimated_tokens} tokens, limit is {limit}")]
    InputTooLong { estimated_tokens: usize, limit: usize },
}

impl DensifyError {
    /// Only transient and timeout failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DensifyError::Transient(_) | DensifyError::Timeout(_))
    }
}
