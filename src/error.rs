use thiserror::Error;

use crate::densify::DensifyError;

/// Preconditions that make a capture impossible.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("No frontmost application to capture")]
    NoFrontmostApplication,

    #[error("Refusing to capture this app's own window ({app_name})")]
    CaptureTargetIsSelf { app_name: String },

    #[error("Capture failed: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Journal operations that can fail on lookup or validation.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Context not found: {0}")]
    ContextNotFound(String),

    #[error("Snapshot not found: {0}")]
    SnapshotNotFound(String),

    #[error("Trashed snapshot not found: {0}")]
    TrashedSnapshotNotFound(String),

    #[error("Trashed context not found: {0}")]
    TrashedContextNotFound(String),

    #[error("There is no capture to undo in the current context")]
    NoCaptureToUndo,

    #[error("There is no capture to promote in the current context")]
    NoCaptureToPromote,

    #[error("Title cannot be empty")]
    EmptyTitle,

    #[error("Shortcut binding cannot be empty")]
    EmptyShortcut,

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Failures of the capture and retry workflows.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("No densification provider is configured")]
    ProviderNotConfigured,

    #[error("No API key is configured for {provider}")]
    KeyNotConfigured { provider: String },

    #[error("Snapshot not found: {0}")]
    SnapshotNotFound(String),

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Densify(#[from] DensifyError),

    #[error(transparent)]
    Session(SessionError),

    #[error("Workflow failed: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<SessionError> for WorkflowError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::SnapshotNotFound(id) => WorkflowError::SnapshotNotFound(id),
            other => WorkflowError::Session(other),
        }
    }
}

pub type SessionResult<T> = std::result::Result<T, SessionError>;
pub type WorkflowResult<T> = std::result::Result<T, WorkflowError>;
