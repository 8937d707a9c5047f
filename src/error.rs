//! DocPilot Error Types
//!
//! Centralized error handling for the editing engine.

use thiserror::Error;

/// Central error type for DocPilot
#[derive(Error, Debug)]
pub enum EngineError {
    /// A command matched a rule but the argument it needs came out empty
    #[error("Missing argument: {0}")]
    ClassificationAmbiguous(String),

    #[error("Service unavailable: {0}")]
    ProviderUnavailable(String),

    /// Credential invalid or expired; the shell should re-authenticate
    #[error("Authentication required")]
    AuthRequired,

    #[error("No active selection")]
    NoActiveSelection,

    #[error("Mutation conflict: {0}")]
    MutationConflict(String),

    /// A newer request replaced this one before its result arrived
    #[error("Superseded by a newer request")]
    Superseded,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Lock poisoned: {0}")]
    Lock(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for DocPilot operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Helper to convert Mutex poison errors
impl<T> From<std::sync::PoisonError<T>> for EngineError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        EngineError::Lock(err.to_string())
    }
}

impl EngineError {
    /// True when the caller should trigger re-authentication
    pub fn is_auth(&self) -> bool {
        matches!(self, EngineError::AuthRequired)
    }
}
