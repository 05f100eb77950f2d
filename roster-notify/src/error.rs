//! Error types for roster-notify.

use thiserror::Error;

/// All errors that can arise while rendering notification emails.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Tera template engine error.
    #[error("template engine error: {0}")]
    Tera(#[from] tera::Error),

    /// JSON serialization error (building tera context).
    #[error("context serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
