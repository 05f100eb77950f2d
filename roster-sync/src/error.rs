//! Error types for roster-sync.

use thiserror::Error;

use roster_core::ConfigError;

use crate::pipeline::RunReport;

/// Failure reported by an external collaborator (directory, spreadsheet,
/// email, payment or secret API).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The resource already exists (HTTP 409). Adds treat this as success.
    #[error("resource already exists")]
    Conflict,

    /// HTTP 404.
    #[error("not found: {0}")]
    NotFound(String),

    /// Any other non-success HTTP status.
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// Connection, DNS, TLS or timeout failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The response body did not have the expected shape.
    #[error("unexpected response: {0}")]
    Decode(String),

    /// Token exchange or credential failure.
    #[error("authentication failed: {0}")]
    Auth(String),
}

/// All errors that can end a synchronizer run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Configuration could not be resolved; nothing was mutated.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The roster could not be read; no reconciliation was attempted.
    #[error("failed to read roster: {0}")]
    RosterRead(#[source] ProviderError),

    /// The group listing could not be read; no reconciliation was attempted.
    #[error("failed to list group members: {0}")]
    GroupRead(#[source] ProviderError),

    /// The batch ran to completion but some items failed. Changes that
    /// succeeded stay applied.
    #[error("{failed} of {attempted} change(s) failed")]
    ApplyFailed {
        attempted: usize,
        failed: usize,
        report: Box<RunReport>,
    },
}

/// Reasons a membership form submission is rejected. Each maps to the HTTP
/// status the form backend answers with.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnrollError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Received payment doesn't match expected payment.")]
    PaymentMismatch { expected: u32, received: Option<i64> },

    #[error("Failed to retrieve your PayPal Order given the provided ID.")]
    OrderLookup(#[source] ProviderError),

    #[error("Failed to accept (capture) your payment.")]
    Capture(#[source] ProviderError),

    #[error("Missing parameter '{0}' in Google Sheet database header.")]
    MissingColumn(String),

    #[error("Failed to access the membership database.")]
    Roster(#[source] ProviderError),

    #[error("Could not compute the membership expiry date.")]
    Expiry,
}

impl EnrollError {
    pub fn status(&self) -> u16 {
        match self {
            EnrollError::BadRequest(_) | EnrollError::PaymentMismatch { .. } => 400,
            _ => 500,
        }
    }
}
