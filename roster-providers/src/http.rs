//! Shared blocking HTTP plumbing.

use std::time::Duration;

use serde::de::DeserializeOwned;

use roster_sync::ProviderError;

const TIMEOUT: Duration = Duration::from_secs(30);

/// Agent used by every adapter.
pub fn agent() -> ureq::Agent {
    ureq::AgentBuilder::new()
        .timeout(TIMEOUT)
        .user_agent(concat!("roster/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Classify a ureq failure.
///
/// 409 and 404 get their own variants because callers treat them
/// differently; every other status keeps the response body as the message.
pub fn classify(err: ureq::Error) -> ProviderError {
    match err {
        ureq::Error::Status(status, response) => {
            let body = response.into_string().unwrap_or_default();
            let message = error_message(&body).unwrap_or(body);
            match status {
                409 => ProviderError::Conflict,
                404 => ProviderError::NotFound(message),
                _ => ProviderError::Status { status, message },
            }
        }
        ureq::Error::Transport(transport) => ProviderError::Transport(transport.to_string()),
    }
}

/// Pull a human-readable message out of a Google or PayPal style error body.
fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let message = value
        .pointer("/error/message")
        .or_else(|| value.pointer("/message"))
        .or_else(|| value.pointer("/error_description"))
        .or_else(|| value.pointer("/errors/0/message"))?;
    message.as_str().map(String::from)
}

pub fn read_json<T: DeserializeOwned>(response: ureq::Response) -> Result<T, ProviderError> {
    response
        .into_json::<T>()
        .map_err(|e| ProviderError::Decode(e.to_string()))
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}
