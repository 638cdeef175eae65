//! Error types for the Identity Toolkit client.

use thiserror::Error;

/// Result type for Identity Toolkit operations.
pub type Result<T> = std::result::Result<T, IdentityToolkitError>;

/// Identity Toolkit client errors.
#[derive(Debug, Error)]
pub enum IdentityToolkitError {
    /// Network error (connection failed, timeout)
    #[error("Network error: {0}")]
    Network(String),

    /// API error (non-2xx response carrying an error envelope)
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Parse error (invalid JSON, unexpected response format)
    #[error("Parse error: {0}")]
    Parse(String),
}

impl IdentityToolkitError {
    /// The machine-readable reason of an API error, e.g. `INVALID_CODE`.
    ///
    /// The API sometimes appends a human description after `" : "`
    /// (`INVALID_PHONE_NUMBER : TOO_SHORT`); only the leading token is returned.
    pub fn reason(&self) -> Option<&str> {
        match self {
            IdentityToolkitError::Api { message, .. } => {
                Some(message.split(" : ").next().unwrap_or(message).trim())
            }
            _ => None,
        }
    }
}
