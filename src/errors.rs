//! Error types for quakerisk.
//!
//! Uses `thiserror` for library-style error definitions.

use thiserror::Error;

/// Errors that can occur while talking to the risk service.
#[derive(Error, Debug)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed
    #[error("Failed to parse JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// Service returned a non-success status without an error envelope
    #[error("risk service error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// Service reported an error in the response envelope
    #[error("{0}")]
    ServerReported(String),

    /// Response parsed but is missing fields or carries out-of-range values
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ClientError {
    /// Message shown to the operator for this error.
    ///
    /// Server-reported messages are shown verbatim; everything else collapses
    /// into the given generic message.
    #[must_use]
    pub fn user_message(&self, generic: &str) -> String {
        match self {
            Self::ServerReported(message) => message.clone(),
            _ => generic.to_string(),
        }
    }

    /// Whether the service itself reported this error.
    #[must_use]
    pub fn is_server_reported(&self) -> bool {
        matches!(self, Self::ServerReported(_))
    }
}
