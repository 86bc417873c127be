//! Error types for the request/response pipeline.
//!
//! Errors are surfaced to the caller as-is; nothing here is retried.

use thiserror::Error;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Failure of a single model invocation.
#[derive(Debug, Error)]
pub enum Error {
    /// Transport failure, non-success status, or an unreadable reply envelope.
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The model's text could not be turned into a JSON object.
    #[error("Malformed model response: {reason}\n\n{raw}")]
    ResponseFormat { reason: String, raw: String },

    /// Input rejected before any request was sent.
    #[error("{0}")]
    Precondition(String),
}

impl Error {
    pub(crate) fn response_format(reason: impl Into<String>, raw: impl Into<String>) -> Self {
        Error::ResponseFormat {
            reason: reason.into(),
            raw: raw.into(),
        }
    }
}
