//! Error types for the LLM crate.

use thiserror::Error;

/// Errors from LLM configuration and provider calls.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Network-level failure talking to a provider.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The provider returned a non-success status.
    #[error("provider '{provider}' returned {status}: {body}")]
    Api {
        /// Provider name.
        provider: String,
        /// HTTP status code.
        status: u16,
        /// Response body excerpt.
        body: String,
    },

    /// The provider response could not be interpreted.
    #[error("unexpected response from '{provider}': {message}")]
    UnexpectedResponse {
        /// Provider name.
        provider: String,
        /// What was wrong.
        message: String,
    },
}

/// Result alias for LLM operations.
pub type Result<T> = std::result::Result<T, LlmError>;
