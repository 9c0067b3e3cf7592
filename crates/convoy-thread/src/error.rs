//! Error types for the thread crate.

use thiserror::Error;

/// Errors from thread operations.
#[derive(Debug, Error)]
pub enum ThreadError {
    /// An invalid run-state transition was attempted.
    #[error("invalid run-state transition: thread is already {state}")]
    InvalidTransition {
        /// The current state that rejected the transition.
        state: crate::state::RunState,
    },

    /// An event key was not found in the thread.
    #[error("no event with key '{key}' in thread")]
    UnknownEvent {
        /// The missing key.
        key: String,
    },

    /// An answer was submitted with no matching pending question.
    #[error("no pending question with key '{key}'")]
    NoPendingQuestion {
        /// The question key the answer referenced.
        key: String,
    },

    /// The answer channel was dropped before a reply arrived.
    #[error("question '{key}' was abandoned before an answer arrived")]
    AnswerAbandoned {
        /// The question key.
        key: String,
    },
}

/// Result alias for thread operations.
pub type Result<T> = std::result::Result<T, ThreadError>;
