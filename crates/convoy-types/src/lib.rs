//! Shared types for the Convoy conversation runtime.
//!
//! This crate is the leaf of the workspace: identifiers, thread events,
//! message content, and provider/model configuration used by every other
//! Convoy crate.

pub mod config;
pub mod event;

pub use config::{AiModel, AiProviderConfig, ModelPrice};
pub use event::{ContentPart, EventKind, MessageEvent, Role, ThreadEvent};

use chrono::{SecondsFormat, Utc};

/// A unique identifier (UUID v4 string).
pub type Id = String;

/// Generate a new thread identifier.
pub fn new_thread_id() -> Id {
    uuid::Uuid::new_v4().to_string()
}

/// Generate an event key: an RFC-3339 timestamp plus a short random suffix.
///
/// The suffix keeps keys unique even when two events land in the same
/// millisecond. Uniqueness is load-bearing: a question's key becomes the
/// `parent_key` of its answer, and consumers correlate strictly by this
/// field.
pub fn event_key() -> String {
    let stamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    let suffix = &uuid::Uuid::new_v4().simple().to_string()[..6];
    format!("{stamp}-{suffix}")
}
