//! Conversation thread model for Convoy.
//!
//! An [`AiThread`] is an identified, named conversation: an append-only log
//! of [`ThreadEvent`]s plus a run state that governs whether the pipeline may
//! keep stepping. Threads can be forked for isolated side-processing and
//! rewound to a prior message for retry.
//!
//! The [`ThreadBus`] carries events outward for display and completes
//! one-shot answer futures keyed by the originating question's event key.

pub mod bus;
pub mod error;
pub mod state;
pub mod thread;

pub use bus::ThreadBus;
pub use error::{Result, ThreadError};
pub use state::RunState;
pub use thread::AiThread;

pub use convoy_types::{ContentPart, EventKind, MessageEvent, Role, ThreadEvent};
