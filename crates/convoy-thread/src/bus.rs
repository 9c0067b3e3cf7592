//! Per-conversation event bus.
//!
//! Two explicit channels instead of one subscribe-and-filter stream:
//!
//! - an outbound append-only broadcast of [`ThreadEvent`]s for display, and
//! - a one-shot future per question, keyed by the question event's key, for
//!   inbound answers.
//!
//! Consumers correlate answers strictly by `parent_key == question.key`,
//! never by position.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{broadcast, oneshot};

use convoy_types::{EventKind, ThreadEvent};

use crate::error::{Result, ThreadError};

/// Capacity of the outbound broadcast channel.
const OUTBOUND_CAPACITY: usize = 256;

/// The event bus for one conversation.
///
/// Cheap to clone; all clones share the same channels.
#[derive(Clone)]
pub struct ThreadBus {
    outbound: broadcast::Sender<ThreadEvent>,
    pending: Arc<Mutex<HashMap<String, oneshot::Sender<String>>>>,
}

impl ThreadBus {
    /// Create a new bus.
    pub fn new() -> Self {
        let (outbound, _) = broadcast::channel(OUTBOUND_CAPACITY);
        Self {
            outbound,
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Subscribe to the outbound event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<ThreadEvent> {
        self.outbound.subscribe()
    }

    /// Emit an event to all subscribers.
    ///
    /// Emitting with no subscribers is fine; display is optional.
    pub fn emit(&self, event: ThreadEvent) {
        let _ = self.outbound.send(event);
    }

    /// Emit a question and register a one-shot future for its answer.
    ///
    /// Returns the question's event key and a receiver that resolves when
    /// [`submit_answer`](Self::submit_answer) is called with that key.
    pub fn ask(&self, text: impl Into<String>, options: Vec<String>) -> (String, oneshot::Receiver<String>) {
        let event = ThreadEvent::new(EventKind::Question {
            text: text.into(),
            options,
        });
        let key = event.key.clone();
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(key.clone(), tx);
        self.emit(event);
        (key, rx)
    }

    /// Complete the pending question whose key is `parent_key`.
    ///
    /// Errors when no question with that key is pending — an answer with no
    /// matching question is a protocol violation, not a silent drop.
    pub fn submit_answer(&self, parent_key: &str, value: impl Into<String>) -> Result<()> {
        let sender = self.pending.lock().remove(parent_key).ok_or_else(|| {
            ThreadError::NoPendingQuestion {
                key: parent_key.to_string(),
            }
        })?;

        let value = value.into();
        self.emit(ThreadEvent::answering(
            parent_key,
            EventKind::Choice {
                value: value.clone(),
            },
        ));

        // The asker may have given up; that only affects the asker.
        if sender.send(value).is_err() {
            tracing::debug!(key = %parent_key, "answer arrived after asker went away");
        }
        Ok(())
    }

    /// Withdraw a pending question, e.g. when the conversation is torn down
    /// before anyone answers. The asker's receiver resolves as abandoned.
    ///
    /// Returns whether a question with that key was pending.
    pub fn cancel_question(&self, key: &str) -> bool {
        self.pending.lock().remove(key).is_some()
    }

    /// Resolve a receiver from [`ask`](Self::ask), mapping a withdrawn
    /// question to [`ThreadError::AnswerAbandoned`].
    pub async fn wait_answer(key: String, rx: oneshot::Receiver<String>) -> Result<String> {
        rx.await.map_err(|_| ThreadError::AnswerAbandoned { key })
    }

    /// Number of questions still awaiting an answer.
    pub fn pending_questions(&self) -> usize {
        self.pending.lock().len()
    }
}

impl Default for ThreadBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ThreadBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadBus")
            .field("pending_questions", &self.pending.lock().len())
            .finish_non_exhaustive()
    }
}
