//! The AiThread: an append-only event log plus run state for one conversation.

use serde::{Deserialize, Serialize};

use convoy_types::{new_thread_id, EventKind, Id, MessageEvent, Role, ThreadEvent};

use crate::error::{Result, ThreadError};
use crate::state::RunState;

/// One conversation: identity, ordered events, and run state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiThread {
    /// Unique thread identifier.
    pub id: Id,
    /// Human-readable thread name.
    pub name: String,
    /// The username this thread belongs to.
    pub username: String,
    /// Ordered event log.
    events: Vec<ThreadEvent>,
    /// Current run state.
    state: RunState,
}

impl AiThread {
    /// Create a new empty thread.
    pub fn new(name: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: new_thread_id(),
            name: name.into(),
            username: username.into(),
            events: Vec::new(),
            state: RunState::Idle,
        }
    }

    // ── Event log ────────────────────────────────────────────────────────────

    /// Append an event, guaranteeing key uniqueness within the thread.
    ///
    /// Keys already carry a random suffix; a collision is close to
    /// impossible, but the uniqueness invariant is load-bearing for answer
    /// correlation, so a colliding key is re-rolled rather than trusted.
    pub fn add_event(&mut self, mut event: ThreadEvent) -> &ThreadEvent {
        while self.events.iter().any(|e| e.key == event.key) {
            event.key = convoy_types::event_key();
        }
        self.events.push(event);
        self.events.last().expect("just pushed")
    }

    /// Append a user message.
    pub fn add_user_message(&mut self, name: impl Into<String>, text: impl Into<String>) -> String {
        let event = ThreadEvent::new(EventKind::Message(MessageEvent::new(
            Role::User,
            name,
            text,
        )));
        self.add_event(event).key.clone()
    }

    /// Append an assistant message.
    pub fn add_assistant_message(
        &mut self,
        agent: impl Into<String>,
        text: impl Into<String>,
    ) -> String {
        let event = ThreadEvent::new(EventKind::Message(MessageEvent::new(
            Role::Assistant,
            agent,
            text,
        )));
        self.add_event(event).key.clone()
    }

    /// The full ordered event log.
    pub fn events(&self) -> &[ThreadEvent] {
        &self.events
    }

    /// Ordered event window by caller-supplied positions.
    ///
    /// Pagination is positional rather than size-based so a window always
    /// preserves chronological meaning. `to` is exclusive and clamped to the
    /// log length.
    pub fn get_messages(&self, from: usize, to: usize) -> &[ThreadEvent] {
        let to = to.min(self.events.len());
        let from = from.min(to);
        &self.events[from..to]
    }

    /// Number of events in the log.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True when the log is empty.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    // ── Fork & rewind ────────────────────────────────────────────────────────

    /// Fork an isolated branch sharing history up to and including
    /// `cut_point`.
    ///
    /// The fork gets a fresh id and copies events; it makes no further
    /// reference to the source and never mutates it.
    pub fn fork(&self, cut_point: &str) -> Result<AiThread> {
        let cut = self
            .events
            .iter()
            .position(|e| e.key == cut_point)
            .ok_or_else(|| ThreadError::UnknownEvent {
                key: cut_point.to_string(),
            })?;

        Ok(AiThread {
            id: new_thread_id(),
            name: format!("{} (fork)", self.name),
            username: self.username.clone(),
            events: self.events[..=cut].to_vec(),
            state: RunState::Idle,
        })
    }

    /// Rewind the thread to reconstruct state as of a prior point.
    ///
    /// Removes all events after the one whose key equals `key`, then retains
    /// the last `keep` removed events sharing that event's kind (rewind-and-
    /// retry UX keeps e.g. the retried user messages visible).
    pub fn truncate_at_message(&mut self, key: &str, keep: usize) -> Result<()> {
        let cut = self
            .events
            .iter()
            .position(|e| e.key == key)
            .ok_or_else(|| ThreadError::UnknownEvent {
                key: key.to_string(),
            })?;

        let tag = self.events[cut].kind_tag();
        let removed: Vec<ThreadEvent> = self.events.split_off(cut + 1);
        let mut retained: Vec<ThreadEvent> = removed
            .into_iter()
            .filter(|e| e.kind_tag() == tag)
            .collect();
        if retained.len() > keep {
            retained.drain(..retained.len() - keep);
        }
        tracing::debug!(
            thread = %self.id,
            key = %key,
            retained = retained.len(),
            "truncated thread"
        );
        self.events.extend(retained);
        Ok(())
    }

    // ── Run state ────────────────────────────────────────────────────────────

    /// Current run state.
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Begin processing new input. Errors if already running.
    pub fn start(&mut self) -> Result<()> {
        self.state.start()
    }

    /// Request a cooperative stop.
    pub fn stop(&mut self) {
        self.state.stop();
    }

    /// Mark processing complete.
    pub fn finish(&mut self) {
        self.state.finish();
    }
}
