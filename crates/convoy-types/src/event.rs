//! Thread event types.
//!
//! A conversation thread is an append-only sequence of [`ThreadEvent`]s. Each
//! event carries a unique key (timestamp plus random suffix) and an optional
//! `parent_key` linking it to the event it answers.

use serde::{Deserialize, Serialize};

use crate::event_key;

/// Rough characters-per-token ratio used for message length estimates.
const CHARS_PER_TOKEN: usize = 4;

/// Role of a message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One part of a message's content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentPart {
    /// Plain text.
    Text {
        /// The text content.
        text: String,
    },
    /// Base64-encoded image.
    Image {
        /// Base64-encoded image data.
        data: String,
        /// MIME type of the image.
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
}

impl ContentPart {
    /// Create a text part.
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text { text: text.into() }
    }
}

/// A user or assistant message within a thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEvent {
    /// Who authored the message.
    pub role: Role,
    /// Speaker name (username or agent name).
    pub name: String,
    /// One or more content parts.
    pub content: Vec<ContentPart>,
}

impl MessageEvent {
    /// Create a single-text-part message.
    pub fn new(role: Role, name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            role,
            name: name.into(),
            content: vec![ContentPart::text(text)],
        }
    }

    /// Approximate token cost of this message.
    ///
    /// Images count their base64 payload, which overestimates but keeps the
    /// budget conservative.
    pub fn length(&self) -> usize {
        let chars: usize = self
            .content
            .iter()
            .map(|part| match part {
                ContentPart::Text { text } => text.len(),
                ContentPart::Image { data, .. } => data.len(),
            })
            .sum();
        chars / CHARS_PER_TOKEN
    }

    /// Concatenated text content, ignoring images.
    pub fn to_text(&self) -> String {
        self.content
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// The payload of a thread event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// A user or assistant message.
    Message(MessageEvent),
    /// The assistant requested a tool invocation.
    ToolRequest {
        /// Tool name.
        name: String,
        /// JSON arguments.
        args: serde_json::Value,
    },
    /// Output of a tool invocation.
    ToolResponse {
        /// Tool output, serialized as text.
        output: String,
    },
    /// A question to the user; its key becomes the answer's `parent_key`.
    Question {
        /// The question text.
        text: String,
        /// Options to choose from, if this is a choice prompt.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        options: Vec<String>,
    },
    /// The answer selected for a question.
    Choice {
        /// The selected value.
        value: String,
    },
    /// An error surfaced to the conversation.
    Error {
        /// Error description.
        message: String,
    },
    /// A warning surfaced to the conversation.
    Warning {
        /// Warning description.
        message: String,
    },
    /// Model thinking output.
    Thinking {
        /// Thinking text.
        text: String,
    },
    /// Free-form text not attributed to a speaker.
    Text {
        /// The text.
        text: String,
    },
}

/// One entry in a thread's append-only event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadEvent {
    /// Unique key: RFC-3339 timestamp plus random suffix.
    pub key: String,
    /// Key of the event this one answers, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_key: Option<String>,
    /// The event payload.
    pub kind: EventKind,
}

impl ThreadEvent {
    /// Create a new event with a fresh key and no parent.
    pub fn new(kind: EventKind) -> Self {
        Self {
            key: event_key(),
            parent_key: None,
            kind,
        }
    }

    /// Create a new event answering the event with the given key.
    pub fn answering(parent_key: impl Into<String>, kind: EventKind) -> Self {
        Self {
            key: event_key(),
            parent_key: Some(parent_key.into()),
            kind,
        }
    }

    /// True if this event is a message.
    pub fn is_message(&self) -> bool {
        matches!(self.kind, EventKind::Message(_))
    }

    /// The message payload, if this event is one.
    pub fn as_message(&self) -> Option<&MessageEvent> {
        match &self.kind {
            EventKind::Message(m) => Some(m),
            _ => None,
        }
    }

    /// Discriminant tag used for type-based retention in truncation.
    pub fn kind_tag(&self) -> &'static str {
        match self.kind {
            EventKind::Message(_) => "message",
            EventKind::ToolRequest { .. } => "tool_request",
            EventKind::ToolResponse { .. } => "tool_response",
            EventKind::Question { .. } => "question",
            EventKind::Choice { .. } => "choice",
            EventKind::Error { .. } => "error",
            EventKind::Warning { .. } => "warning",
            EventKind::Thinking { .. } => "thinking",
            EventKind::Text { .. } => "text",
        }
    }
}
