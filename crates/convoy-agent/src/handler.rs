//! Command handlers: named operations the pipeline dispatches to.
//!
//! A handler claims a command by case-insensitive prefix match on its
//! command word and consumes the context, handing back a (possibly
//! transformed) context. Handlers surface their own failures as thread
//! events so the pipeline keeps stepping.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use async_trait::async_trait;

use convoy_types::{EventKind, ThreadEvent};

use crate::context::CommandContext;

/// One dispatchable operation.
#[async_trait]
pub trait Handler: Send + Sync {
    /// The word this handler claims.
    fn command_word(&self) -> &str;

    /// One-line description for the help table.
    fn description(&self) -> &str;

    /// Whether this handler claims the command. Prefix match, case
    /// insensitive; no word-boundary requirement.
    fn accept(&self, command: &str, _context: &CommandContext) -> bool {
        command
            .trim()
            .to_lowercase()
            .starts_with(&self.command_word().to_lowercase())
    }

    /// Process the command. The handler owns the context for the duration
    /// and must hand it back.
    async fn handle(&self, command: String, context: CommandContext) -> CommandContext;

    /// Called when the handler is registered with a pipeline. Handlers that
    /// gate long-running work on the cooperative stop flag keep the
    /// reference; the default ignores it.
    fn bind_stop(&self, _stop: Arc<AtomicBool>) {}
}

/// A handler grouping sub-commands under one word.
///
/// Delegates to the first accepting child; with no match (or no remainder)
/// it lists the available sub-commands into the thread.
pub struct NestedHandler {
    word: String,
    description: String,
    handlers: Vec<Arc<dyn Handler>>,
}

impl NestedHandler {
    /// Create an empty nested handler.
    pub fn new(word: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            description: description.into(),
            handlers: Vec::new(),
        }
    }

    /// Add a sub-handler. Order matters: the first acceptor wins.
    pub fn with_handler(mut self, handler: Arc<dyn Handler>) -> Self {
        self.handlers.push(handler);
        self
    }

    fn sub_command_listing(&self) -> String {
        let mut lines: Vec<String> = self
            .handlers
            .iter()
            .map(|h| format!("  {} {} : {}", self.word, h.command_word(), h.description()))
            .collect();
        lines.sort();
        format!("Available '{}' sub-commands:\n{}", self.word, lines.join("\n"))
    }
}

#[async_trait]
impl Handler for NestedHandler {
    fn command_word(&self) -> &str {
        &self.word
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn handle(&self, command: String, context: CommandContext) -> CommandContext {
        let trimmed = command.trim();
        let rest = trimmed
            .get(self.word.len()..)
            .unwrap_or_default()
            .trim()
            .to_string();

        if !rest.is_empty() {
            if let Some(handler) = self.handlers.iter().find(|h| h.accept(&rest, &context)) {
                return handler.handle(rest, context).await;
            }
            tracing::debug!(word = %self.word, rest = %rest, "no sub-handler accepted");
        }

        context.thread.lock().add_event(ThreadEvent::new(EventKind::Text {
            text: self.sub_command_listing(),
        }));
        context
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RecordingHandler {
        word: &'static str,
    }

    #[async_trait]
    impl Handler for RecordingHandler {
        fn command_word(&self) -> &str {
            self.word
        }

        fn description(&self) -> &str {
            "records the command it handled"
        }

        async fn handle(&self, command: String, context: CommandContext) -> CommandContext {
            context.thread.lock().add_event(ThreadEvent::new(EventKind::Text {
                text: format!("{}:{}", self.word, command),
            }));
            context
        }
    }

    #[test]
    fn test_accept_is_case_insensitive_prefix() {
        let handler = RecordingHandler { word: "config" };
        let context = CommandContext::new("demo", "dev");
        assert!(handler.accept("config edit", &context));
        assert!(handler.accept("CONFIG", &context));
        assert!(handler.accept("  config", &context));
        // Prefix match without a word boundary.
        assert!(handler.accept("configure", &context));
        assert!(!handler.accept("edit config", &context));
    }

    #[tokio::test]
    async fn test_nested_delegates_to_first_acceptor() {
        let nested = NestedHandler::new("memory", "memory operations")
            .with_handler(Arc::new(RecordingHandler { word: "add" }))
            .with_handler(Arc::new(RecordingHandler { word: "list" }));

        let context = CommandContext::new("demo", "dev");
        let context = nested.handle("memory add a fact".into(), context).await;

        let thread = context.thread.lock();
        assert_eq!(thread.len(), 1);
        match &thread.events()[0].kind {
            EventKind::Text { text } => assert_eq!(text, "add:add a fact"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_nested_lists_sub_commands_on_no_match() {
        let nested = NestedHandler::new("memory", "memory operations")
            .with_handler(Arc::new(RecordingHandler { word: "add" }))
            .with_handler(Arc::new(RecordingHandler { word: "list" }));

        let context = CommandContext::new("demo", "dev");
        let context = nested.handle("memory frobnicate".into(), context).await;

        let thread = context.thread.lock();
        match &thread.events()[0].kind {
            EventKind::Text { text } => {
                assert!(text.contains("memory add"));
                assert!(text.contains("memory list"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_nested_bare_word_lists_sub_commands() {
        let nested = NestedHandler::new("memory", "memory operations")
            .with_handler(Arc::new(RecordingHandler { word: "add" }));

        let context = CommandContext::new("demo", "dev");
        let context = nested.handle("memory".into(), context).await;
        assert_eq!(context.thread.lock().len(), 1);
    }
}
