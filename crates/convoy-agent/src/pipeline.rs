//! The command pipeline: pops commands, dispatches to handlers, re-loops.
//!
//! Handlers may enqueue further commands, so the loop is capped: a run that
//! exceeds [`MAX_ITERATIONS`] logs a warning and returns the context as-is
//! rather than spinning forever. Stopping is cooperative: the flag is
//! checked before each step, in-flight work is never aborted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use convoy_types::{EventKind, ThreadEvent};

use crate::context::CommandContext;
use crate::handler::Handler;

/// Hard cap on commands processed per top-level run.
pub const MAX_ITERATIONS: usize = 100;

/// The top-level command loop.
pub struct Pipeline {
    handlers: Vec<Arc<dyn Handler>>,
    fallback: Arc<dyn Handler>,
    stop: Arc<AtomicBool>,
}

impl Pipeline {
    /// Create a pipeline with the given fallback handler (normally the AI
    /// handler) and a fresh stop flag.
    ///
    /// The flag is bound to the fallback (and to every handler registered
    /// later), so a stop gates new provider calls inside an in-flight turn
    /// without any manual wiring.
    pub fn new(fallback: Arc<dyn Handler>) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        fallback.bind_stop(stop.clone());
        Self {
            handlers: Vec::new(),
            fallback,
            stop,
        }
    }

    /// Add a named handler. Order matters: the first acceptor wins.
    pub fn with_handler(mut self, handler: Arc<dyn Handler>) -> Self {
        handler.bind_stop(self.stop.clone());
        self.handlers.push(handler);
        self
    }

    /// Share an externally created stop flag.
    ///
    /// The fallback and every handler registered so far are re-bound to the
    /// new flag.
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self.fallback.bind_stop(self.stop.clone());
        for handler in &self.handlers {
            handler.bind_stop(self.stop.clone());
        }
        self
    }

    /// The cooperative stop flag, shareable with handlers.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    /// Request a cooperative stop. The current step finishes; nothing
    /// in flight is aborted.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Process the context's queue until it drains, the stop flag is set,
    /// or the iteration cap is hit.
    ///
    /// Marks the thread `Running` for the duration; a thread already running
    /// rejects the run with an error event rather than interleaving two
    /// drivers on one conversation.
    pub async fn run(&self, mut context: CommandContext) -> CommandContext {
        let started = context.thread.lock().start();
        if let Err(e) = started {
            tracing::warn!(error = %e, "rejecting concurrent run");
            context.thread.lock().add_event(ThreadEvent::new(EventKind::Error {
                message: format!("cannot process new input: {e}"),
            }));
            return context;
        }
        self.stop.store(false, Ordering::SeqCst);
        let mut iterations = 0;

        loop {
            if self.stop.load(Ordering::SeqCst) {
                tracing::info!("pipeline stopped");
                context.thread.lock().stop();
                return context;
            }
            iterations += 1;
            if iterations > MAX_ITERATIONS {
                tracing::warn!(cap = MAX_ITERATIONS, "iteration cap reached, returning");
                {
                    let mut thread = context.thread.lock();
                    thread.add_event(ThreadEvent::new(EventKind::Warning {
                        message: format!(
                            "command cap of {MAX_ITERATIONS} reached, dropping remaining commands"
                        ),
                    }));
                    thread.finish();
                }
                return context;
            }

            let Some(command) = context.commands.pop_front() else {
                context.thread.lock().finish();
                return context;
            };
            let command = command.trim().to_string();

            if command.is_empty() || command.eq_ignore_ascii_case("help") || command == "h" {
                self.emit_help(&context);
                continue;
            }

            let handler = self
                .handlers
                .iter()
                .find(|h| h.accept(&command, &context))
                .cloned();

            context = match handler {
                Some(handler) => {
                    tracing::debug!(word = %handler.command_word(), command = %command, "dispatching");
                    handler.handle(command, context).await
                }
                // Unmatched text is a conversation turn, not an error.
                None => self.fallback.handle(command, context).await,
            };
        }
    }

    /// Append the sorted handler table to the thread.
    fn emit_help(&self, context: &CommandContext) {
        let mut rows: Vec<(String, String)> = self
            .handlers
            .iter()
            .chain(std::iter::once(&self.fallback))
            .map(|h| (h.command_word().to_string(), h.description().to_string()))
            .collect();
        rows.sort();

        let table = rows
            .iter()
            .map(|(word, description)| format!("  {word} : {description}"))
            .collect::<Vec<_>>()
            .join("\n");
        context.thread.lock().add_event(ThreadEvent::new(EventKind::Text {
            text: format!("Available commands:\n{table}"),
        }));
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field(
                "handlers",
                &self
                    .handlers
                    .iter()
                    .map(|h| h.command_word())
                    .collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    /// Fallback that records what reached it.
    struct SinkHandler;

    #[async_trait]
    impl Handler for SinkHandler {
        fn command_word(&self) -> &str {
            "sink"
        }
        fn description(&self) -> &str {
            "records unmatched commands"
        }
        async fn handle(&self, command: String, context: CommandContext) -> CommandContext {
            context.thread.lock().add_event(ThreadEvent::new(EventKind::Text {
                text: format!("sink:{command}"),
            }));
            context
        }
    }

    /// Handler that re-enqueues its own command forever.
    struct LoopingHandler;

    #[async_trait]
    impl Handler for LoopingHandler {
        fn command_word(&self) -> &str {
            "again"
        }
        fn description(&self) -> &str {
            "re-enqueues itself"
        }
        async fn handle(&self, command: String, mut context: CommandContext) -> CommandContext {
            context.add_commands(vec![command]);
            context
        }
    }

    #[tokio::test]
    async fn test_queue_drains_and_returns() {
        let pipeline = Pipeline::new(Arc::new(SinkHandler));
        let mut context = CommandContext::new("demo", "dev");
        context.add_commands(vec!["first", "second"]);

        let context = pipeline.run(context).await;
        assert!(context.commands.is_empty());
        let thread = context.thread.lock();
        assert_eq!(thread.len(), 2);
        assert_eq!(thread.state(), convoy_thread::RunState::Idle);
    }

    #[tokio::test]
    async fn test_run_while_running_is_rejected() {
        let pipeline = Pipeline::new(Arc::new(SinkHandler));
        let mut context = CommandContext::new("demo", "dev");
        context.thread.lock().start().unwrap();
        context.add_commands(vec!["one"]);

        let context = pipeline.run(context).await;
        // Queue untouched, a descriptive error recorded instead of a second
        // driver interleaving on the same conversation.
        assert_eq!(context.commands.len(), 1);
        let thread = context.thread.lock();
        assert_eq!(thread.len(), 1);
        assert_eq!(thread.events()[0].kind_tag(), "error");
    }

    #[tokio::test]
    async fn test_self_enqueueing_command_hits_cap() {
        let pipeline = Pipeline::new(Arc::new(SinkHandler)).with_handler(Arc::new(LoopingHandler));
        let mut context = CommandContext::new("demo", "dev");
        context.add_commands(vec!["again"]);

        // Terminates despite the handler re-enqueueing itself every step.
        let context = pipeline.run(context).await;
        let thread = context.thread.lock();
        assert_eq!(thread.len(), 1);
        assert_eq!(thread.events()[0].kind_tag(), "warning");
    }

    #[tokio::test]
    async fn test_help_emits_sorted_handler_table() {
        let pipeline = Pipeline::new(Arc::new(SinkHandler)).with_handler(Arc::new(LoopingHandler));
        let mut context = CommandContext::new("demo", "dev");
        context.add_commands(vec!["help"]);

        let context = pipeline.run(context).await;
        let thread = context.thread.lock();
        match &thread.events()[0].kind {
            EventKind::Text { text } => {
                assert!(text.contains("again"));
                assert!(text.contains("sink"));
                // Sorted: "again" lists before "sink".
                assert!(text.find("again").unwrap() < text.find("sink").unwrap());
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_blank_command_shows_help_and_continues() {
        let pipeline = Pipeline::new(Arc::new(SinkHandler));
        let mut context = CommandContext::new("demo", "dev");
        context.add_commands(vec!["   ", "real"]);

        let context = pipeline.run(context).await;
        let thread = context.thread.lock();
        assert_eq!(thread.len(), 2);
        match &thread.events()[1].kind {
            EventKind::Text { text } => assert_eq!(text, "sink:real"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_stop_before_run_is_reset() {
        let pipeline = Pipeline::new(Arc::new(SinkHandler));
        pipeline.stop();

        let mut context = CommandContext::new("demo", "dev");
        context.add_commands(vec!["one"]);
        let context = pipeline.run(context).await;
        // A new run starts fresh.
        assert_eq!(context.thread.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_stop_mid_run_skips_remaining_commands() {
        /// Sets the shared stop flag when handled.
        struct StoppingHandler {
            stop: Arc<AtomicBool>,
        }

        #[async_trait]
        impl Handler for StoppingHandler {
            fn command_word(&self) -> &str {
                "stopnow"
            }
            fn description(&self) -> &str {
                "requests a cooperative stop"
            }
            async fn handle(&self, _command: String, context: CommandContext) -> CommandContext {
                self.stop.store(true, Ordering::SeqCst);
                context
            }
        }

        let stop = Arc::new(AtomicBool::new(false));
        let pipeline = Pipeline::new(Arc::new(SinkHandler))
            .with_handler(Arc::new(StoppingHandler { stop: stop.clone() }))
            .with_stop_flag(stop);

        let mut context = CommandContext::new("demo", "dev");
        context.add_commands(vec!["stopnow", "never reached"]);
        let context = pipeline.run(context).await;

        // The queued command after the stop was not processed.
        assert_eq!(context.commands.len(), 1);
        assert!(context.thread.lock().is_empty());
    }

    #[tokio::test]
    async fn test_unmatched_command_routes_to_fallback() {
        let pipeline = Pipeline::new(Arc::new(SinkHandler)).with_handler(Arc::new(LoopingHandler));
        let mut context = CommandContext::new("demo", "dev");
        context.add_commands(vec!["tell me about rust"]);

        let context = pipeline.run(context).await;
        let thread = context.thread.lock();
        match &thread.events()[0].kind {
            EventKind::Text { text } => assert_eq!(text, "sink:tell me about rust"),
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
