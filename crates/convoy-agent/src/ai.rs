//! The AI handler: one agent turn against the resolved provider client.
//!
//! Free text that no named handler claims lands here. The handler resolves
//! a client through the [`AiClientProvider`], assembles tools through the
//! [`Toolbox`], and drives the completion/tool loop, recording every step
//! into the thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use convoy_llm::{AiClientProvider, ChatMessage, CompletionRequest, SharedClient};
use convoy_thread::AiThread;
use convoy_types::{EventKind, Role, ThreadEvent};

use crate::context::CommandContext;
use crate::error::AgentError;
use crate::handler::Handler;
use crate::tool::AgentTool;
use crate::toolbox::Toolbox;

/// Tool rounds allowed within a single agent turn.
const MAX_TOOL_ROUNDS: usize = 25;

/// Default generation budget per call.
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Handler that routes free text to the configured AI agent.
pub struct AiHandler {
    agent_name: String,
    provider: Arc<Mutex<AiClientProvider>>,
    toolbox: Arc<Toolbox>,
    provider_name: Option<String>,
    model: Option<String>,
    max_tokens: u32,
    stop: Mutex<Arc<AtomicBool>>,
}

impl AiHandler {
    /// Create an AI handler for the named agent.
    pub fn new(
        agent_name: impl Into<String>,
        provider: Arc<Mutex<AiClientProvider>>,
        toolbox: Arc<Toolbox>,
    ) -> Self {
        Self {
            agent_name: agent_name.into(),
            provider,
            toolbox,
            provider_name: None,
            model: None,
            max_tokens: DEFAULT_MAX_TOKENS,
            stop: Mutex::new(Arc::new(AtomicBool::new(false))),
        }
    }

    /// Pin a specific provider.
    pub fn with_provider_name(mut self, name: impl Into<String>) -> Self {
        self.provider_name = Some(name.into());
        self
    }

    /// Pin a specific model (name or alias).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Share a stop flag.
    ///
    /// Registering with a [`Pipeline`](crate::Pipeline) binds its flag
    /// automatically; this is for embedding the handler without one.
    pub fn with_stop_flag(self, stop: Arc<AtomicBool>) -> Self {
        *self.stop.lock() = stop;
        self
    }

    fn stopped(&self) -> bool {
        self.stop.lock().load(Ordering::SeqCst)
    }

    /// Resolve the client and the canonical model name for this turn.
    fn resolve(&self) -> Option<(SharedClient, String)> {
        let provider = self.provider.lock();
        let client = provider.get_client(self.provider_name.as_deref(), self.model.as_deref())?;
        let model = match &self.model {
            Some(wanted) => client
                .models()
                .iter()
                .find(|m| m.matches(wanted))
                .map(|m| m.name.clone())?,
            None => client.default_model()?.name.clone(),
        };
        Some((client, model))
    }

    async fn run_turn(
        &self,
        client: SharedClient,
        model: String,
        tools: Vec<AgentTool>,
        context: &CommandContext,
    ) {
        let definitions: Vec<_> = tools.iter().map(AgentTool::definition).collect();
        let mut messages = { thread_messages(&context.thread.lock()) };

        let mut rounds = 0;
        loop {
            if self.stopped() {
                tracing::info!(agent = %self.agent_name, "turn stopped");
                return;
            }
            rounds += 1;
            if rounds > MAX_TOOL_ROUNDS {
                tracing::warn!(agent = %self.agent_name, rounds = MAX_TOOL_ROUNDS, "tool round cap reached");
                context.thread.lock().add_event(ThreadEvent::new(EventKind::Warning {
                    message: format!("tool round cap of {MAX_TOOL_ROUNDS} reached, stopping turn"),
                }));
                return;
            }

            let request = CompletionRequest::new(&model, messages.clone(), self.max_tokens)
                .with_tools(definitions.clone());
            let response = match client.complete(request).await {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(agent = %self.agent_name, error = %e, "completion failed");
                    context.thread.lock().add_event(ThreadEvent::new(EventKind::Error {
                        message: format!("completion failed: {e}"),
                    }));
                    return;
                }
            };

            if !response.text.is_empty() {
                context
                    .thread
                    .lock()
                    .add_assistant_message(self.agent_name.clone(), response.text.clone());
            }

            if !response.wants_tools() {
                return;
            }

            messages.push(ChatMessage::assistant_with_tools(
                response.text.clone(),
                response.tool_calls.clone(),
            ));

            for call in &response.tool_calls {
                let request_key = {
                    let mut thread = context.thread.lock();
                    thread
                        .add_event(ThreadEvent::new(EventKind::ToolRequest {
                            name: call.name.clone(),
                            args: call.arguments.clone(),
                        }))
                        .key
                        .clone()
                };

                let output = match tools.iter().find(|t| t.name == call.name) {
                    Some(tool) => match tool.execute(call.arguments.clone()).await {
                        Ok(output) => output,
                        Err(e) => format!("Error: {e}"),
                    },
                    None => format!("Error: {}", AgentError::ToolNotFound(call.name.clone())),
                };

                context.thread.lock().add_event(ThreadEvent::answering(
                    request_key,
                    EventKind::ToolResponse {
                        output: output.clone(),
                    },
                ));
                messages.push(ChatMessage::tool_result(call.id.clone(), output));
            }
        }
    }
}

#[async_trait]
impl Handler for AiHandler {
    fn command_word(&self) -> &str {
        "ai"
    }

    fn description(&self) -> &str {
        "send the text to the AI agent (also the fallback for unmatched commands)"
    }

    async fn handle(&self, command: String, context: CommandContext) -> CommandContext {
        if self.stopped() {
            return context;
        }

        let Some((client, model)) = self.resolve() else {
            tracing::warn!(agent = %self.agent_name, "no AI provider available");
            context.thread.lock().add_event(ThreadEvent::new(EventKind::Error {
                message: "no AI provider available; configure one or set an API key".to_string(),
            }));
            return context;
        };

        let tools = self.toolbox.get_tools(&context, None, &self.agent_name).await;

        context
            .thread
            .lock()
            .add_user_message(context.username.clone(), command);

        self.run_turn(client, model, tools, &context).await;
        context
    }

    fn bind_stop(&self, stop: Arc<AtomicBool>) {
        *self.stop.lock() = stop;
    }
}

/// Project the thread's message events into provider chat messages.
fn thread_messages(thread: &AiThread) -> Vec<ChatMessage> {
    thread
        .events()
        .iter()
        .filter_map(|event| event.as_message())
        .map(|message| match message.role {
            Role::User => ChatMessage::user(message.to_text()),
            Role::Assistant => ChatMessage::assistant(message.to_text()),
        })
        .collect()
}
