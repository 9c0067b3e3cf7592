//! End-to-end orchestration scenarios: pipeline dispatch, AI turns with
//! tools, and pooled server lifecycle across conversations.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;

use convoy_agent::{
    AgentTool, AiHandler, CommandContext, Pipeline, ResourcePool, SharedFactory, ToolFactory,
    Toolbox,
};
use convoy_agent::tools::ThinkToolFactory;
use convoy_llm::mock::MockClient;
use convoy_llm::{AiClientProvider, CompletionResponse, StopReason, ToolCall};
use convoy_mcp::McpServerConfig;
use convoy_types::EventKind;

fn ai_pipeline(mock: Arc<MockClient>, toolbox: Toolbox) -> Pipeline {
    let mut provider = AiClientProvider::new();
    provider.register_client(mock);
    let ai = AiHandler::new("coder", Arc::new(Mutex::new(provider)), Arc::new(toolbox));
    Pipeline::new(Arc::new(ai))
}

fn tool_use_response(id: &str, name: &str, args: serde_json::Value) -> CompletionResponse {
    CompletionResponse {
        text: String::new(),
        tool_calls: vec![ToolCall {
            id: id.to_string(),
            name: name.to_string(),
            arguments: args,
        }],
        stop_reason: StopReason::ToolUse,
        usage: Default::default(),
    }
}

#[tokio::test]
async fn test_ai_turn_records_tool_request_and_response() {
    let mock = Arc::new(MockClient::new("mock"));
    mock.push_response(tool_use_response(
        "call_1",
        "think",
        json!({"thought": "check the schema first"}),
    ));
    mock.push_text("done thinking");

    let mut toolbox = Toolbox::new(Arc::new(ResourcePool::new()));
    toolbox.register_builtin(Arc::new(ThinkToolFactory::new()));
    let pipeline = ai_pipeline(mock.clone(), toolbox);

    let mut context = CommandContext::new("demo", "dev");
    context.add_commands(vec!["review the database layout"]);
    let context = pipeline.run(context).await;

    let thread = context.thread.lock();
    let tags: Vec<&str> = thread.events().iter().map(|e| e.kind_tag()).collect();
    // User message, tool request, the think tool's own thinking event, the
    // tool response, final assistant message.
    assert_eq!(
        tags,
        vec!["message", "tool_request", "thinking", "tool_response", "message"]
    );

    // The tool response answers the request by key.
    let request_key = &thread.events()[1].key;
    assert_eq!(thread.events()[3].parent_key.as_ref(), Some(request_key));

    // Second model call carried the tool result back.
    let requests = mock.requests();
    assert_eq!(requests.len(), 2);
    let last = requests[1].messages.last().unwrap();
    assert_eq!(last.tool_call_id.as_deref(), Some("call_1"));
    assert_eq!(last.content, "Thought recorded.");
}

#[tokio::test]
async fn test_unknown_tool_feeds_error_back_to_model() {
    let mock = Arc::new(MockClient::new("mock"));
    mock.push_response(tool_use_response("call_1", "no_such_tool", json!({})));
    mock.push_text("understood");

    let toolbox = Toolbox::new(Arc::new(ResourcePool::new()));
    let pipeline = ai_pipeline(mock.clone(), toolbox);

    let mut context = CommandContext::new("demo", "dev");
    context.add_commands(vec!["go"]);
    pipeline.run(context).await;

    let requests = mock.requests();
    assert_eq!(requests.len(), 2);
    let last = requests[1].messages.last().unwrap();
    assert!(last.content.contains("tool not found"));
    assert!(last.content.contains("no_such_tool"));
}

#[tokio::test]
async fn test_stop_during_tool_round_gates_further_provider_calls() {
    /// Factory whose single tool requests a cooperative stop.
    struct HaltFactory {
        stop: Arc<AtomicBool>,
    }

    #[async_trait]
    impl ToolFactory for HaltFactory {
        fn integration(&self) -> &str {
            "halt"
        }
        async fn build_tools(
            &self,
            _context: &CommandContext,
            _agent_name: &str,
        ) -> convoy_agent::Result<Vec<AgentTool>> {
            let stop = self.stop.clone();
            Ok(vec![AgentTool::new(
                "halt",
                "request a stop",
                json!({"type": "object"}),
                move |_args| {
                    let stop = stop.clone();
                    Box::pin(async move {
                        stop.store(true, Ordering::SeqCst);
                        Ok("stopping".to_string())
                    })
                },
            )])
        }
    }

    let mock = Arc::new(MockClient::new("mock"));
    // The scripted model would ask for the tool forever.
    for i in 0..5 {
        mock.push_response(tool_use_response(&format!("call_{i}"), "halt", json!({})));
    }

    let stop = Arc::new(AtomicBool::new(false));
    let mut toolbox = Toolbox::new(Arc::new(ResourcePool::new()));
    toolbox.register_builtin(Arc::new(HaltFactory { stop: stop.clone() }));

    let mut provider = AiClientProvider::new();
    provider.register_client(mock.clone());
    let ai = AiHandler::new("coder", Arc::new(Mutex::new(provider)), Arc::new(toolbox));
    // The pipeline binds its flag into the handler; no handler-side wiring.
    let pipeline = Pipeline::new(Arc::new(ai)).with_stop_flag(stop);

    let mut context = CommandContext::new("demo", "dev");
    context.add_commands(vec!["go"]);
    pipeline.run(context).await;

    // The stop set during tool execution prevented any further completion.
    assert_eq!(mock.requests().len(), 1);
}

#[tokio::test]
async fn test_no_provider_surfaces_error_event_and_continues() {
    let provider = AiClientProvider::new();
    let toolbox = Toolbox::new(Arc::new(ResourcePool::new()));
    let ai = AiHandler::new("coder", Arc::new(Mutex::new(provider)), Arc::new(toolbox));
    let pipeline = Pipeline::new(Arc::new(ai));

    let mut context = CommandContext::new("demo", "dev");
    context.add_commands(vec!["hello", "still here"]);
    let context = pipeline.run(context).await;

    let thread = context.thread.lock();
    // Both commands processed; each produced an error event, no panic.
    let errors = thread
        .events()
        .iter()
        .filter(|e| e.kind_tag() == "error")
        .count();
    assert_eq!(errors, 2);
}

#[tokio::test]
async fn test_throwing_factory_does_not_break_the_turn() {
    struct ThrowingFactory;

    #[async_trait]
    impl ToolFactory for ThrowingFactory {
        fn integration(&self) -> &str {
            "broken"
        }
        async fn build_tools(
            &self,
            _context: &CommandContext,
            _agent_name: &str,
        ) -> convoy_agent::Result<Vec<AgentTool>> {
            Err(convoy_agent::AgentError::tool("deliberate failure"))
        }
    }

    let mock = Arc::new(MockClient::new("mock"));
    mock.push_response(tool_use_response(
        "call_1",
        "think",
        json!({"thought": "still works"}),
    ));
    mock.push_text("ok");

    let mut toolbox = Toolbox::new(Arc::new(ResourcePool::new()));
    toolbox.register_builtin(Arc::new(ThrowingFactory));
    toolbox.register_builtin(Arc::new(ThinkToolFactory::new()));
    let pipeline = ai_pipeline(mock.clone(), toolbox);

    let mut context = CommandContext::new("demo", "dev");
    context.add_commands(vec!["go"]);
    let context = pipeline.run(context).await;

    // The surviving factory's tool executed despite the broken sibling.
    let thread = context.thread.lock();
    assert!(thread.events().iter().any(|e| e.kind_tag() == "thinking"));
    // The broken factory's failure never became a tool advertised to the
    // model.
    let advertised = &mock.requests()[0].tools;
    assert_eq!(advertised.len(), 1);
    assert_eq!(advertised[0].name, "think");
}

#[tokio::test]
async fn test_two_conversations_share_one_pooled_server() {
    struct TrackedFactory {
        kills: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ToolFactory for TrackedFactory {
        fn integration(&self) -> &str {
            "tracked"
        }
        async fn build_tools(
            &self,
            _context: &CommandContext,
            _agent_name: &str,
        ) -> convoy_agent::Result<Vec<AgentTool>> {
            Ok(Vec::new())
        }
        fn kill(&self) -> convoy_agent::Result<()> {
            self.kills.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    let pool = Arc::new(ResourcePool::new());
    let config = McpServerConfig::new("tracked", "some-server").with_arg("--flag");
    let creations = Arc::new(AtomicUsize::new(0));
    let kills = Arc::new(AtomicUsize::new(0));

    let conversation_a = CommandContext::new("demo", "alice");
    let conversation_b = CommandContext::new("demo", "bob");

    for context in [&conversation_a, &conversation_b] {
        let creations = creations.clone();
        let kills = kills.clone();
        pool.get_or_create(&config, &context.thread_id(), move || {
            creations.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(TrackedFactory { kills }) as SharedFactory)
        })
        .unwrap();
    }

    // Identical configuration in two conversations: one live instance.
    assert_eq!(creations.load(Ordering::SeqCst), 1);
    assert_eq!(pool.stats().len(), 1);
    assert_eq!(pool.stats().instances[0].threads.len(), 2);

    // First conversation ends: the instance survives for the second.
    pool.release_thread(&conversation_a.thread_id());
    assert_eq!(kills.load(Ordering::SeqCst), 0);
    assert_eq!(pool.stats().len(), 1);

    // Last conversation ends: exactly one teardown, pool empty.
    pool.release_thread(&conversation_b.thread_id());
    assert_eq!(kills.load(Ordering::SeqCst), 1);
    assert!(pool.stats().is_empty());

    // Releasing again is a no-op, not a double teardown.
    pool.release_thread(&conversation_b.thread_id());
    assert_eq!(kills.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_integration_filter_limits_consulted_servers() {
    let mut toolbox = Toolbox::new(Arc::new(ResourcePool::new()));
    // Both servers would fail to spawn; the filter must skip the excluded
    // one before any spawn attempt, and the included one fails gracefully.
    toolbox.add_server(McpServerConfig::new("alpha", "nonexistent-mcp-server-12345"));
    toolbox.add_server(McpServerConfig::new("beta", "nonexistent-mcp-server-12345"));

    let context = CommandContext::new("demo", "dev");
    let allowed = vec!["alpha".to_string()];
    let tools = toolbox.get_tools(&context, Some(&allowed), "coder").await;
    assert!(tools.is_empty());
}

#[tokio::test]
async fn test_batch_decomposition_processes_depth_first() {
    struct ExpandHandler;

    #[async_trait]
    impl convoy_agent::Handler for ExpandHandler {
        fn command_word(&self) -> &str {
            "expand"
        }
        fn description(&self) -> &str {
            "expands into two steps"
        }
        async fn handle(&self, _command: String, mut context: CommandContext) -> CommandContext {
            context.add_commands(vec!["step one", "step two"]);
            context
        }
    }

    let mock = Arc::new(MockClient::new("mock"));
    let toolbox = Toolbox::new(Arc::new(ResourcePool::new()));
    let mut provider = AiClientProvider::new();
    provider.register_client(mock.clone());
    let ai = AiHandler::new("coder", Arc::new(Mutex::new(provider)), Arc::new(toolbox));
    let pipeline = Pipeline::new(Arc::new(ai)).with_handler(Arc::new(ExpandHandler));

    let mut context = CommandContext::new("demo", "dev");
    context.add_commands(vec!["expand", "after"]);
    let context = pipeline.run(context).await;

    // Expansion runs before the command queued behind it.
    let thread = context.thread.lock();
    let user_texts: Vec<String> = thread
        .events()
        .iter()
        .filter_map(|e| e.as_message())
        .filter(|m| m.role == convoy_types::Role::User)
        .map(|m| m.to_text())
        .collect();
    assert_eq!(user_texts, vec!["step one", "step two", "after"]);
}

#[tokio::test]
async fn test_help_then_ai_fallback_in_one_run() {
    let mock = Arc::new(MockClient::new("mock"));
    mock.push_text("hi there");
    let toolbox = Toolbox::new(Arc::new(ResourcePool::new()));
    let pipeline = ai_pipeline(mock.clone(), toolbox);

    let mut context = CommandContext::new("demo", "dev");
    context.add_commands(vec!["help", "greet me"]);
    let context = pipeline.run(context).await;

    let thread = context.thread.lock();
    let tags: Vec<&str> = thread.events().iter().map(|e| e.kind_tag()).collect();
    assert_eq!(tags, vec!["text", "message", "message"]);
    match &thread.events()[0].kind {
        EventKind::Text { text } => assert!(text.contains("Available commands")),
        other => panic!("unexpected event: {other:?}"),
    }
}
