//! Think tool: records internal reasoning into the conversation thread.
//!
//! Thoughts land as thinking events, visible in the event log but not
//! rendered as assistant messages.

use async_trait::async_trait;
use serde_json::{json, Value};

use convoy_types::{EventKind, ThreadEvent};

use crate::context::CommandContext;
use crate::error::Result;
use crate::tool::{AgentTool, ToolFactory};

/// Factory for the `think` tool.
#[derive(Debug, Clone, Default)]
pub struct ThinkToolFactory;

impl ThinkToolFactory {
    /// Create the factory.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ToolFactory for ThinkToolFactory {
    fn integration(&self) -> &str {
        "think"
    }

    async fn build_tools(
        &self,
        context: &CommandContext,
        _agent_name: &str,
    ) -> Result<Vec<AgentTool>> {
        let thread = context.thread.clone();
        Ok(vec![AgentTool::new(
            "think",
            "Record your internal reasoning. Thoughts are kept in the conversation log but not shown as a reply. Use this to work through complex problems or plan multi-step actions.",
            json!({
                "type": "object",
                "properties": {
                    "thought": {"type": "string", "description": "Your internal reasoning to record"}
                },
                "required": ["thought"]
            }),
            move |args: Value| {
                let thread = thread.clone();
                Box::pin(async move {
                    let Some(thought) = args.get("thought").and_then(|v| v.as_str()) else {
                        return Ok("Error: missing required parameter 'thought'".to_string());
                    };
                    thread.lock().add_event(ThreadEvent::new(EventKind::Thinking {
                        text: thought.to_string(),
                    }));
                    Ok("Thought recorded.".to_string())
                })
            },
        )])
    }
}
