//! The tool framework: callable tools and the factories that build them.
//!
//! An [`AgentTool`] is one callable unit: a unique name, a description, a
//! JSON Schema for its arguments, and an async executor. Factories build
//! tool sets per conversation, so a tool can close over conversation state
//! (the thread, pooled server clients, project paths).

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use convoy_llm::ToolDefinition;

use crate::context::CommandContext;
use crate::error::Result;

/// Future returned by a tool executor.
pub type ToolFuture = Pin<Box<dyn Future<Output = Result<String>> + Send>>;

/// The executable part of a tool.
pub type ToolExecutor = Arc<dyn Fn(Value) -> ToolFuture + Send + Sync>;

/// A callable tool assembled for one conversation.
#[derive(Clone)]
pub struct AgentTool {
    /// Unique tool name within the assembled set.
    pub name: String,
    /// What the tool does, as shown to the model.
    pub description: String,
    /// JSON Schema for the tool's arguments.
    pub parameters: Value,
    executor: ToolExecutor,
}

impl AgentTool {
    /// Create a tool.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
        executor: impl Fn(Value) -> ToolFuture + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            executor: Arc::new(executor),
        }
    }

    /// Execute the tool with the given arguments.
    pub async fn execute(&self, args: Value) -> Result<String> {
        (self.executor)(args).await
    }

    /// The wire-level definition advertised to the model.
    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.parameters.clone(),
        }
    }
}

impl std::fmt::Debug for AgentTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentTool")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// A source of tools for one integration.
///
/// Factories are stateful: an MCP-backed factory owns the live server
/// connection, a built-in factory may own nothing at all. Building is
/// per-conversation so tools can capture the context they run in.
#[async_trait]
pub trait ToolFactory: Send + Sync {
    /// The integration name this factory serves (used by integration
    /// filtering and allow-lists).
    fn integration(&self) -> &str;

    /// Build the tools this factory contributes for the given conversation
    /// and agent.
    async fn build_tools(
        &self,
        context: &CommandContext,
        agent_name: &str,
    ) -> Result<Vec<AgentTool>>;

    /// Tear down whatever the factory holds (processes, connections).
    ///
    /// Blocking on purpose: teardown runs from pool eviction and `Drop`
    /// paths where suspension is unavailable.
    fn kill(&self) -> Result<()> {
        Ok(())
    }
}

/// Shared factory handle as stored by the toolbox and the resource pool.
pub type SharedFactory = Arc<dyn ToolFactory>;

/// Capability trait for factories whose integration authenticates via OAuth.
///
/// Opt-in and explicit: the toolbox queries this capability through its own
/// registration list rather than probing arbitrary factories.
pub trait OAuthCapable: Send + Sync {
    /// The OAuth provider identifier (e.g. "google", "atlassian").
    fn oauth_provider(&self) -> &str;

    /// Whether usable credentials are currently held.
    fn has_credentials(&self) -> bool;
}
