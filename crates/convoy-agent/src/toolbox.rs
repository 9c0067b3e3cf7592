//! The toolbox: assembles the callable tool set for one conversation.
//!
//! Built-in factories are always consulted; MCP-backed factories are
//! acquired through the [`ResourcePool`] so identical configurations share
//! one live server. Failures stay local: a server that will not start or a
//! factory that errors is logged and contributes nothing, and assembly
//! continues with the rest.

use std::sync::Arc;

use convoy_mcp::McpServerConfig;

use crate::context::CommandContext;
use crate::error::Result;
use crate::mcp::{McpToolFactory, NAMESPACE_DELIMITER};
use crate::pool::ResourcePool;
use crate::tool::{AgentTool, OAuthCapable, SharedFactory, ToolFactory};

/// Per-conversation tool aggregation over built-in and pooled factories.
pub struct Toolbox {
    builtins: Vec<SharedFactory>,
    oauth: Vec<Arc<dyn OAuthCapable>>,
    servers: Vec<McpServerConfig>,
    pool: Arc<ResourcePool>,
}

impl Toolbox {
    /// Create a toolbox over the given pool.
    pub fn new(pool: Arc<ResourcePool>) -> Self {
        Self {
            builtins: Vec::new(),
            oauth: Vec::new(),
            servers: Vec::new(),
            pool,
        }
    }

    /// Register a built-in factory.
    pub fn register_builtin(&mut self, factory: SharedFactory) {
        self.builtins.push(factory);
    }

    /// Register a built-in factory that authenticates via OAuth.
    ///
    /// The factory lands in the normal build list and in the OAuth
    /// capability list, so callers can enumerate OAuth integrations without
    /// probing.
    pub fn register_oauth<F>(&mut self, factory: Arc<F>)
    where
        F: ToolFactory + OAuthCapable + 'static,
    {
        self.builtins.push(factory.clone() as SharedFactory);
        self.oauth.push(factory as Arc<dyn OAuthCapable>);
    }

    /// Add a configured MCP server.
    pub fn add_server(&mut self, config: McpServerConfig) {
        self.servers.push(config);
    }

    /// OAuth-capable integrations registered with this toolbox.
    pub fn oauth_integrations(&self) -> Vec<&str> {
        self.oauth.iter().map(|f| f.oauth_provider()).collect()
    }

    /// The pool backing this toolbox.
    pub fn pool(&self) -> &Arc<ResourcePool> {
        &self.pool
    }

    /// Assemble the tool set for this conversation and agent.
    ///
    /// `allowed_integrations` restricts which configured servers are
    /// consulted; empty or absent means unrestricted. Built-in factories are
    /// always consulted. Any failing source is logged and skipped.
    pub async fn get_tools(
        &self,
        context: &CommandContext,
        allowed_integrations: Option<&[String]>,
        agent_name: &str,
    ) -> Vec<AgentTool> {
        let thread_id = context.thread_id();
        let mut sources: Vec<(SharedFactory, Option<Vec<String>>)> = self
            .builtins
            .iter()
            .map(|f| (f.clone(), None))
            .collect();

        for config in &self.servers {
            if !config.enabled {
                continue;
            }
            if let Some(allowed) = allowed_integrations {
                if !allowed.is_empty() && !allowed.iter().any(|a| a == &config.name) {
                    continue;
                }
            }
            match self.acquire(config, &thread_id).await {
                Ok(factory) => sources.push((factory, config.allowed_tools.clone())),
                Err(e) => {
                    tracing::warn!(
                        integration = %config.name,
                        error = %e,
                        "tool server unavailable, skipping"
                    );
                }
            }
        }

        let mut tools = Vec::new();
        for (factory, allow_list) in sources {
            match factory.build_tools(context, agent_name).await {
                Ok(mut built) => {
                    if let Some(allowed) = allow_list {
                        built.retain(|tool| tool_allowed(&tool.name, &allowed));
                    }
                    tools.extend(built);
                }
                Err(e) => {
                    // An erring factory contributes nothing; the rest of the
                    // set stays intact.
                    tracing::warn!(
                        integration = %factory.integration(),
                        error = %e,
                        "tool factory failed, contributing no tools"
                    );
                }
            }
        }

        tracing::debug!(
            agent = %agent_name,
            thread = %thread_id,
            tools = tools.len(),
            "assembled tool set"
        );
        tools
    }

    /// Acquire (or create) the pooled factory for one server config.
    ///
    /// Spawning and the MCP handshake block, so the whole acquisition runs
    /// on the blocking pool.
    async fn acquire(
        &self,
        config: &McpServerConfig,
        thread_id: &str,
    ) -> Result<SharedFactory> {
        let pool = self.pool.clone();
        let config = config.clone();
        let thread_id = thread_id.to_string();
        tokio::task::spawn_blocking(move || {
            pool.get_or_create(&config, &thread_id, || {
                McpToolFactory::connect(config.clone())
                    .map(|factory| Arc::new(factory) as SharedFactory)
            })
        })
        .await
        .map_err(|e| crate::error::AgentError::internal(format!("acquisition task failed: {e}")))?
    }

    /// Tear down built-in factories.
    ///
    /// Pooled factories are not touched here: the conversation owner
    /// releases them through [`ResourcePool::release_thread`].
    pub fn kill(&self) {
        for factory in &self.builtins {
            if let Err(e) = factory.kill() {
                tracing::warn!(
                    integration = %factory.integration(),
                    error = %e,
                    "built-in factory teardown failed"
                );
            }
        }
    }
}

impl std::fmt::Debug for Toolbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Toolbox")
            .field(
                "builtins",
                &self
                    .builtins
                    .iter()
                    .map(|f| f.integration())
                    .collect::<Vec<_>>(),
            )
            .field(
                "servers",
                &self.servers.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Whether a (possibly namespaced) tool name passes an integration
/// allow-list of bare tool names.
fn tool_allowed(name: &str, allowed: &[String]) -> bool {
    allowed.iter().any(|a| {
        name == a || name.ends_with(&format!("{NAMESPACE_DELIMITER}{a}"))
    })
}
