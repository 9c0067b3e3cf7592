//! MCP tool factory: adapts a connected MCP server into [`AgentTool`]s.
//!
//! Tool names are namespaced with the integration name (`sqlite:query`) so
//! two servers exposing a `query` tool cannot collide in the assembled set.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use convoy_mcp::{McpClient, McpServerConfig, ToolInfo};

use crate::context::CommandContext;
use crate::error::{AgentError, Result};
use crate::tool::{AgentTool, ToolFactory};

/// Delimiter between integration name and tool name.
pub const NAMESPACE_DELIMITER: &str = ":";

/// Factory owning one live MCP server connection.
pub struct McpToolFactory {
    config: McpServerConfig,
    client: Arc<McpClient>,
}

impl McpToolFactory {
    /// Spawn the server and perform the handshake. Blocking; run inside
    /// `spawn_blocking` from async code.
    pub fn connect(config: McpServerConfig) -> Result<Self> {
        let mut client = McpClient::connect(config.clone())?;
        client.initialize()?;
        Ok(Self {
            config,
            client: Arc::new(client),
        })
    }

    /// The configuration this factory runs.
    pub fn config(&self) -> &McpServerConfig {
        &self.config
    }

    fn adapt(&self, info: &ToolInfo) -> AgentTool {
        let full_name = format!("{}{}{}", self.config.name, NAMESPACE_DELIMITER, info.name);
        let description = info
            .description
            .clone()
            .unwrap_or_else(|| format!("{} tool from the {} integration", info.name, self.config.name));
        let parameters = info
            .input_schema
            .clone()
            .unwrap_or_else(|| json!({"type": "object", "properties": {}}));

        let client = Arc::clone(&self.client);
        let server = self.config.name.clone();
        let tool_name = info.name.clone();

        AgentTool::new(full_name, description, parameters, move |args: Value| {
            let client = Arc::clone(&client);
            let server = server.clone();
            let tool_name = tool_name.clone();
            Box::pin(async move {
                tracing::debug!(server = %server, tool = %tool_name, "executing MCP tool");
                let result = tokio::task::spawn_blocking(move || {
                    client.call_tool(&tool_name, Some(args))
                })
                .await
                .map_err(|e| AgentError::internal(format!("tool call task failed: {e}")))??;

                if result.is_error() {
                    // Server-side tool failure: feed the message back to the
                    // model instead of aborting the turn.
                    Ok(format!("Error: {}", result.text()))
                } else {
                    Ok(result.text())
                }
            })
        })
    }
}

#[async_trait]
impl ToolFactory for McpToolFactory {
    fn integration(&self) -> &str {
        &self.config.name
    }

    async fn build_tools(
        &self,
        _context: &CommandContext,
        agent_name: &str,
    ) -> Result<Vec<AgentTool>> {
        let client = Arc::clone(&self.client);
        let infos = tokio::task::spawn_blocking(move || client.list_tools())
            .await
            .map_err(|e| AgentError::internal(format!("tool listing task failed: {e}")))??;

        tracing::debug!(
            integration = %self.config.name,
            agent = %agent_name,
            tools = infos.len(),
            "built MCP tool set"
        );
        Ok(infos.iter().map(|info| self.adapt(info)).collect())
    }

    fn kill(&self) -> Result<()> {
        self.client.shutdown()?;
        Ok(())
    }
}

impl std::fmt::Debug for McpToolFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpToolFactory")
            .field("integration", &self.config.name)
            .finish_non_exhaustive()
    }
}
