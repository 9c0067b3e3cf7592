//! Blocking MCP client for one server connection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use serde_json::Value;

use crate::config::McpServerConfig;
use crate::error::{McpError, Result};
use crate::protocol::{
    CallToolParams, CallToolResult, InitializeParams, InitializeResult, JsonRpcNotification,
    JsonRpcRequest, ListToolsResult, ServerInfo, ToolInfo,
};
use crate::transport::StdioTransport;

/// An MCP client connected to a single server.
///
/// Methods are `&self` and internally serialized on the transport lock, so a
/// connected client can be shared behind an `Arc` across conversations —
/// which is exactly what the resource pool does.
pub struct McpClient {
    config: McpServerConfig,
    transport: Mutex<StdioTransport>,
    server_info: Option<ServerInfo>,
    request_id: AtomicU64,
    initialized: bool,
}

impl McpClient {
    /// Spawn the server process. Does not perform the handshake; call
    /// [`initialize`](Self::initialize) next.
    pub fn connect(config: McpServerConfig) -> Result<Self> {
        let transport = StdioTransport::spawn(&config.command, &config.args, &config.env)?;
        tracing::info!(
            server = %config.name,
            command = %config.command,
            "connected to MCP server"
        );
        Ok(Self {
            config,
            transport: Mutex::new(transport),
            server_info: None,
            request_id: AtomicU64::new(1),
            initialized: false,
        })
    }

    /// The integration name this client serves.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// The configuration this client was built from.
    pub fn config(&self) -> &McpServerConfig {
        &self.config
    }

    /// Server info, once initialized.
    pub fn server_info(&self) -> Option<&ServerInfo> {
        self.server_info.as_ref()
    }

    fn next_request_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::SeqCst)
    }

    fn send_request(&self, method: &str, params: Option<Value>) -> Result<Value> {
        let request = JsonRpcRequest::new(self.next_request_id(), method, params);
        let mut transport = self
            .transport
            .lock()
            .map_err(|_| McpError::protocol("transport lock poisoned"))?;
        let response = transport.send_request(&request)?;
        response.into_result().map_err(|e| McpError::Server {
            code: e.code,
            message: e.message,
        })
    }

    fn send_notification(&self, method: &str, params: Option<Value>) -> Result<()> {
        let notification = JsonRpcNotification::new(method, params);
        let mut transport = self
            .transport
            .lock()
            .map_err(|_| McpError::protocol("transport lock poisoned"))?;
        transport.send_notification(&notification)
    }

    /// Perform the MCP handshake. Must run before any other method.
    pub fn initialize(&mut self) -> Result<&ServerInfo> {
        if self.initialized {
            return self.server_info.as_ref().ok_or(McpError::NotInitialized);
        }

        let params = InitializeParams::default();
        let result = self.send_request("initialize", Some(serde_json::to_value(&params)?))?;
        let init: InitializeResult = serde_json::from_value(result)?;

        tracing::info!(
            server = %init.server_info.name,
            version = %init.server_info.version,
            protocol = %init.protocol_version,
            "MCP server initialized"
        );

        self.send_notification("notifications/initialized", None)?;
        self.server_info = Some(init.server_info);
        self.initialized = true;
        self.server_info.as_ref().ok_or(McpError::NotInitialized)
    }

    /// List the tools the server advertises.
    pub fn list_tools(&self) -> Result<Vec<ToolInfo>> {
        if !self.initialized {
            return Err(McpError::NotInitialized);
        }
        let result = self.send_request("tools/list", None)?;
        let list: ListToolsResult = serde_json::from_value(result)?;
        tracing::debug!(
            server = %self.config.name,
            tools = list.tools.len(),
            "listed MCP tools"
        );
        Ok(list.tools)
    }

    /// Invoke a tool on the server.
    pub fn call_tool(&self, name: &str, arguments: Option<Value>) -> Result<CallToolResult> {
        if !self.initialized {
            return Err(McpError::NotInitialized);
        }
        let params = CallToolParams {
            name: name.to_string(),
            arguments,
        };
        let result = self.send_request("tools/call", Some(serde_json::to_value(&params)?))?;
        let call: CallToolResult = serde_json::from_value(result)?;
        if call.is_error() {
            tracing::warn!(server = %self.config.name, tool = %name, "tool call returned error");
        }
        Ok(call)
    }

    /// Kill the server process.
    pub fn shutdown(&self) -> Result<()> {
        tracing::info!(server = %self.config.name, "shutting down MCP client");
        let mut transport = self
            .transport
            .lock()
            .map_err(|_| McpError::protocol("transport lock poisoned"))?;
        transport.shutdown()
    }
}

impl std::fmt::Debug for McpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpClient")
            .field("server", &self.config.name)
            .field("initialized", &self.initialized)
            .finish_non_exhaustive()
    }
}
