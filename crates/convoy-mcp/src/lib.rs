//! MCP (Model Context Protocol) client plumbing for Convoy.
//!
//! External tool servers speak JSON-RPC 2.0 with Content-Length framing over
//! stdio. This crate provides the resolved server configuration (with the
//! deterministic identity hash the resource pool keys on), the protocol
//! types, the stdio transport, and a blocking client implementing
//! `initialize`, `tools/list`, and `tools/call`.
//!
//! The client is synchronous by design; async call sites drive it through
//! `tokio::task::spawn_blocking`.

pub mod client;
pub mod config;
pub mod error;
pub mod protocol;
pub mod transport;

pub use client::McpClient;
pub use config::McpServerConfig;
pub use error::{McpError, Result};
pub use protocol::{
    CallToolParams, CallToolResult, InitializeParams, InitializeResult, JsonRpcError,
    JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, ListToolsResult, ServerInfo,
    ToolContent, ToolInfo,
};
pub use transport::StdioTransport;
