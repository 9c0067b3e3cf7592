//! Error types for the MCP crate.

use thiserror::Error;

/// Errors from MCP configuration, transport, and protocol handling.
#[derive(Debug, Error)]
pub enum McpError {
    /// Failed to spawn the server process.
    #[error("failed to spawn MCP server: {0}")]
    SpawnFailed(String),

    /// Transport-level I/O failure.
    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),

    /// The server closed the connection.
    #[error("MCP server closed the connection")]
    ConnectionClosed,

    /// Malformed framing or JSON.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The server returned a JSON-RPC error.
    #[error("server error {code}: {message}")]
    Server {
        /// JSON-RPC error code.
        code: i64,
        /// Error message from the server.
        message: String,
    },

    /// A method was called before `initialize`.
    #[error("MCP client not initialized")]
    NotInitialized,

    /// Serialization failure.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl McpError {
    /// Create a protocol error.
    pub fn protocol(message: impl Into<String>) -> Self {
        McpError::Protocol(message.into())
    }

    /// Create a spawn-failed error.
    pub fn spawn_failed(message: impl Into<String>) -> Self {
        McpError::SpawnFailed(message.into())
    }
}

/// Result alias for MCP operations.
pub type Result<T> = std::result::Result<T, McpError>;
