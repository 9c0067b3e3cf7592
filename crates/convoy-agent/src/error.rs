//! Error types for the agent crate.

use thiserror::Error;

/// Result type alias using the agent error type.
pub type Result<T> = std::result::Result<T, AgentError>;

/// Error type for agent operations.
#[derive(Debug, Error)]
pub enum AgentError {
    /// LLM backend error.
    #[error("LLM error: {0}")]
    Llm(#[from] convoy_llm::LlmError),

    /// Thread model error.
    #[error("thread error: {0}")]
    Thread(#[from] convoy_thread::ThreadError),

    /// Tool server error.
    #[error("MCP error: {0}")]
    Mcp(#[from] convoy_mcp::McpError),

    /// Tool execution error.
    #[error("tool error: {0}")]
    Tool(String),

    /// Tool not found in the assembled tool set.
    #[error("tool not found: {0}")]
    ToolNotFound(String),

    /// Delegation depth is exhausted; no further sub-contexts allowed.
    #[error("delegation depth exhausted")]
    DelegationDepthExhausted,

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AgentError {
    /// Create a tool error.
    pub fn tool(msg: impl Into<String>) -> Self {
        Self::Tool(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AgentError::tool("server unreachable");
        assert!(err.to_string().contains("tool error"));
        assert!(err.to_string().contains("server unreachable"));
    }

    #[test]
    fn test_mcp_error_conversion() {
        let err: AgentError = convoy_mcp::McpError::NotInitialized.into();
        assert!(matches!(err, AgentError::Mcp(_)));
    }
}
