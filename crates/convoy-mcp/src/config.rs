//! Resolved MCP server configuration and its identity hash.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// The resolved configuration of one external tool server.
///
/// Field order matters for [`identity_hash`](Self::identity_hash): the hash
/// is computed over the canonical serialization, so byte-identical resolved
/// configurations hash equal and share one pooled instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpServerConfig {
    /// Unique integration name (e.g. "sqlite", "github").
    pub name: String,
    /// Command to spawn.
    pub command: String,
    /// Arguments to pass to the command.
    #[serde(default)]
    pub args: Vec<String>,
    /// Environment variables to set for the server process.
    #[serde(default)]
    pub env: Vec<(String, String)>,
    /// Whether this server is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Whether the live instance may be shared across conversations.
    ///
    /// When false, the pool key also incorporates the requesting thread id,
    /// forcing one instance per conversation.
    #[serde(default = "default_true")]
    pub share: bool,
    /// Allow-listed tool names for this integration; `None` means all.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_tools: Option<Vec<String>>,
}

fn default_true() -> bool {
    true
}

impl McpServerConfig {
    /// Create a config for a stdio server.
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args: Vec::new(),
            env: Vec::new(),
            enabled: true,
            share: true,
            allowed_tools: None,
        }
    }

    /// Add an argument.
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Set all arguments.
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Add an environment variable.
    pub fn with_env_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Restrict the tools exposed by this integration.
    pub fn with_allowed_tools(mut self, tools: Vec<String>) -> Self {
        self.allowed_tools = Some(tools);
        self
    }

    /// Mark the instance as private to each conversation.
    pub fn no_share(mut self) -> Self {
        self.share = false;
        self
    }

    /// Deterministic identity of this resolved configuration.
    ///
    /// SHA-256 over the canonical JSON serialization. Two byte-identical
    /// resolved configs always hash equal, regardless of requesting thread.
    pub fn identity_hash(&self) -> String {
        let canonical = serde_json::to_string(self).unwrap_or_default();
        let digest = Sha256::digest(canonical.as_bytes());
        hex_encode(&digest)
    }

    /// The pool key for a request from `thread_id`.
    ///
    /// Shared servers key on configuration identity alone; no-share servers
    /// mix in the thread id so every conversation gets its own instance.
    pub fn pool_key(&self, thread_id: &str) -> String {
        if self.share {
            self.identity_hash()
        } else {
            format!("{}:{}", self.identity_hash(), thread_id)
        }
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
