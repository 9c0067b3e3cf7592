//! Multi-provider AI client resolver for Convoy.
//!
//! [`AiClientProvider`] merges layered provider configuration (environment
//! auto-detection, organization, project, user) into one registry,
//! instantiates a concrete [`AiClient`] per provider, and resolves "which
//! client for this call" by optional provider name and model support.
//!
//! Configuration gaps are diagnostics, not failures: a provider without a
//! resolvable API key is recorded as unavailable and initialization
//! continues with reduced capability.

pub mod anthropic;
pub mod client;
pub mod error;
pub mod merge;
pub mod openai;
pub mod provider;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub mod mock;

pub use anthropic::AnthropicClient;
pub use client::{AiClient, SharedClient};
pub use error::{LlmError, Result};
pub use merge::{merge_layers, ConfigLayer, ConfigSource};
pub use openai::OpenAiClient;
pub use provider::{AiClientProvider, ProviderDiagnostic};
pub use types::{
    ChatMessage, ChatRole, CompletionRequest, CompletionResponse, StopReason, ToolCall,
    ToolDefinition, Usage,
};
