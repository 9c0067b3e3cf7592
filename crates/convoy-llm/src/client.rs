//! The [`AiClient`] trait: an instantiated, usable handle to one provider.

use async_trait::async_trait;
use std::sync::Arc;

use convoy_types::AiModel;

use crate::error::Result;
use crate::types::{CompletionRequest, CompletionResponse};

/// An instantiated provider client.
///
/// Exposes its resolved model list and a model-support predicate so the
/// provider registry can answer "which client for this call".
#[async_trait]
pub trait AiClient: Send + Sync {
    /// Provider name this client serves.
    fn name(&self) -> &str;

    /// The resolved model list for this client.
    fn models(&self) -> &[AiModel];

    /// Whether this client can serve the given model name or alias.
    fn supports_model(&self, name_or_alias: &str) -> bool {
        self.models().iter().any(|m| m.matches(name_or_alias))
    }

    /// The model used when the caller names none: first in the resolved list.
    fn default_model(&self) -> Option<&AiModel> {
        self.models().first()
    }

    /// Execute one completion call.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;
}

/// A shareable client handle.
pub type SharedClient = Arc<dyn AiClient>;
