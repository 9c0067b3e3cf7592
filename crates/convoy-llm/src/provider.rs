//! The AiClientProvider: merged configuration to usable client registry.

use std::sync::Arc;

use convoy_types::AiProviderConfig;

use crate::anthropic::AnthropicClient;
use crate::client::SharedClient;
use crate::merge::{merge_layers, ConfigLayer};
use crate::openai::OpenAiClient;

/// A non-fatal note about a provider that could not be instantiated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderDiagnostic {
    /// Provider name.
    pub provider: String,
    /// Why it is unavailable.
    pub reason: String,
}

/// Resolves "which client for this call" over a merged provider registry.
///
/// Initialized once per conversation session from layered configuration.
/// Missing API keys degrade to diagnostics, never abort initialization.
pub struct AiClientProvider {
    /// Merged configuration, in priority-insertion order. Retained across
    /// [`cleanup`](Self::cleanup) so a new conversation in the same session
    /// re-instantiates cheaply.
    merged: Vec<AiProviderConfig>,
    /// Instantiated clients, same order as `merged` (minus unavailable ones).
    clients: Vec<SharedClient>,
    /// Providers configured but unavailable.
    diagnostics: Vec<ProviderDiagnostic>,
    initialized: bool,
}

impl AiClientProvider {
    /// Create an empty, uninitialized provider.
    pub fn new() -> Self {
        Self {
            merged: Vec::new(),
            clients: Vec::new(),
            diagnostics: Vec::new(),
            initialized: false,
        }
    }

    /// Build the registry from configuration layers. Idempotent: subsequent
    /// calls are no-ops until [`cleanup`](Self::cleanup) or
    /// [`kill`](Self::kill).
    ///
    /// After `cleanup`, calling `init` with no layers re-instantiates from
    /// the retained merged configuration.
    pub fn init(&mut self, layers: Vec<ConfigLayer>) {
        if self.initialized {
            return;
        }
        if !layers.is_empty() {
            self.merged = merge_layers(layers);
        }
        self.instantiate();
        self.initialized = true;
    }

    /// Instantiate one client per merged provider.
    fn instantiate(&mut self) {
        self.clients.clear();
        self.diagnostics.clear();

        for config in &self.merged {
            let api_key = resolve_api_key(config);
            let Some(api_key) = api_key else {
                tracing::warn!(
                    provider = %config.name,
                    "provider configured but unavailable: no API key"
                );
                self.diagnostics.push(ProviderDiagnostic {
                    provider: config.name.clone(),
                    reason: "no API key resolved (env or config)".to_string(),
                });
                continue;
            };

            let client: SharedClient = match config.name.as_str() {
                "anthropic" => Arc::new(AnthropicClient::new(config, api_key)),
                // Everything else speaks the OpenAI-compatible surface,
                // with the configured base URL when present.
                _ => Arc::new(OpenAiClient::new(config, api_key)),
            };

            tracing::info!(
                provider = %config.name,
                models = client.models().len(),
                auto_detected = config.auto_detected,
                "provider client instantiated"
            );
            self.clients.push(client);
        }
    }

    /// Resolve a client by optional provider name and optional model.
    ///
    /// Filters instantiated clients by exact provider-name match (when
    /// given) and by model support (when given), returning the first match
    /// in priority-insertion order. `None` means "no provider available for
    /// X" — a user-facing condition, not a crash.
    pub fn get_client(
        &self,
        provider_name: Option<&str>,
        model_name_or_alias: Option<&str>,
    ) -> Option<SharedClient> {
        self.clients
            .iter()
            .find(|client| {
                if let Some(name) = provider_name {
                    if client.name() != name {
                        return false;
                    }
                }
                if let Some(model) = model_name_or_alias {
                    if !client.supports_model(model) {
                        return false;
                    }
                }
                true
            })
            .cloned()
    }

    /// Register a pre-built client at the end of the resolution order.
    ///
    /// Bypasses configuration merge and API-key resolution; used for
    /// embedding custom [`AiClient`](crate::AiClient) implementations.
    pub fn register_client(&mut self, client: SharedClient) {
        tracing::debug!(provider = %client.name(), "registered external client");
        self.clients.push(client);
    }

    /// All instantiated clients, in resolution priority order.
    pub fn clients(&self) -> &[SharedClient] {
        &self.clients
    }

    /// The merged configuration entry for a provider, if any.
    pub fn config(&self, provider_name: &str) -> Option<&AiProviderConfig> {
        self.merged.iter().find(|c| c.name == provider_name)
    }

    /// Diagnostics for providers that could not be instantiated.
    pub fn diagnostics(&self) -> &[ProviderDiagnostic] {
        &self.diagnostics
    }

    /// True once [`init`](Self::init) has run.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Dispose live client handles, retaining the merged configuration.
    ///
    /// Cheap to re-instantiate for a new conversation in the same session.
    pub fn cleanup(&mut self) {
        tracing::debug!(clients = self.clients.len(), "dropping provider clients");
        self.clients.clear();
        self.initialized = false;
    }

    /// Full reset: discard clients and configuration.
    pub fn kill(&mut self) {
        self.cleanup();
        self.merged.clear();
        self.diagnostics.clear();
    }
}

impl Default for AiClientProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AiClientProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiClientProvider")
            .field(
                "providers",
                &self.merged.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
            )
            .field(
                "instantiated",
                &self.clients.iter().map(|c| c.name()).collect::<Vec<_>>(),
            )
            .field("diagnostics", &self.diagnostics.len())
            .finish()
    }
}

/// Resolve the API key for a provider: environment override wins over the
/// configured key.
fn resolve_api_key(config: &AiProviderConfig) -> Option<String> {
    let env_var = format!("{}_API_KEY", config.name.to_uppercase().replace('-', "_"));
    match std::env::var(&env_var) {
        Ok(v) if !v.is_empty() => Some(v),
        _ => config.api_key.clone(),
    }
}
