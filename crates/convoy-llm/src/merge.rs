//! Layered provider-configuration merge.
//!
//! Configuration arrives in layers of increasing priority: environment
//! auto-detection, organization, project, user. Merging walks the layers
//! low to high; a provider name not yet seen is inserted (insertion order is
//! later the resolution priority), an already-present provider merges model
//! lists by alias-or-name and shallow-merges price fields, higher layers
//! winning field by field.

use std::env;

use convoy_types::{AiModel, AiProviderConfig};

/// Where a configuration layer came from, in increasing priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigSource {
    /// Auto-detected from environment variables (lowest priority).
    EnvDetected,
    /// Organization-wide configuration.
    Organization,
    /// Project configuration.
    Project,
    /// User configuration (highest priority).
    User,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConfigSource::EnvDetected => "env",
            ConfigSource::Organization => "organization",
            ConfigSource::Project => "project",
            ConfigSource::User => "user",
        };
        write!(f, "{s}")
    }
}

/// One configuration layer.
#[derive(Debug, Clone)]
pub struct ConfigLayer {
    /// Layer origin (determines merge priority).
    pub source: ConfigSource,
    /// Providers defined by this layer.
    pub providers: Vec<AiProviderConfig>,
}

impl ConfigLayer {
    /// Create a layer.
    pub fn new(source: ConfigSource, providers: Vec<AiProviderConfig>) -> Self {
        Self { source, providers }
    }

    /// Build the lowest-priority layer from well-known environment variables.
    ///
    /// A detected provider carries no explicit model list, so the concrete
    /// client falls back to its built-in defaults.
    pub fn detect_env() -> Self {
        let mut providers = Vec::new();

        if env::var("ANTHROPIC_API_KEY").is_ok_and(|v| !v.is_empty()) {
            tracing::debug!(provider = "anthropic", "detected API key in environment");
            providers.push(AiProviderConfig::new("anthropic").auto_detected());
        }
        if env::var("OPENAI_API_KEY").is_ok_and(|v| !v.is_empty()) {
            tracing::debug!(provider = "openai", "detected API key in environment");
            providers.push(AiProviderConfig::new("openai").auto_detected());
        }

        Self::new(ConfigSource::EnvDetected, providers)
    }
}

/// Merge layers into one provider list, lowest priority first.
///
/// Layers are sorted by source priority before merging, so callers may pass
/// them in any order. Output order is first-seen order, which doubles as the
/// client resolution priority.
pub fn merge_layers(mut layers: Vec<ConfigLayer>) -> Vec<AiProviderConfig> {
    layers.sort_by_key(|l| l.source);

    let mut merged: Vec<AiProviderConfig> = Vec::new();
    for layer in layers {
        for provider in layer.providers {
            match merged.iter_mut().find(|p| p.name == provider.name) {
                None => merged.push(provider),
                Some(existing) => merge_provider(existing, provider),
            }
        }
    }
    merged
}

/// Merge a higher-priority provider definition over an existing one.
fn merge_provider(base: &mut AiProviderConfig, over: AiProviderConfig) {
    if over.api_key.is_some() {
        base.api_key = over.api_key;
    }
    if over.url.is_some() {
        base.url = over.url;
    }
    // An explicitly configured provider sheds the auto-detected flag.
    if !over.auto_detected {
        base.auto_detected = false;
    }
    for model in over.models {
        match base.models.iter_mut().find(|m| m.same_identity(&model)) {
            None => base.models.push(model),
            Some(existing) => merge_model(existing, model),
        }
    }
}

/// Merge a higher-priority model definition over an existing one.
///
/// Price sub-fields shallow-merge: a field the override omits keeps the
/// prior layer's value.
fn merge_model(base: &mut AiModel, over: AiModel) {
    if over.alias.is_some() {
        base.alias = over.alias;
    }
    if over.context_window != 0 {
        base.context_window = over.context_window;
    }
    if over.temperature.is_some() {
        base.temperature = over.temperature;
    }
    base.price = base.price.merged_with(&over.price);
}
