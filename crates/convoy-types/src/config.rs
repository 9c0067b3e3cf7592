//! Provider and model configuration types.
//!
//! These are the resolved shapes the runtime consumes. Loading them from
//! YAML/JSON files is the responsibility of the configuration layer outside
//! this workspace; the core never reads files directly.

use serde::{Deserialize, Serialize};

/// Per-million-token pricing for a model.
///
/// Every field is optional so that layered configuration can override a
/// single price without restating the others.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelPrice {
    /// Price per million input tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_mtoken: Option<f64>,
    /// Price per million output tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_mtoken: Option<f64>,
    /// Price per million cache-write tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_write_mtoken: Option<f64>,
    /// Price per million cache-read tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_read_mtoken: Option<f64>,
}

impl ModelPrice {
    /// Shallow-merge `override_price` over `self`, field by field.
    ///
    /// A field the override leaves unset keeps the prior value.
    pub fn merged_with(&self, override_price: &ModelPrice) -> ModelPrice {
        ModelPrice {
            input_mtoken: override_price.input_mtoken.or(self.input_mtoken),
            output_mtoken: override_price.output_mtoken.or(self.output_mtoken),
            cache_write_mtoken: override_price
                .cache_write_mtoken
                .or(self.cache_write_mtoken),
            cache_read_mtoken: override_price.cache_read_mtoken.or(self.cache_read_mtoken),
        }
    }
}

/// One model offered by a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiModel {
    /// Canonical model name (what the provider API expects).
    pub name: String,
    /// Optional short alias users may refer to the model by.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    /// Context window size in tokens.
    pub context_window: u32,
    /// Default sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Token pricing.
    #[serde(default)]
    pub price: ModelPrice,
}

impl AiModel {
    /// Create a model with just a name and context window.
    pub fn new(name: impl Into<String>, context_window: u32) -> Self {
        Self {
            name: name.into(),
            alias: None,
            context_window,
            temperature: None,
            price: ModelPrice::default(),
        }
    }

    /// Set the alias.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Set the pricing.
    pub fn with_price(mut self, price: ModelPrice) -> Self {
        self.price = price;
        self
    }

    /// Models are identity-matched by alias-or-name.
    pub fn matches(&self, name_or_alias: &str) -> bool {
        self.name == name_or_alias || self.alias.as_deref() == Some(name_or_alias)
    }

    /// True if `other` refers to the same model (alias-or-name overlap).
    pub fn same_identity(&self, other: &AiModel) -> bool {
        self.matches(&other.name)
            || other.matches(&self.name)
            || (self.alias.is_some() && self.alias == other.alias)
    }
}

/// Configuration for one LLM provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiProviderConfig {
    /// Provider name (e.g. "anthropic", "openai").
    pub name: String,
    /// API key, if configured. An environment variable override wins at
    /// instantiation time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Base URL override for OpenAI-compatible endpoints.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Models offered by this provider.
    #[serde(default)]
    pub models: Vec<AiModel>,
    /// True when this entry was synthesized from environment detection
    /// rather than explicit configuration.
    #[serde(default)]
    pub auto_detected: bool,
}

impl AiProviderConfig {
    /// Create an empty provider config.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            api_key: None,
            url: None,
            models: Vec::new(),
            auto_detected: false,
        }
    }

    /// Set the API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the base URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Add a model.
    pub fn with_model(mut self, model: AiModel) -> Self {
        self.models.push(model);
        self
    }

    /// Mark as auto-detected from the environment.
    pub fn auto_detected(mut self) -> Self {
        self.auto_detected = true;
        self
    }
}
