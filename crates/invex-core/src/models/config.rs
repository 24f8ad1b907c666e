//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};

use super::invoice::DEFAULT_CURRENCY;

/// Main configuration for the invex pipeline.
///
/// Loaded once by the caller and passed down explicitly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InvexConfig {
    /// Model endpoint configuration.
    pub model: ModelConfig,

    /// Normalization policy.
    pub normalize: NormalizeOptions,

    /// Input document handling.
    pub document: DocumentConfig,
}

/// Model endpoint configuration (OpenAI-compatible chat completions).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Base URL of the API, without the `/chat/completions` suffix.
    pub api_base: String,

    /// Name of the environment variable holding the API key.
    pub api_key_env: String,

    /// Vision-capable model used first.
    pub primary_model: String,

    /// Model tried once when the primary call fails (empty or equal to primary = none).
    pub fallback_model: String,

    /// Upper bound on generated tokens.
    pub max_completion_tokens: u32,

    /// Sampling temperature.
    pub temperature: f32,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            primary_model: "gpt-4.1".to_string(),
            fallback_model: "gpt-4o".to_string(),
            max_completion_tokens: 4000,
            temperature: 0.0,
            timeout_secs: 120,
        }
    }
}

impl ModelConfig {
    /// Fallback model, if one distinct from the primary is configured.
    pub fn fallback(&self) -> Option<&str> {
        let fallback = self.fallback_model.trim();
        if fallback.is_empty() || fallback == self.primary_model {
            None
        } else {
            Some(fallback)
        }
    }
}

/// What to do with a line item whose fields cannot be coerced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemPolicy {
    /// The first malformed item fails the whole invoice.
    #[default]
    FailFast,
    /// Malformed items are dropped and reported.
    SkipInvalid,
}

/// Normalization options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeOptions {
    /// Policy for malformed line items.
    pub item_policy: ItemPolicy,

    /// Currency substituted when the model provides none.
    pub default_currency: String,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            item_policy: ItemPolicy::FailFast,
            default_currency: DEFAULT_CURRENCY.to_string(),
        }
    }
}

impl NormalizeOptions {
    pub fn with_item_policy(mut self, policy: ItemPolicy) -> Self {
        self.item_policy = policy;
        self
    }

    pub fn with_default_currency(mut self, currency: impl Into<String>) -> Self {
        self.default_currency = currency.into();
        self
    }
}

/// Input document handling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    /// Maximum accepted input size in bytes (0 = unlimited).
    pub max_bytes: usize,

    /// Minimum embedded text length for a PDF to be usable.
    pub min_pdf_text_length: usize,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            max_bytes: 20 * 1024 * 1024,
            min_pdf_text_length: 20,
        }
    }
}

impl InvexConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }
}
