//! OpenAI-compatible chat completions client for invoice extraction.

use std::time::Duration;

use anyhow::{anyhow, Context};
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use invex_core::{ModelConfig, ModelInput};

use crate::prompts::{text_instruction, IMAGE_INSTRUCTION, SYSTEM_PROMPT};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    max_completion_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: Content,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Content {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Encode image bytes as a base64 data URL.
pub fn data_url(mime: &str, data: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        mime,
        base64::engine::general_purpose::STANDARD.encode(data)
    )
}

/// Chat completions client configured from [`ModelConfig`].
pub struct ModelClient {
    http: reqwest::Client,
    config: ModelConfig,
    api_key: String,
}

impl ModelClient {
    /// Build a client, reading the API key from the configured environment variable.
    pub fn from_env(config: &ModelConfig) -> anyhow::Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| anyhow!("{} is not set", config.api_key_env))?;
        Self::new(config, api_key)
    }

    pub fn new(config: &ModelConfig, api_key: impl Into<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            http,
            config: config.clone(),
            api_key: api_key.into(),
        })
    }

    /// Send the document to the primary model, falling back once on failure.
    ///
    /// Returns the raw response text, unparsed.
    pub async fn extract(&self, input: &ModelInput) -> anyhow::Result<String> {
        info!("Requesting extraction for {}", input.describe());

        match self.complete(&self.config.primary_model, input).await {
            Ok(raw) => Ok(raw),
            Err(e) => match self.config.fallback() {
                Some(fallback) => {
                    warn!(
                        "Model {} failed ({}), retrying with {}",
                        self.config.primary_model, e, fallback
                    );
                    self.complete(fallback, input).await
                }
                None => Err(e),
            },
        }
    }

    async fn complete(&self, model: &str, input: &ModelInput) -> anyhow::Result<String> {
        let request = build_request(model, input, &self.config);
        let url = format!("{}/chat/completions", self.config.api_base.trim_end_matches('/'));
        debug!("POST {} (model {})", url, model);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .with_context(|| format!("request to {} failed", url))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("model API error {}: {}", status, body));
        }

        let body: ChatResponse = response.json().await.context("malformed model API response")?;
        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| anyhow!("model returned no content"))
    }
}

fn build_request<'a>(model: &'a str, input: &ModelInput, config: &ModelConfig) -> ChatRequest<'a> {
    let user = match input {
        ModelInput::Image { mime, data } => Content::Parts(vec![
            ContentPart::Text {
                text: IMAGE_INSTRUCTION.to_string(),
            },
            ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: data_url(mime, data),
                },
            },
        ]),
        ModelInput::Text(text) => Content::Text(text_instruction(text)),
    };

    ChatRequest {
        model,
        messages: vec![
            Message {
                role: "system",
                content: Content::Text(SYSTEM_PROMPT.to_string()),
            },
            Message {
                role: "user",
                content: user,
            },
        ],
        max_completion_tokens: config.max_completion_tokens,
        temperature: config.temperature,
    }
}
