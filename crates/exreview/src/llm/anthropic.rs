//! Anthropic Messages API.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::Result;

use super::http;
use super::provider::{ModelConfig, ProviderKind, ReviewModel};

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Reviews through Claude models.
pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    config: ModelConfig,
}

impl AnthropicProvider {
    /// Provider with the default Claude model.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_config(api_key, ModelConfig::for_provider(ProviderKind::Anthropic))
    }

    pub fn with_config(api_key: impl Into<String>, config: ModelConfig) -> Result<Self> {
        Ok(Self {
            client: http::client()?,
            api_key: api_key.into(),
            config,
        })
    }

    /// Read the key from `ANTHROPIC_API_KEY`.
    pub fn from_env(config: ModelConfig) -> Result<Self> {
        Self::with_config(http::api_key("ANTHROPIC_API_KEY")?, config)
    }

    fn request_body(&self, prompt: &str) -> Value {
        json!({
            "model": self.config.model(),
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "messages": [{ "role": "user", "content": prompt }]
        })
    }
}

#[async_trait]
impl ReviewModel for AnthropicProvider {
    async fn invoke(&self, prompt: &str) -> Result<String> {
        let request = self
            .client
            .post(MESSAGES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION);

        let reply: MessagesReply =
            http::post_json(self.name(), request, &self.request_body(prompt)).await?;
        http::non_empty(self.name(), Some(reply.text()))
    }

    fn name(&self) -> &str {
        "anthropic"
    }
}

#[derive(Debug, Deserialize)]
struct MessagesReply {
    #[serde(default)]
    content: Vec<Block>,
}

#[derive(Debug, Deserialize)]
struct Block {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

impl MessagesReply {
    /// Concatenated text blocks; tool and thinking blocks are skipped.
    fn text(self) -> String {
        self.content
            .into_iter()
            .filter(|b| b.kind == "text")
            .filter_map(|b| b.text)
            .collect()
    }
}
