//! OpenAI chat completions.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::Result;

use super::http;
use super::provider::{ModelConfig, ProviderKind, ReviewModel};

const COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Reviews through GPT models.
pub struct OpenAIProvider {
    client: Client,
    api_key: String,
    config: ModelConfig,
}

impl OpenAIProvider {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_config(api_key, ModelConfig::for_provider(ProviderKind::OpenAI))
    }

    pub fn with_config(api_key: impl Into<String>, config: ModelConfig) -> Result<Self> {
        Ok(Self {
            client: http::client()?,
            api_key: api_key.into(),
            config,
        })
    }

    /// Read the key from `OPENAI_API_KEY`.
    pub fn from_env(config: ModelConfig) -> Result<Self> {
        Self::with_config(http::api_key("OPENAI_API_KEY")?, config)
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
impl ReviewModel for OpenAIProvider {
    async fn invoke(&self, prompt: &str) -> Result<String> {
        let request = self
            .client
            .post(COMPLETIONS_URL)
            .bearer_auth(&self.api_key);

        let reply: CompletionReply =
            http::post_json(self.name(), request, &self.request_body(prompt)).await?;
        let text = reply
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content);
        http::non_empty(self.name(), text)
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[derive(Debug, Deserialize)]
struct CompletionReply {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}
