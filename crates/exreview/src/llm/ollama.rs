//! Local models served by Ollama; no API key.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::{ReviewError, Result};

use super::http;
use super::provider::{ModelConfig, ProviderKind, ReviewModel};

const DEFAULT_HOST: &str = "http://localhost:11434";

/// Reviews through a local Ollama server (`OLLAMA_HOST`, else localhost).
pub struct OllamaProvider {
    client: Client,
    chat_url: String,
    config: ModelConfig,
}

impl OllamaProvider {
    pub fn new() -> Result<Self> {
        Self::with_config(ModelConfig::for_provider(ProviderKind::Ollama))
    }

    pub fn with_config(config: ModelConfig) -> Result<Self> {
        let host = std::env::var("OLLAMA_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
        Self::at_host(&host, config)
    }

    /// Provider for the server at `host`.
    pub fn at_host(host: &str, config: ModelConfig) -> Result<Self> {
        Ok(Self {
            client: http::client()?,
            chat_url: chat_url(host),
            config,
        })
    }

    fn request_body(&self, prompt: &str) -> Value {
        json!({
            "model": self.config.model(),
            "stream": false,
            "options": {
                "temperature": self.config.temperature,
                "num_predict": self.config.max_tokens
            },
            "messages": [{ "role": "user", "content": prompt }]
        })
    }
}

fn chat_url(host: &str) -> String {
    format!("{}/api/chat", host.trim_end_matches('/'))
}

#[async_trait]
impl ReviewModel for OllamaProvider {
    async fn invoke(&self, prompt: &str) -> Result<String> {
        let request = self.client.post(&self.chat_url);
        let reply: ChatReply = http::post_json(self.name(), request, &self.request_body(prompt))
            .await
            .map_err(|e| match e {
                ReviewError::Model(msg) if msg.contains("not found") => ReviewError::Model(format!(
                    "Model '{}' not found; pull it with `ollama pull {}`",
                    self.config.model(),
                    self.config.model()
                )),
                other => other,
            })?;
        http::non_empty(self.name(), Some(reply.message.content))
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: String,
}
