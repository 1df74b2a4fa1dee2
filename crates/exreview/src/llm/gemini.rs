//! Google Gemini API provider implementation.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::error::{ReviewError, Result};

use super::http;
use super::provider::{ModelConfig, ProviderKind, ReviewModel};

/// Gemini API base URL.
const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Google Gemini provider.
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    config: ModelConfig,
}

impl GeminiProvider {
    /// Create a new Gemini provider with the given API key.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_config(api_key, ModelConfig::for_provider(ProviderKind::Gemini))
    }

    /// Create a new Gemini provider with custom configuration.
    pub fn with_config(api_key: impl Into<String>, config: ModelConfig) -> Result<Self> {
        Ok(Self {
            client: http::client()?,
            api_key: api_key.into(),
            config,
        })
    }

    /// Create from environment variable.
    pub fn from_env(config: ModelConfig) -> Result<Self> {
        Self::with_config(http::api_key("GEMINI_API_KEY")?, config)
    }

    fn endpoint(&self) -> String {
        format!("{}/{}:generateContent", API_BASE, self.config.model())
    }
}

#[async_trait]
impl ReviewModel for GeminiProvider {
    async fn invoke(&self, prompt: &str) -> Result<String> {
        let body = json!({
            "contents": [
                {
                    "role": "user",
                    "parts": [{ "text": prompt }]
                }
            ],
            "generationConfig": {
                "temperature": self.config.temperature,
                "topP": 0.95,
                "topK": 64,
                "maxOutputTokens": self.config.max_tokens,
                "responseMimeType": "text/plain"
            }
        });

        let request = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key);

        let api_response: GeminiResponse = http::post_json(self.name(), request, &body).await?;
        api_response.text()
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

/// Gemini API response structure.
#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

impl GeminiResponse {
    /// Concatenate the text parts of the first candidate.
    fn text(self) -> Result<String> {
        let text: String = self
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            Err(ReviewError::Model("No text in Gemini response".to_string()))
        } else {
            Ok(text)
        }
    }
}
