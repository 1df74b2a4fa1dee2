//! Review model trait and configuration.

use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{ReviewError, Result};

/// Which backend serves the review model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Google Gemini API (requires `GEMINI_API_KEY`).
    #[default]
    Gemini,
    /// Anthropic Claude API (requires `ANTHROPIC_API_KEY`).
    Anthropic,
    /// OpenAI API (requires `OPENAI_API_KEY`).
    #[serde(rename = "openai")]
    OpenAI,
    /// Ollama local models (honours `OLLAMA_HOST`).
    Ollama,
    /// Canned responses, no network.
    Mock,
}

impl ProviderKind {
    /// Model used when none is configured.
    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini-2.0-flash",
            ProviderKind::Anthropic => "claude-sonnet-4-20250514",
            ProviderKind::OpenAI => "gpt-4o",
            ProviderKind::Ollama => "llama3.2",
            ProviderKind::Mock => "mock",
        }
    }
}

impl FromStr for ProviderKind {
    type Err = ReviewError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "gemini" | "google" => Ok(ProviderKind::Gemini),
            "anthropic" | "claude" => Ok(ProviderKind::Anthropic),
            "openai" | "gpt" => Ok(ProviderKind::OpenAI),
            "ollama" | "local" => Ok(ProviderKind::Ollama),
            "mock" | "test" => Ok(ProviderKind::Mock),
            _ => Err(ReviewError::Config(format!(
                "Unknown provider: {}. Use: gemini, anthropic, openai, ollama, or mock.",
                s
            ))),
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::Gemini => write!(f, "gemini"),
            ProviderKind::Anthropic => write!(f, "anthropic"),
            ProviderKind::OpenAI => write!(f, "openai"),
            ProviderKind::Ollama => write!(f, "ollama"),
            ProviderKind::Mock => write!(f, "mock"),
        }
    }
}

/// Configuration for review model providers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Backend to call.
    pub provider: ProviderKind,

    /// Model to use; the provider's default when unset.
    pub name: Option<String>,

    /// Maximum tokens in response.
    pub max_tokens: usize,

    /// Temperature for generation.
    pub temperature: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Gemini,
            name: None,
            max_tokens: 8192,
            temperature: 1.0,
        }
    }
}

impl ModelConfig {
    /// Configuration for the given provider with its default model.
    pub fn for_provider(provider: ProviderKind) -> Self {
        Self {
            provider,
            ..Default::default()
        }
    }

    /// Resolved model identifier.
    pub fn model(&self) -> &str {
        self.name
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model())
    }
}

/// Trait for the external review model.
///
/// One call is one attempt: implementations must not retry, and any
/// transport, quota or decoding failure is returned as an error.
#[async_trait]
pub trait ReviewModel: Send + Sync {
    /// Send a prompt and return the model's text response.
    async fn invoke(&self, prompt: &str) -> Result<String>;

    /// Get the name of this provider (for logging/debugging).
    fn name(&self) -> &str;
}
