//! Review model integration.
//!
//! The pipeline treats the model as an opaque async call: a prompt goes in,
//! text comes out. Providers differ only in how they reach the model.
//!
//! # Supported Providers
//!
//! - **Gemini** - Google models via API (requires `GEMINI_API_KEY`)
//! - **Anthropic** - Claude models via API (requires `ANTHROPIC_API_KEY`)
//! - **OpenAI** - GPT models via API (requires `OPENAI_API_KEY`)
//! - **Ollama** - Local models, no API key needed (requires Ollama running)
//! - **Mock** - Canned responses for tests and dry runs
//!
//! # Example
//!
//! ```no_run
//! use exreview::llm::{connect, ModelConfig, ProviderKind};
//!
//! # async fn example() -> exreview::Result<()> {
//! let model = connect(&ModelConfig::for_provider(ProviderKind::Ollama))?;
//! let reply = model.invoke("Say hello").await?;
//! # Ok(())
//! # }
//! ```

mod anthropic;
mod gemini;
mod http;
mod mock;
mod ollama;
mod openai;
mod prompts;
mod provider;

use std::sync::Arc;

use crate::error::Result;

pub use anthropic::AnthropicProvider;
pub use gemini::GeminiProvider;
pub use mock::MockModel;
pub use ollama::OllamaProvider;
pub use openai::OpenAIProvider;
pub use prompts::{DEFAULT_INSTRUCTIONS, EXERCISE_ID_PLACEHOLDER, PromptBuilder};
pub use provider::{ModelConfig, ProviderKind, ReviewModel};

/// Build the provider selected by `config`.
///
/// API keys are read from the environment.
pub fn connect(config: &ModelConfig) -> Result<Arc<dyn ReviewModel>> {
    let model: Arc<dyn ReviewModel> = match config.provider {
        ProviderKind::Gemini => Arc::new(GeminiProvider::from_env(config.clone())?),
        ProviderKind::Anthropic => Arc::new(AnthropicProvider::from_env(config.clone())?),
        ProviderKind::OpenAI => Arc::new(OpenAIProvider::from_env(config.clone())?),
        ProviderKind::Ollama => Arc::new(OllamaProvider::with_config(config.clone())?),
        ProviderKind::Mock => Arc::new(MockModel::new()),
    };
    Ok(model)
}
