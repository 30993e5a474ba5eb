//! Vision model provider implementations

pub mod anthropic;
pub mod openai;
pub mod prompt;
pub mod traits;

pub use anthropic::AnthropicClient;
pub use openai::OpenAIClient;
pub use prompt::{build_prompt, AnswerMode};
pub use traits::{ProviderError, ProviderResult, VisionModel, VisionRequest, VisionResponse};

use crate::config::ProviderSettings;
use std::sync::Arc;

/// Create the configured provider.
///
/// An OpenAI-compatible provider with a custom `base_url` does not need an
/// API key; everything else reads its key from the environment.
pub fn create_provider(settings: &ProviderSettings) -> ProviderResult<Arc<dyn VisionModel>> {
    match settings.name.to_lowercase().as_str() {
        "openai" | "gpt" | "vllm" => {
            let client = match (&settings.base_url, OpenAIClient::from_env()) {
                (_, Ok(client)) => client,
                (Some(_), Err(_)) => OpenAIClient::new(None),
                (None, Err(e)) => return Err(e),
            };
            let mut client = client
                .with_rate_limits(settings.rpm, settings.tpm)
                .with_model(&settings.model);
            if let Some(url) = &settings.base_url {
                client = client.with_base_url(url);
            }
            Ok(Arc::new(client))
        }
        "anthropic" | "claude" => {
            let mut client = AnthropicClient::from_env()?
                .with_rate_limits(settings.rpm, settings.tpm)
                .with_model(&settings.model);
            if let Some(url) = &settings.base_url {
                client = client.with_base_url(url);
            }
            if let Some(budget) = settings.thinking_budget {
                client = client.with_thinking_budget(budget);
            }
            Ok(Arc::new(client))
        }
        _ => Err(ProviderError::Config(format!("Unknown provider: {}", settings.name))),
    }
}
