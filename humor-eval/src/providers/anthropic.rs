//! Anthropic (Claude) messages client with image input
//!
//! Reasoned-mode requests can optionally use extended thinking; the returned
//! thinking blocks are folded back into the text as a `<think>` block so the
//! interpreter sees the same shape as from a tag-following model.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use super::prompt::AnswerMode;
use super::traits::{
    health_check_image, retry_after_ms, ProviderError, ProviderResult, VisionModel, VisionRequest,
    VisionResponse,
};
use crate::runner::rate_limiter::RateLimiter;

const DEFAULT_MODEL: &str = "claude-sonnet-4-5-20250929";
const API_VERSION: &str = "2023-06-01";

/// Anthropic API client
pub struct AnthropicClient {
    api_key: String,
    base_url: String,
    http_client: Client,
    rate_limiter: Arc<RateLimiter>,
    default_model: String,
    /// Extended thinking budget for reasoned requests; `None` disables it
    thinking_budget: Option<u32>,
}

impl AnthropicClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: "https://api.anthropic.com/v1".to_string(),
            http_client: Client::new(),
            rate_limiter: Arc::new(RateLimiter::new(60, 100_000)),
            default_model: DEFAULT_MODEL.to_string(),
            thinking_budget: None,
        }
    }

    /// Create from environment variable
    pub fn from_env() -> ProviderResult<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| ProviderError::Config("ANTHROPIC_API_KEY not set".to_string()))?;
        Ok(Self::new(api_key))
    }

    /// Set custom base URL
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set custom rate limits
    pub fn with_rate_limits(mut self, rpm: u32, tpm: u32) -> Self {
        self.rate_limiter = Arc::new(RateLimiter::new(rpm, tpm));
        self
    }

    /// Set default model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Enable extended thinking for reasoned requests
    pub fn with_thinking_budget(mut self, budget: u32) -> Self {
        self.thinking_budget = Some(budget);
        self
    }
}

#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking: Option<ThinkingConfig>,
}

#[derive(Serialize)]
struct ThinkingConfig {
    #[serde(rename = "type")]
    thinking_type: &'static str,
    budget_tokens: u32,
}

#[derive(Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: Vec<RequestBlock>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum RequestBlock {
    Image { source: ImageSource },
    Text { text: String },
}

#[derive(Serialize)]
struct ImageSource {
    #[serde(rename = "type")]
    source_type: &'static str,
    media_type: String,
    data: String,
}

impl AnthropicMessage {
    fn from_request(request: &VisionRequest) -> Self {
        Self {
            role: "user",
            content: vec![
                RequestBlock::Image {
                    source: ImageSource {
                        source_type: "base64",
                        media_type: request.image.media_type.clone(),
                        data: request.image.to_base64(),
                    },
                },
                RequestBlock::Text {
                    text: request.prompt.clone(),
                },
            ],
        }
    }
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
    model: String,
    stop_reason: Option<String>,
    usage: Usage,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
    thinking: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Deserialize)]
struct AnthropicError {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Join text blocks; thinking blocks become a leading `<think>` block
fn assemble_content(blocks: &[ContentBlock]) -> String {
    let thinking: String = blocks
        .iter()
        .filter(|b| b.content_type == "thinking")
        .filter_map(|b| b.thinking.as_deref())
        .collect();
    let text: String = blocks
        .iter()
        .filter(|b| b.content_type == "text")
        .filter_map(|b| b.text.as_deref())
        .collect();

    if thinking.is_empty() {
        text.trim().to_string()
    } else {
        format!("<think>{}</think>{}", thinking.trim(), text.trim())
    }
}

#[async_trait]
impl VisionModel for AnthropicClient {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    async fn complete(&self, request: &VisionRequest) -> ProviderResult<VisionResponse> {
        self.rate_limiter.acquire().await;

        let start = Instant::now();

        // Extended thinking requires temperature to be omitted
        let budget = self
            .thinking_budget
            .filter(|_| request.mode == AnswerMode::Reasoned);
        let (thinking, temperature, max_tokens) = match budget {
            Some(budget) => (
                Some(ThinkingConfig {
                    thinking_type: "enabled",
                    budget_tokens: budget,
                }),
                None,
                request.max_tokens + budget,
            ),
            None => (None, request.temperature, request.max_tokens),
        };

        let body = AnthropicRequest {
            model: request
                .model
                .clone()
                .unwrap_or_else(|| self.default_model.clone()),
            max_tokens,
            messages: vec![AnthropicMessage::from_request(request)],
            temperature,
            thinking,
        };

        let response = self
            .http_client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let latency_ms = start.elapsed().as_millis() as u64;
        let status = response.status();

        if status == 429 {
            return Err(ProviderError::RateLimited {
                retry_after_ms: retry_after_ms(response.headers()),
            });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<AnthropicError>(&body) {
                Ok(error) => error.error.message,
                Err(_) => format!("HTTP {}: {}", status.as_u16(), body),
            };

            if status == 401 || status == 403 {
                return Err(ProviderError::Config(format!(
                    "Anthropic auth error ({}): {}",
                    status.as_u16(),
                    message
                )));
            }

            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let api_response: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        self.rate_limiter
            .record_tokens(api_response.usage.input_tokens + api_response.usage.output_tokens)
            .await;

        Ok(VisionResponse {
            content: assemble_content(&api_response.content),
            model: api_response.model,
            input_tokens: api_response.usage.input_tokens,
            output_tokens: api_response.usage.output_tokens,
            finish_reason: api_response.stop_reason.unwrap_or_else(|| "unknown".to_string()),
            latency_ms,
        })
    }

    fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.rate_limiter
    }

    async fn health_check(&self) -> ProviderResult<bool> {
        let request = VisionRequest::new(health_check_image(), "Reply with A.", 5, AnswerMode::Simple);

        match self.complete(&request).await {
            Ok(_) => Ok(true),
            Err(ProviderError::RateLimited { .. }) => Ok(true),
            Err(_) => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(kind: &str, text: Option<&str>, thinking: Option<&str>) -> ContentBlock {
        ContentBlock {
            content_type: kind.to_string(),
            text: text.map(String::from),
            thinking: thinking.map(String::from),
        }
    }

    #[test]
    fn test_assemble_text_only() {
        let blocks = vec![block("text", Some(" <answer>C</answer> "), None)];
        assert_eq!(assemble_content(&blocks), "<answer>C</answer>");
    }

    #[test]
    fn test_assemble_folds_thinking() {
        let blocks = vec![
            block("thinking", None, Some("the cat is the joke")),
            block("text", Some("<answer>B</answer>"), None),
        ];
        assert_eq!(
            assemble_content(&blocks),
            "<think>the cat is the joke</think><answer>B</answer>"
        );
    }

    #[test]
    fn test_image_block_shape() {
        let request = VisionRequest::new(
            crate::dataset::ImagePayload::new(vec![1, 2, 3], "image/jpeg"),
            "Question",
            16,
            AnswerMode::Simple,
        );
        let json = serde_json::to_value(AnthropicMessage::from_request(&request)).unwrap();
        assert_eq!(json["content"][0]["type"], "image");
        assert_eq!(json["content"][0]["source"]["type"], "base64");
        assert_eq!(json["content"][0]["source"]["media_type"], "image/jpeg");
        assert_eq!(json["content"][0]["source"]["data"], "AQID");
        assert_eq!(json["content"][1]["type"], "text");
    }
}
