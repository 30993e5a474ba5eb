//! Provider trait definitions for vision model clients

use async_trait::async_trait;
use std::sync::Arc;

use super::prompt::AnswerMode;
use crate::dataset::ImagePayload;
use crate::runner::rate_limiter::RateLimiter;

/// One image plus one text prompt, sent as a single user turn
#[derive(Debug, Clone)]
pub struct VisionRequest {
    pub model: Option<String>,
    pub image: ImagePayload,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
    pub mode: AnswerMode,
}

impl VisionRequest {
    pub fn new(image: ImagePayload, prompt: impl Into<String>, max_tokens: u32, mode: AnswerMode) -> Self {
        Self {
            model: None,
            image,
            prompt: prompt.into(),
            max_tokens,
            temperature: None,
            mode,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }
}

/// Response from a vision model
#[derive(Debug, Clone)]
pub struct VisionResponse {
    /// Generated text, trimmed
    pub content: String,
    pub model: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub finish_reason: String,
    pub latency_ms: u64,
}

/// Error types for provider operations
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Rate limited: retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("Timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ProviderError {
    /// Auth, quota and configuration problems will not improve on retry
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ProviderError::Config(_))
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Trait for chat-style vision models: image + prompt in, free text out
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Get the provider name (e.g., "openai", "anthropic")
    fn name(&self) -> &str;

    /// Get the model used when a request does not name one
    fn default_model(&self) -> &str;

    /// Send a completion request
    async fn complete(&self, request: &VisionRequest) -> ProviderResult<VisionResponse>;

    /// Get the rate limiter for this provider
    fn rate_limiter(&self) -> &Arc<RateLimiter>;

    /// Check if the provider is healthy/accessible
    async fn health_check(&self) -> ProviderResult<bool>;
}

/// Retry-After header in seconds, defaulting to a minute
pub(crate) fn retry_after_ms(headers: &reqwest::header::HeaderMap) -> u64 {
    headers
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .unwrap_or(60)
        * 1000
}

/// A 1x1 PNG used by health checks
pub(crate) fn health_check_image() -> ImagePayload {
    const PIXEL: &[u8] = &[
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
        0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
        0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0xF8,
        0xCF, 0xC0, 0xF0, 0x1F, 0x00, 0x05, 0x00, 0x01, 0xFF, 0x89, 0x99, 0x3D, 0x1D, 0x00, 0x00,
        0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
    ];
    ImagePayload::new(PIXEL.to_vec(), "image/png")
}
