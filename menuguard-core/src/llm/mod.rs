//! Generative text-classifier client abstraction.
//!
//! The safety classifier delegates judgment to an external generative
//! model. This module provides a trait-based abstraction over providers
//! (Claude, plus a fake for tests) so prompt construction and response
//! parsing can be exercised without a live model call.

mod claude;
mod fake;

pub use claude::ClaudeClient;
pub use fake::FakeClient;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Error type for generative-model calls.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("API request failed: {0}")]
    RequestFailed(String),

    #[error("API returned error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Rate limited, retry after {retry_after_secs:?} seconds")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Call timed out after {0:?}")]
    Timeout(Duration),
}

/// Sampling constraints for one generation call.
///
/// The fast classification pass depends on these being strict: a one-token
/// cap at zero temperature makes the response deterministic and cheap.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConstraints {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl GenerationConstraints {
    /// Constraints for the fast binary pass: one token, deterministic.
    pub fn fast() -> Self {
        Self {
            max_tokens: 1,
            temperature: 0.0,
        }
    }

    /// Constraints for the detailed pass: room for a JSON object, still
    /// deterministic.
    pub fn detailed() -> Self {
        Self {
            max_tokens: 1024,
            temperature: 0.0,
        }
    }
}

/// Trait for generative-model clients.
///
/// Implementations should be stateless and thread-safe.
#[async_trait]
pub trait GenerativeClient: Send + Sync + fmt::Debug {
    /// Send a prompt and return the model's raw text response.
    async fn complete(
        &self,
        prompt: &str,
        constraints: &GenerationConstraints,
    ) -> Result<String, LlmError>;

    /// Provider name (e.g. "claude", "fake").
    fn provider_name(&self) -> &'static str;

    /// Model name (e.g. "claude-3-5-haiku-20241022").
    fn model_name(&self) -> &str;
}

/// Build a client from environment variables:
/// - CLASSIFIER_PROVIDER: "claude" | "fake" (default "fake", which answers
///   every prompt with the DANGER token)
/// - CLASSIFIER_MODEL: model name (provider-specific)
/// - ANTHROPIC_API_KEY: API key for Claude
pub fn create_client_from_env() -> Result<Box<dyn GenerativeClient>, LlmError> {
    let provider = match std::env::var("CLASSIFIER_PROVIDER") {
        Ok(provider) => provider,
        Err(_) => {
            tracing::warn!(
                "CLASSIFIER_PROVIDER not set, using the fake classifier; every verdict will be DANGER"
            );
            "fake".to_string()
        }
    };

    match provider.as_str() {
        "fake" => Ok(Box::new(FakeClient::default())),
        "claude" => {
            let api_key = std::env::var("ANTHROPIC_API_KEY")
                .map_err(|_| LlmError::NotConfigured("ANTHROPIC_API_KEY not set".to_string()))?;
            let model = std::env::var("CLASSIFIER_MODEL")
                .unwrap_or_else(|_| "claude-3-5-haiku-20241022".to_string());
            Ok(Box::new(ClaudeClient::new(api_key, model)))
        }
        other => Err(LlmError::NotConfigured(format!(
            "Unknown provider: {}",
            other
        ))),
    }
}
