//! LLM provider abstractions for docfill-runtime.
//!
//! This module defines the trait for chat-completion providers and the
//! OpenRouter implementation.
//!
//! API keys never appear in logs or `Debug` output; see [`ApiCredential`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use docfill_core::{ModelDescriptor, Usage};

use crate::config::RuntimeConfig;

pub mod secrets;

#[cfg(feature = "openrouter")]
mod openrouter;

pub use secrets::ApiCredential;

#[cfg(feature = "openrouter")]
pub use openrouter::{
    OpenRouterProvider, DEFAULT_APP_TITLE, OPENROUTER_API_KEY_ENV, OPENROUTER_BASE_URL,
};

/// Errors from LLM providers.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Empty response from API")]
    EmptyResponse,

    #[error("JSON parse error: {0}")]
    ParseError(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

impl ProviderError {
    /// HTTP status of the failed call, when the service answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::ApiError { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Configuration for a completion request.
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    /// Model to use
    pub model: String,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,

    /// Request timeout
    pub timeout: Duration,

    /// Ask the service to constrain output to a JSON object
    pub json_response: bool,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            model: "anthropic/claude-3-sonnet".to_string(),
            max_tokens: 1000,
            temperature: 0.1,
            timeout: Duration::from_secs(60),
            json_response: true,
        }
    }
}

impl CompletionConfig {
    pub fn for_model(&self, model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..self.clone()
        }
    }
}

/// A chat message for LLM completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role: "system", "user", or "assistant"
    pub role: String,

    /// Message content
    pub content: String,
}

impl ChatMessage {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Response from an LLM completion.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// Generated content
    pub content: String,

    /// Token usage
    pub usage: Usage,

    /// Model that answered
    pub model: String,
}

/// Provider abstraction allows swapping chat-completion backends.
///
/// This is the only place where network calls to a model service are made.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Execute a chat completion.
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError>;

    /// Fetch the models this provider offers, with their pricing.
    async fn list_models(&self) -> Result<Vec<ModelDescriptor>, ProviderError>;

    /// Check if provider is usable.
    async fn health_check(&self) -> bool;

    /// Get provider name for logs.
    fn name(&self) -> &str;
}

/// Build the provider named by `config.provider`.
pub fn create_provider(config: &RuntimeConfig) -> Result<Arc<dyn LlmProvider>, ProviderError> {
    match config.provider.as_str() {
        #[cfg(feature = "openrouter")]
        "openrouter" => Ok(Arc::new(OpenRouterProvider::from_runtime_config(config)?)),
        other => Err(ProviderError::NotConfigured(format!(
            "Unknown provider type: '{}'",
            other
        ))),
    }
}
