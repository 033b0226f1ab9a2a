//! OpenRouter chat-completion provider.
//!
//! OpenRouter exposes an OpenAI-compatible API in front of many model
//! vendors and publishes a model list with per-token prices.

use super::{
    secrets::ApiCredential, ChatMessage, CompletionConfig, CompletionResponse, LlmProvider,
    ProviderError,
};
use async_trait::async_trait;
use docfill_core::{ModelDescriptor, ModelPricing, Usage, DEFAULT_CONTEXT_WINDOW};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::time::Duration;

use crate::config::RuntimeConfig;

/// Environment variable name for the OpenRouter API key.
pub const OPENROUTER_API_KEY_ENV: &str = "OPENROUTER_API_KEY";

/// Public OpenRouter API endpoint.
pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Application name reported in the `X-Title` header.
pub const DEFAULT_APP_TITLE: &str = "Document Processing App";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// OpenRouter provider.
///
/// The API key is held in an [`ApiCredential`] and only exposed when the
/// request header is set.
pub struct OpenRouterProvider {
    credential: ApiCredential,
    base_url: String,
    referer: Option<String>,
    app_title: String,

    /// Applied to catalog fetches; completions use `CompletionConfig::timeout`
    timeout: Duration,

    client: reqwest::Client,
}

impl std::fmt::Debug for OpenRouterProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenRouterProvider")
            .field("credential", &self.credential)
            .field("base_url", &self.base_url)
            .field("referer", &self.referer)
            .field("app_title", &self.app_title)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl OpenRouterProvider {
    /// Create a provider for the public endpoint.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_credential(ApiCredential::new(api_key))
    }

    fn with_credential(credential: ApiCredential) -> Self {
        Self {
            credential,
            base_url: OPENROUTER_BASE_URL.to_string(),
            referer: None,
            app_title: DEFAULT_APP_TITLE.to_string(),
            timeout: DEFAULT_TIMEOUT,
            client: reqwest::Client::new(),
        }
    }

    /// Build from runtime settings. The key comes from `api_key`, falling
    /// back to `OPENROUTER_API_KEY`.
    pub fn from_runtime_config(config: &RuntimeConfig) -> Result<Self, ProviderError> {
        let credential = ApiCredential::resolve(config.api_key.as_deref(), OPENROUTER_API_KEY_ENV)?;

        let mut provider = Self::with_credential(credential)
            .with_base_url(&config.base_url)
            .with_timeout(config.request_timeout);
        if let Some(referer) = &config.referer {
            provider = provider.with_referer(referer);
        }
        if let Some(title) = &config.app_title {
            provider.app_title = title.clone();
        }
        Ok(provider)
    }

    /// Set custom base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the `HTTP-Referer` header OpenRouter uses for app attribution.
    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        // SECURITY: Only expose the credential here, at the point of use
        let builder = builder
            .bearer_auth(self.credential.expose())
            .header("X-Title", &self.app_title);
        match &self.referer {
            Some(referer) => builder.header("HTTP-Referer", referer),
            None => builder,
        }
    }
}

/// Chat completion request body.
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    type_: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    data: Vec<ApiModel>,
}

#[derive(Debug, Deserialize)]
struct ApiModel {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    pricing: Option<ApiPricing>,
    #[serde(default)]
    context_length: Option<u64>,
    #[serde(default)]
    context_window: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ApiPricing {
    #[serde(default)]
    prompt: Option<JsonValue>,
    #[serde(default)]
    completion: Option<JsonValue>,
}

impl From<ApiModel> for ModelDescriptor {
    fn from(model: ApiModel) -> Self {
        let defaults = ModelPricing::default();
        let pricing = match model.pricing {
            Some(p) => ModelPricing {
                prompt: rate_text(p.prompt).unwrap_or(defaults.prompt),
                completion: rate_text(p.completion).unwrap_or(defaults.completion),
            },
            None => defaults,
        };

        ModelDescriptor {
            name: model
                .name
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| model.id.clone()),
            id: model.id,
            pricing,
            context_window: model
                .context_window
                .or(model.context_length)
                .unwrap_or(DEFAULT_CONTEXT_WINDOW),
        }
    }
}

/// Rates are published as strings, occasionally as numbers.
fn rate_text(value: Option<JsonValue>) -> Option<String> {
    match value? {
        JsonValue::String(s) if !s.is_empty() => Some(s),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Turn a non-success response into an error, preferring the service's own
/// message over a generic one.
async fn api_error(response: reqwest::Response) -> ProviderError {
    let status = response.status().as_u16();
    let message = response
        .json::<ApiErrorBody>()
        .await
        .map(|body| body.error.message)
        .unwrap_or_else(|_| format!("API request failed with status {}", status));

    ProviderError::ApiError { status, message }
}

fn send_error(e: reqwest::Error, timeout: std::time::Duration) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(timeout)
    } else {
        ProviderError::HttpError(e.to_string())
    }
}

#[async_trait]
impl LlmProvider for OpenRouterProvider {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError> {
        let request = ChatRequest {
            model: &config.model,
            messages: &messages,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            response_format: config.json_response.then_some(ResponseFormat {
                type_: "json_object",
            }),
        };

        let response = self
            .request(self.client.post(format!("{}/chat/completions", self.base_url)))
            .timeout(config.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| send_error(e, config.timeout))?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.is_empty())
            .ok_or(ProviderError::EmptyResponse)?;

        let usage = body
            .usage
            .map(|u| Usage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        Ok(CompletionResponse {
            content,
            usage,
            model: body.model.unwrap_or_else(|| config.model.clone()),
        })
    }

    async fn list_models(&self) -> Result<Vec<ModelDescriptor>, ProviderError> {
        let response = self
            .request(self.client.get(format!("{}/models", self.base_url)))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| send_error(e, self.timeout))?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let list: ModelList = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        Ok(list.data.into_iter().map(ModelDescriptor::from).collect())
    }

    async fn health_check(&self) -> bool {
        // Verify the API key is set, without logging the value
        !self.credential.is_empty()
    }

    fn name(&self) -> &str {
        "openrouter"
    }
}
