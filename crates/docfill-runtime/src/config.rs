//! Runtime configuration.
//!
//! Loaded from YAML, every key optional, then overridden from the
//! environment:
//!
//! ```yaml
//! provider: openrouter
//! base_url: https://openrouter.ai/api/v1
//! default_model: anthropic/claude-3-sonnet
//! temperature: 0.1
//! max_tokens: 1000
//! request_timeout: 60s
//! catalog_ttl: 1h
//! referer: https://example.com
//! extra_denylist: ["sconosciuto"]
//! extractor:
//!   page_separator: "\n"
//!   max_chars: 200000
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use docfill_core::Denylist;

use crate::document::ExtractorConfig;
use crate::providers::CompletionConfig;

pub const MODEL_ENV: &str = "DOCFILL_MODEL";
pub const BASE_URL_ENV: &str = "DOCFILL_BASE_URL";
pub const TIMEOUT_ENV: &str = "DOCFILL_TIMEOUT";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid duration in {key}: {source}")]
    Duration {
        key: &'static str,
        source: humantime::DurationError,
    },

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Settings for the provider, pipeline and extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Provider type understood by `create_provider`
    pub provider: String,

    pub base_url: String,

    /// Model used when none is selected
    pub default_model: String,

    pub temperature: f32,
    pub max_tokens: u32,

    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// How long a fetched model list stays valid
    #[serde(with = "humantime_serde")]
    pub catalog_ttl: Duration,

    /// `HTTP-Referer` sent to the provider
    pub referer: Option<String>,

    /// `X-Title` sent to the provider
    pub app_title: Option<String>,

    /// API key; prefer the environment variable
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Phrases treated as "unspecified" on top of the defaults
    pub extra_denylist: Vec<String>,

    pub extractor: ExtractorConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            provider: "openrouter".to_string(),
            base_url: "https://openrouter.ai/api/v1".to_string(),
            default_model: "anthropic/claude-3-sonnet".to_string(),
            temperature: 0.1,
            max_tokens: 1000,
            request_timeout: Duration::from_secs(60),
            catalog_ttl: Duration::from_secs(3600),
            referer: None,
            app_title: None,
            api_key: None,
            extra_denylist: Vec::new(),
            extractor: ExtractorConfig::default(),
        }
    }
}

impl RuntimeConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Defaults, overridden from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Apply `DOCFILL_MODEL`, `DOCFILL_BASE_URL` and `DOCFILL_TIMEOUT`.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup, then re-validate.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(model) = lookup(MODEL_ENV) {
            self.default_model = model;
        }
        if let Some(url) = lookup(BASE_URL_ENV) {
            self.base_url = url;
        }
        if let Some(timeout) = lookup(TIMEOUT_ENV) {
            self.request_timeout = humantime::parse_duration(&timeout).map_err(|source| {
                ConfigError::Duration {
                    key: TIMEOUT_ENV,
                    source,
                }
            })?;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ConfigError::Invalid(format!(
                "base_url must start with http:// or https://, got '{}'",
                self.base_url
            )));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::Invalid(format!(
                "temperature must be between 0 and 2, got {}",
                self.temperature
            )));
        }
        if self.max_tokens == 0 {
            return Err(ConfigError::Invalid("max_tokens must be positive".to_string()));
        }
        if self.default_model.trim().is_empty() {
            return Err(ConfigError::Invalid("default_model must not be empty".to_string()));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::Invalid("request_timeout must be positive".to_string()));
        }
        Ok(())
    }

    /// Completion settings for `model`.
    pub fn completion_config(&self, model: impl Into<String>) -> CompletionConfig {
        CompletionConfig {
            model: model.into(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            timeout: self.request_timeout,
            json_response: true,
        }
    }

    /// The default phrases plus `extra_denylist`.
    pub fn denylist(&self) -> Denylist {
        let mut denylist = Denylist::default();
        denylist.extend(&self.extra_denylist);
        denylist
    }
}

/// Serde adapter for humantime durations (`"60s"`, `"1h 30m"`).
mod humantime_serde {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&humantime::format_duration(*duration))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(D::Error::custom)
    }
}
