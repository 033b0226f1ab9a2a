//! The provider API key, held as a secret.
//!
//! The key is read once from the runtime config or the environment and
//! only leaves the wrapper when the `Authorization` header is built.

use secrecy::{ExposeSecret, SecretString};
use std::fmt;

use super::ProviderError;

pub struct ApiCredential(SecretString);

impl ApiCredential {
    pub fn new(key: impl Into<String>) -> Self {
        Self(SecretString::from(key.into()))
    }

    /// The configured key, or else the value of `env_var`. A blank
    /// configured key counts as absent.
    pub fn resolve(configured: Option<&str>, env_var: &str) -> Result<Self, ProviderError> {
        Self::resolve_with(configured, env_var, |key| std::env::var(key).ok())
    }

    fn resolve_with<F>(configured: Option<&str>, env_var: &str, lookup: F) -> Result<Self, ProviderError>
    where
        F: Fn(&str) -> Option<String>,
    {
        configured
            .filter(|key| !key.trim().is_empty())
            .map(str::to_string)
            .or_else(|| lookup(env_var).filter(|key| !key.trim().is_empty()))
            .map(Self::new)
            .ok_or_else(|| {
                ProviderError::NotConfigured(format!(
                    "API key missing: set 'api_key' in the config file or {}",
                    env_var
                ))
            })
    }

    /// The raw key, for the request header only.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    pub fn is_empty(&self) -> bool {
        self.0.expose_secret().is_empty()
    }
}

impl fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiCredential([REDACTED])")
    }
}
