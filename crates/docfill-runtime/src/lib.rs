//! # docfill-runtime
//!
//! Model calls, document text extraction and session orchestration for
//! docfill.
//!
//! ## Important
//!
//! Everything deterministic lives in `docfill-core`. This crate adds the
//! collaborators around it:
//! - LLM providers (OpenRouter) behind the [`LlmProvider`] trait
//! - A cached model catalog with pricing
//! - PDF text extraction
//! - The extraction pipeline and an interactive [`Session`]
//!
//! ## Example
//!
//! ```rust,ignore
//! use docfill_runtime::{create_provider, ExtractionPipeline, ModelCatalog, RuntimeConfig};
//!
//! let config = RuntimeConfig::from_env()?;
//! let provider = create_provider(&config)?;
//! let catalog = Arc::new(ModelCatalog::new(provider.clone(), config.catalog_ttl));
//! let pipeline = ExtractionPipeline::new(
//!     provider,
//!     catalog,
//!     FieldValidator::new(config.denylist()),
//!     config.completion_config(&config.default_model),
//! );
//!
//! let outcome = pipeline.run(&text, &fields, &config.default_model).await?;
//! ```

pub mod catalog;
pub mod config;
pub mod document;
pub mod pipeline;
pub mod providers;
pub mod session;

pub use catalog::{CatalogError, ModelCatalog};
pub use config::{ConfigError, RuntimeConfig};
pub use document::{DocumentError, ExtractorConfig, PdfTextExtractor, TextExtractor};
pub use pipeline::{ExtractionPipeline, ProcessingOutcome};
pub use providers::{
    create_provider, ApiCredential, ChatMessage, CompletionConfig, CompletionResponse,
    LlmProvider, ProviderError,
};
pub use session::{RunOutcome, Session};

use docfill_core::{CostError, ExtractionError, FormError, SchemaError};
use thiserror::Error;

/// Errors from the runtime.
///
/// Every variant is terminal for the run that raised it; nothing is retried.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Transport error: {message}")]
    Transport { status: Option<u16>, message: String },

    #[error("Pricing unavailable for model '{model}': {reason}")]
    PricingUnavailable { model: String, reason: String },

    #[error("Document read failed: {0}")]
    DocumentRead(String),

    #[error("A processing run is already in progress")]
    RunInProgress,

    #[error("No document loaded")]
    NoDocument,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Form(#[from] FormError),
}

impl RuntimeError {
    /// One line suitable for showing to a user.
    pub fn user_message(&self) -> String {
        match self {
            RuntimeError::Transport {
                status: Some(status),
                message,
            } => format!("API Error: {} (Status: {})", message, status),
            RuntimeError::Transport { status: None, message } => format!("API Error: {}", message),
            RuntimeError::DocumentRead(message) => format!("PDF Processing Error: {}", message),
            other => other.to_string(),
        }
    }
}

impl From<ExtractionError> for RuntimeError {
    fn from(err: ExtractionError) -> Self {
        match err {
            ExtractionError::MalformedResponse(message) => RuntimeError::MalformedResponse(message),
        }
    }
}

impl From<CostError> for RuntimeError {
    fn from(err: CostError) -> Self {
        match err {
            CostError::PricingUnavailable { model, reason } => {
                RuntimeError::PricingUnavailable { model, reason }
            }
        }
    }
}

impl From<ProviderError> for RuntimeError {
    fn from(err: ProviderError) -> Self {
        let status = err.status();
        let message = match err {
            ProviderError::ApiError { message, .. } => message,
            other => other.to_string(),
        };
        RuntimeError::Transport { status, message }
    }
}

impl From<CatalogError> for RuntimeError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Provider(e) => e.into(),
            CatalogError::Pricing(e) => e.into(),
        }
    }
}

impl From<DocumentError> for RuntimeError {
    fn from(err: DocumentError) -> Self {
        RuntimeError::DocumentRead(err.to_string())
    }
}

impl From<ConfigError> for RuntimeError {
    fn from(err: ConfigError) -> Self {
        RuntimeError::Config(err.to_string())
    }
}
