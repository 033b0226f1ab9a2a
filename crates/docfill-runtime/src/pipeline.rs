//! Extraction pipeline: one document, one schema, one model call.
//!
//! Execution flow:
//! 1. Resolve model pricing from the catalog (fail before spending tokens)
//! 2. Build the prompt (deterministic)
//! 3. Call the provider
//! 4. Isolate, parse and validate the reply (deterministic)
//! 5. Compute the cost of the call

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use docfill_core::{
    build_prompt_with, compute_cost, process_response, Cost, FieldList, FieldValidator, Usage,
    Validation, SYSTEM_INSTRUCTION,
};

use crate::catalog::ModelCatalog;
use crate::providers::{ChatMessage, CompletionConfig, LlmProvider};
use crate::RuntimeError;

/// Result of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessingOutcome {
    pub validation: Validation,
    pub usage: Usage,
    pub cost: Cost,

    /// Model that answered
    pub model: String,

    pub processed_at: DateTime<Utc>,
}

/// Runs extractions against one provider.
///
/// Stateless between runs: nothing from a previous run leaks into the next.
pub struct ExtractionPipeline {
    provider: Arc<dyn LlmProvider>,
    catalog: Arc<ModelCatalog>,
    validator: FieldValidator,
    completion: CompletionConfig,
}

impl ExtractionPipeline {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        catalog: Arc<ModelCatalog>,
        validator: FieldValidator,
        completion: CompletionConfig,
    ) -> Self {
        Self {
            provider,
            catalog,
            validator,
            completion,
        }
    }

    pub fn catalog(&self) -> &Arc<ModelCatalog> {
        &self.catalog
    }

    pub fn validator(&self) -> &FieldValidator {
        &self.validator
    }

    /// Extract values for `fields` from `document_text` using `model_id`.
    ///
    /// All failures are terminal; nothing is retried.
    pub async fn run(
        &self,
        document_text: &str,
        fields: &FieldList,
        model_id: &str,
    ) -> Result<ProcessingOutcome, RuntimeError> {
        let pricing = self.catalog.pricing(model_id).await?;

        let prompt = build_prompt_with(document_text, fields, self.validator.denylist());
        let messages = vec![
            ChatMessage::system(SYSTEM_INSTRUCTION),
            ChatMessage::user(prompt),
        ];
        let config = self.completion.for_model(model_id);

        tracing::info!(
            provider = self.provider.name(),
            model = model_id,
            fields = fields.len(),
            "starting extraction"
        );

        let response = self
            .provider
            .complete(messages, &config)
            .await
            .map_err(|e| {
                tracing::warn!(model = model_id, error = %e, "completion failed");
                e
            })?;

        let validation = process_response(&response.content, fields, &self.validator)
            .map_err(|e| {
                tracing::warn!(model = model_id, error = %e, "unusable model reply");
                e
            })?;

        let cost = compute_cost(response.usage, pricing);

        tracing::info!(
            model = %response.model,
            prompt_tokens = response.usage.prompt_tokens,
            completion_tokens = response.usage.completion_tokens,
            filled = validation.filled_count,
            total_cost = cost.total_cost,
            "extraction finished"
        );

        Ok(ProcessingOutcome {
            validation,
            usage: response.usage,
            cost,
            model: response.model,
            processed_at: Utc::now(),
        })
    }
}

impl std::fmt::Debug for ExtractionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractionPipeline")
            .field("provider", &self.provider.name())
            .field("completion", &self.completion)
            .finish()
    }
}
