//! Token-cost estimation.
//!
//! Rates are USD per single token, the unit model catalogs publish. Costs are
//! plain `f64`; they are estimates for display, not billing.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{find_model, ModelDescriptor};

const TOKENS_PER_MILLION: f64 = 1_000_000.0;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CostError {
    #[error("Pricing unavailable for model '{model}': {reason}")]
    PricingUnavailable { model: String, reason: String },
}

/// Token counts reported for one completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl Usage {
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
        }
    }

    pub fn total_tokens(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// Numeric per-token rates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pricing {
    pub prompt_rate: f64,
    pub completion_rate: f64,
}

impl Pricing {
    pub fn new(prompt_rate: f64, completion_rate: f64) -> Self {
        Self {
            prompt_rate,
            completion_rate,
        }
    }

    /// Parse the published rate strings of a model.
    pub fn from_descriptor(model: &ModelDescriptor) -> Result<Self, CostError> {
        let parse = |kind: &str, raw: &str| {
            parse_rate(raw).ok_or_else(|| CostError::PricingUnavailable {
                model: model.id.clone(),
                reason: format!("{} rate '{}' is not a number", kind, raw),
            })
        };

        Ok(Self {
            prompt_rate: parse("prompt", &model.pricing.prompt)?,
            completion_rate: parse("completion", &model.pricing.completion)?,
        })
    }

    /// Find `model_id` in a catalog and parse its rates.
    pub fn resolve(models: &[ModelDescriptor], model_id: &str) -> Result<Self, CostError> {
        let model = find_model(models, model_id).ok_or_else(|| CostError::PricingUnavailable {
            model: model_id.to_string(),
            reason: "model not found in catalog".to_string(),
        })?;
        Self::from_descriptor(model)
    }

    /// Rates per million tokens, for display.
    pub fn per_million(&self) -> (f64, f64) {
        (
            self.prompt_rate * TOKENS_PER_MILLION,
            self.completion_rate * TOKENS_PER_MILLION,
        )
    }
}

fn parse_rate(raw: &str) -> Option<f64> {
    let rate: f64 = raw.trim().trim_start_matches('$').trim().parse().ok()?;
    (rate.is_finite() && rate >= 0.0).then_some(rate)
}

/// Cost of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Cost {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub prompt_cost: f64,
    pub completion_cost: f64,
    pub total_cost: f64,
}

pub fn compute_cost(usage: Usage, pricing: Pricing) -> Cost {
    let prompt_cost = usage.prompt_tokens as f64 * pricing.prompt_rate;
    let completion_cost = usage.completion_tokens as f64 * pricing.completion_rate;

    Cost {
        prompt_tokens: usage.prompt_tokens,
        completion_tokens: usage.completion_tokens,
        prompt_cost,
        completion_cost,
        total_cost: prompt_cost + completion_cost,
    }
}
