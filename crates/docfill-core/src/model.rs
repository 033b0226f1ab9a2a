//! Model descriptors as published by a model catalog.

use serde::{Deserialize, Serialize};

/// Context window assumed when the catalog does not publish one.
pub const DEFAULT_CONTEXT_WINDOW: u64 = 8192;

/// Placeholder for a rate the catalog does not publish.
pub const PRICING_NOT_AVAILABLE: &str = "N/A";

/// Per-token rates as published, e.g. `"0.000003"` or `"$0.000003"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelPricing {
    pub prompt: String,
    pub completion: String,
}

impl Default for ModelPricing {
    fn default() -> Self {
        Self {
            prompt: PRICING_NOT_AVAILABLE.to_string(),
            completion: PRICING_NOT_AVAILABLE.to_string(),
        }
    }
}

/// A model offered by the chat-completion service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub id: String,

    /// Display name; the id when the catalog gives none
    pub name: String,

    #[serde(default)]
    pub pricing: ModelPricing,

    #[serde(default = "default_context_window", alias = "context_length")]
    pub context_window: u64,
}

fn default_context_window() -> u64 {
    DEFAULT_CONTEXT_WINDOW
}

impl ModelDescriptor {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            pricing: ModelPricing::default(),
            context_window: DEFAULT_CONTEXT_WINDOW,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_pricing(mut self, prompt: impl Into<String>, completion: impl Into<String>) -> Self {
        self.pricing = ModelPricing {
            prompt: prompt.into(),
            completion: completion.into(),
        };
        self
    }

    pub fn with_context_window(mut self, context_window: u64) -> Self {
        self.context_window = context_window;
        self
    }
}

/// Look up a model by exact id.
pub fn find_model<'a>(models: &'a [ModelDescriptor], id: &str) -> Option<&'a ModelDescriptor> {
    models.iter().find(|m| m.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let model = ModelDescriptor::new("openai/gpt-4o");
        assert_eq!(model.name, "openai/gpt-4o");
        assert_eq!(model.pricing.prompt, "N/A");
        assert_eq!(model.context_window, 8192);
    }

    #[test]
    fn test_deserialize_accepts_context_length() {
        let model: ModelDescriptor = serde_json::from_str(
            r#"{"id": "a", "name": "A", "context_length": 200000,
                "pricing": {"prompt": "0.000003", "completion": "0.000015"}}"#,
        )
        .unwrap();
        assert_eq!(model.context_window, 200000);
        assert_eq!(model.pricing.completion, "0.000015");
    }

    #[test]
    fn test_find_model() {
        let models = vec![ModelDescriptor::new("a"), ModelDescriptor::new("b")];
        assert_eq!(find_model(&models, "b").unwrap().id, "b");
        assert!(find_model(&models, "c").is_none());
    }
}
