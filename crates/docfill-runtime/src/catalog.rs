//! Cached model catalog.
//!
//! The model list is fetched from the provider once and kept for a TTL, so
//! model pickers and per-run pricing lookups do not hit the network each
//! time.

use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use docfill_core::{find_model, CostError, ModelDescriptor, Pricing};

use crate::providers::{LlmProvider, ProviderError};

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Pricing(#[from] CostError),
}

/// Model list cache using moka, keyed by provider name.
pub struct ModelCatalog {
    provider: Arc<dyn LlmProvider>,
    cache: Cache<String, Arc<Vec<ModelDescriptor>>>,
}

impl ModelCatalog {
    pub fn new(provider: Arc<dyn LlmProvider>, ttl: Duration) -> Self {
        let cache = Cache::builder().max_capacity(8).time_to_live(ttl).build();
        Self { provider, cache }
    }

    /// All models, fetched on first use and after the TTL expires.
    pub async fn models(&self) -> Result<Arc<Vec<ModelDescriptor>>, CatalogError> {
        let key = self.provider.name().to_string();
        if let Some(models) = self.cache.get(&key).await {
            return Ok(models);
        }

        let models = Arc::new(self.provider.list_models().await?);
        tracing::debug!(provider = %key, count = models.len(), "fetched model catalog");
        self.cache.insert(key, models.clone()).await;
        Ok(models)
    }

    /// Look up a model by id.
    pub async fn get(&self, model_id: &str) -> Result<Option<ModelDescriptor>, CatalogError> {
        let models = self.models().await?;
        Ok(find_model(&models, model_id).cloned())
    }

    /// Numeric pricing of a model; `PricingUnavailable` when the model is
    /// not listed or its rates are not numbers.
    pub async fn pricing(&self, model_id: &str) -> Result<Pricing, CatalogError> {
        let models = self.models().await?;
        Ok(Pricing::resolve(&models, model_id)?)
    }

    /// Drop the cached list; the next lookup refetches.
    pub fn invalidate(&self) {
        self.cache.invalidate_all();
    }
}

impl std::fmt::Debug for ModelCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelCatalog")
            .field("provider", &self.provider.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{ChatMessage, CompletionConfig, CompletionResponse};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LlmProvider for CountingProvider {
        async fn complete(
            &self,
            _messages: Vec<ChatMessage>,
            _config: &CompletionConfig,
        ) -> Result<CompletionResponse, ProviderError> {
            Err(ProviderError::EmptyResponse)
        }

        async fn list_models(&self) -> Result<Vec<ModelDescriptor>, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![
                ModelDescriptor::new("priced").with_pricing("$0.000003", "0.000015"),
                ModelDescriptor::new("unpriced"),
            ])
        }

        async fn health_check(&self) -> bool {
            true
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    fn catalog() -> (Arc<CountingProvider>, ModelCatalog) {
        let provider = Arc::new(CountingProvider {
            calls: AtomicUsize::new(0),
        });
        let catalog = ModelCatalog::new(provider.clone(), Duration::from_secs(3600));
        (provider, catalog)
    }

    #[tokio::test]
    async fn test_models_fetched_once() {
        let (provider, catalog) = catalog();

        assert_eq!(catalog.models().await.unwrap().len(), 2);
        assert_eq!(catalog.models().await.unwrap().len(), 2);
        assert!(catalog.get("priced").await.unwrap().is_some());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

        catalog.invalidate();
        catalog.models().await.unwrap();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_pricing_resolution() {
        let (_, catalog) = catalog();

        let pricing = catalog.pricing("priced").await.unwrap();
        assert_eq!(pricing, Pricing::new(0.000003, 0.000015));

        assert!(matches!(
            catalog.pricing("unpriced").await,
            Err(CatalogError::Pricing(CostError::PricingUnavailable { .. }))
        ));
        assert!(matches!(
            catalog.pricing("missing").await,
            Err(CatalogError::Pricing(_))
        ));
    }
}
