use std::sync::Arc;
use std::time::Duration;

use promptjson_config::{expand_tilde, Config, CounterBackend, DemoConfig, StorageType};
use promptjson_llm::{Invoker, Orchestrator, ProviderRegistry};
use tracing::{debug, info, warn};

use crate::counters::DemoGate;
use crate::middleware::{IdentityResolver, StaticTokenResolver};
use crate::store::{ConversionStore, JsonlConversionStore, MemoryConversionStore, StoreError, StoreResult};

/// Shared state of all handlers
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Orchestrator,
    pub store: Arc<dyn ConversionStore>,
    pub identity: Arc<dyn IdentityResolver>,
    /// `None` when demo mode is disabled
    pub demo: Option<DemoGate>,
}

impl AppState {
    pub fn new(
        orchestrator: Orchestrator,
        store: Arc<dyn ConversionStore>,
        identity: Arc<dyn IdentityResolver>,
        demo: Option<DemoGate>,
    ) -> Self {
        Self {
            orchestrator,
            store,
            identity,
            demo,
        }
    }

    /// Build every collaborator from configuration
    pub async fn from_config(config: &Config) -> StoreResult<Self> {
        let registry = ProviderRegistry::from_settings(&config.llm.providers, &config.pipeline);
        debug!(providers = registry.len(), "provider registry built");

        let orchestrator = Orchestrator::new(
            Arc::new(registry),
            Invoker::new(
                config.pipeline.max_attempts,
                Duration::from_secs(config.pipeline.attempt_timeout_secs),
            ),
        );

        let store: Arc<dyn ConversionStore> = match config.storage.storage_type {
            StorageType::Memory => Arc::new(MemoryConversionStore::new()),
            StorageType::Jsonl => {
                let path = config
                    .storage
                    .path
                    .as_deref()
                    .and_then(expand_tilde)
                    .or_else(promptjson_config::default_store_path)
                    .ok_or_else(|| StoreError::Other("no path for the JSONL store".to_string()))?;
                Arc::new(JsonlConversionStore::open(path).await?)
            }
        };
        info!(backend = store.backend(), "Conversion store ready");

        let resolver = StaticTokenResolver::new(config.auth.tokens.clone());
        if resolver.is_dev_mode() {
            warn!("No auth tokens configured; running in development mode");
        }

        let demo = if config.demo.enabled {
            Some(build_demo_gate(&config.demo).await)
        } else {
            None
        };

        Ok(Self::new(orchestrator, store, Arc::new(resolver), demo))
    }
}

async fn build_demo_gate(config: &DemoConfig) -> DemoGate {
    match config.counters {
        CounterBackend::Memory => DemoGate::in_memory(config),
        CounterBackend::Redis => redis_gate(config).await,
    }
}

#[cfg(feature = "redis")]
async fn redis_gate(config: &DemoConfig) -> DemoGate {
    use crate::counters::RedisCounterStore;

    match RedisCounterStore::connect(&config.redis_url).await {
        Ok(store) => DemoGate::new(Arc::new(store), config),
        Err(e) => {
            warn!(error = %e, "Redis unavailable, demo counters kept in process");
            DemoGate::in_memory(config)
        }
    }
}

#[cfg(not(feature = "redis"))]
async fn redis_gate(config: &DemoConfig) -> DemoGate {
    warn!("Built without the `redis` feature, demo counters kept in process");
    DemoGate::in_memory(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptjson_config::StorageConfig;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_from_config_without_credentials() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.llm.providers.clear();
        config.storage = StorageConfig {
            storage_type: StorageType::Jsonl,
            path: Some(dir.path().join("c.jsonl").to_string_lossy().into_owned()),
        };

        let state = AppState::from_config(&config).await.unwrap();
        assert!(state.orchestrator.registry().is_empty());
        assert_eq!(state.store.backend(), "jsonl");
        assert!(state.demo.is_some());
    }

    #[tokio::test]
    async fn test_demo_can_be_disabled() {
        let mut config = Config::default();
        config.storage.storage_type = StorageType::Memory;
        config.demo.enabled = false;

        let state = AppState::from_config(&config).await.unwrap();
        assert_eq!(state.store.backend(), "memory");
        assert!(state.demo.is_none());
    }
}
