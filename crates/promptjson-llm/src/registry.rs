//! Ordered set of usable providers.

use std::sync::Arc;
use std::time::Duration;

use promptjson_config::{PipelineConfig, ProviderKind, ProviderSettings};
use tracing::{info, warn};

use crate::error::Result;
use crate::provider::{LlmProvider, ProviderConfig};
use crate::providers::{CohereProvider, OpenAiCompatibleProvider};

/// A provider the fallback chain can call
#[derive(Clone)]
pub struct ProviderDescriptor {
    pub name: String,
    pub client: Arc<dyn LlmProvider>,
    pub temperature: f32,
}

impl ProviderDescriptor {
    pub fn new(name: impl Into<String>, client: Arc<dyn LlmProvider>, temperature: f32) -> Self {
        Self {
            name: name.into(),
            client,
            temperature,
        }
    }
}

impl std::fmt::Debug for ProviderDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderDescriptor")
            .field("name", &self.name)
            .field("model", &self.client.metadata().model)
            .field("temperature", &self.temperature)
            .finish()
    }
}

/// Providers in fallback priority order
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    providers: Vec<ProviderDescriptor>,
}

impl ProviderRegistry {
    pub fn new(providers: Vec<ProviderDescriptor>) -> Self {
        Self { providers }
    }

    /// Build from configured settings, reading credentials from the environment
    ///
    /// A provider is included only when it is enabled and its credential is
    /// present and non-empty. Configuration order is kept.
    pub fn from_settings(settings: &[ProviderSettings], pipeline: &PipelineConfig) -> Self {
        Self::from_settings_with(settings, pipeline, ProviderSettings::api_key)
    }

    /// Same as [`from_settings`](Self::from_settings) with a custom credential lookup
    pub fn from_settings_with<F>(
        settings: &[ProviderSettings],
        pipeline: &PipelineConfig,
        credential: F,
    ) -> Self
    where
        F: Fn(&ProviderSettings) -> Option<String>,
    {
        let mut providers = Vec::new();

        for entry in settings.iter().filter(|s| s.enabled) {
            let Some(api_key) = credential(entry).filter(|key| !key.trim().is_empty()) else {
                info!(provider = %entry.name, env = %entry.api_key_env, "no credential, provider skipped");
                continue;
            };

            match build_client(entry, api_key, pipeline) {
                Ok(client) => {
                    providers.push(ProviderDescriptor::new(&entry.name, client, entry.temperature))
                }
                Err(e) => warn!(provider = %entry.name, error = %e, "failed to create provider client"),
            }
        }

        Self { providers }
    }

    /// Available providers in priority order
    pub fn list_available(&self) -> &[ProviderDescriptor] {
        &self.providers
    }

    pub fn names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

fn build_client(
    settings: &ProviderSettings,
    api_key: String,
    pipeline: &PipelineConfig,
) -> Result<Arc<dyn LlmProvider>> {
    let config = ProviderConfig::new(&settings.name, &settings.base_url)
        .with_api_key(api_key)
        .with_model(&settings.model)
        .with_timeout(Duration::from_secs(settings.timeout_seconds))
        .with_transport_retries(pipeline.transport_retries);

    Ok(match settings.kind {
        ProviderKind::OpenAiCompatible => Arc::new(OpenAiCompatibleProvider::new(config)?),
        ProviderKind::Cohere => Arc::new(CohereProvider::new(config)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptjson_config::LlmConfig;
    use std::collections::HashMap;

    fn keys(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn registry(env: &HashMap<String, String>) -> ProviderRegistry {
        ProviderRegistry::from_settings_with(
            &LlmConfig::default().providers,
            &PipelineConfig::default(),
            |s| env.get(&s.api_key_env).cloned(),
        )
    }

    #[test]
    fn test_all_credentials_keep_default_order() {
        let env = keys(&[
            ("COHERE_API_KEY", "c"),
            ("GOOGLE_GEMINI_API_KEY", "g"),
            ("MISTRAL_API_KEY", "m"),
        ]);
        assert_eq!(registry(&env).names(), vec!["gemini", "mistral", "cohere"]);
    }

    #[test]
    fn test_only_credentialed_providers_are_listed() {
        let env = keys(&[("MISTRAL_API_KEY", "m")]);
        let registry = registry(&env);
        assert_eq!(registry.names(), vec!["mistral"]);
        assert!((registry.list_available()[0].temperature - 0.1).abs() < f32::EPSILON);
    }

    #[test]
    fn test_empty_credentials_are_excluded() {
        let env = keys(&[("GOOGLE_GEMINI_API_KEY", ""), ("COHERE_API_KEY", "  ")]);
        assert!(registry(&env).is_empty());
        assert!(registry(&HashMap::new()).is_empty());
    }

    #[test]
    fn test_disabled_provider_is_skipped() {
        let mut settings = LlmConfig::default().providers;
        settings[0].enabled = false;
        let registry = ProviderRegistry::from_settings_with(
            &settings,
            &PipelineConfig::default(),
            |_| Some("key".to_string()),
        );
        assert_eq!(registry.names(), vec!["mistral", "cohere"]);
    }
}
