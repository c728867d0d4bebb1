//! Fallback across providers in priority order.

use std::sync::Arc;

use promptjson_core::{EventEmitter, ProgressEvent, StructuredResult};
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::invoker::{InvocationError, Invoker};
use crate::registry::ProviderRegistry;

/// Successful conversion
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionOutcome {
    /// Provider that produced the result
    pub provider: String,
    pub result: StructuredResult,
    pub corrected: bool,
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Prompt is required")]
    EmptyPrompt,

    #[error("No LLM providers configured. Please add at least one API key.")]
    NoProvidersConfigured,

    #[error("All LLM providers failed. Last error: {0}")]
    AllProvidersFailed(#[source] InvocationError),

    /// Non-retryable error; later providers were not tried
    #[error(transparent)]
    Fatal(InvocationError),
}

impl PipelineError {
    /// Caused by configuration rather than the request or the providers
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::NoProvidersConfigured)
    }
}

/// Tries each available provider until one yields a valid result
#[derive(Debug, Clone)]
pub struct Orchestrator {
    registry: Arc<ProviderRegistry>,
    invoker: Invoker,
}

impl Orchestrator {
    pub fn new(registry: Arc<ProviderRegistry>, invoker: Invoker) -> Self {
        Self { registry, invoker }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Convert a prompt, emitting progress in order
    ///
    /// Emits `provider` before each provider is tried and `provider_error`
    /// when it gives up. Stops at the first success or the first
    /// non-retryable failure.
    #[instrument(skip_all, fields(prompt_len = prompt.len()))]
    pub async fn run(
        &self,
        prompt: &str,
        emitter: &EventEmitter,
    ) -> Result<ConversionOutcome, PipelineError> {
        if prompt.trim().is_empty() {
            return Err(PipelineError::EmptyPrompt);
        }

        let providers = self.registry.list_available();
        if providers.is_empty() {
            return Err(PipelineError::NoProvidersConfigured);
        }

        let mut last_error = None;

        for provider in providers {
            info!(provider = %provider.name, "trying provider");
            emitter.emit(ProgressEvent::provider_starting(&provider.name));

            match self.invoker.invoke(provider, prompt, emitter).await {
                Ok(outcome) => {
                    info!(provider = %provider.name, corrected = outcome.corrected, "conversion succeeded");
                    return Ok(ConversionOutcome {
                        provider: provider.name.clone(),
                        result: outcome.result,
                        corrected: outcome.corrected,
                    });
                }
                Err(e) => {
                    emitter.emit(ProgressEvent::ProviderError {
                        provider: provider.name.clone(),
                        error: e.to_string(),
                    });

                    if !e.is_retryable() {
                        error!(provider = %provider.name, kind = %e.kind(), error = %e, "non-retryable failure, aborting");
                        return Err(PipelineError::Fatal(e));
                    }

                    warn!(provider = %provider.name, kind = %e.kind(), error = %e, "provider failed, falling back");
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) => Err(PipelineError::AllProvidersFailed(e)),
            None => Err(PipelineError::NoProvidersConfigured),
        }
    }
}
