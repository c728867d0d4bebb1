//! Attempts against a single provider, with one correction call after
//! malformed output.

use std::time::Duration;

use futures::StreamExt;
use promptjson_core::prompts::{correction_system_prompt, user_prompt, SYSTEM_PROMPT};
use promptjson_core::{parse_structured, EventEmitter, ProgressEvent, StructuredResult};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::error::{ErrorKind, LlmError};
use crate::provider::CompletionRequest;
use crate::registry::ProviderDescriptor;

/// Validated result of one provider
#[derive(Debug, Clone, PartialEq)]
pub struct InvokeOutcome {
    pub result: StructuredResult,
    /// Produced by the correction call
    pub corrected: bool,
}

/// A provider exhausted its attempts, or hit a non-retryable error
#[derive(Error, Debug)]
#[error("{provider} failed after {attempts} attempt(s): {source}")]
pub struct InvocationError {
    pub provider: String,
    pub attempts: u32,
    #[source]
    pub source: LlmError,
}

impl InvocationError {
    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }

    pub fn is_retryable(&self) -> bool {
        self.source.is_retryable()
    }
}

/// Per-provider attempt loop
#[derive(Debug, Clone)]
pub struct Invoker {
    max_attempts: u32,
    attempt_timeout: Duration,
}

impl Default for Invoker {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(60))
    }
}

impl Invoker {
    pub fn new(max_attempts: u32, attempt_timeout: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            attempt_timeout,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Run up to `max_attempts` attempts against one provider
    ///
    /// Every chunk is emitted as it arrives. A successful result is emitted
    /// as `complete` before returning. Failed attempts are emitted as `error`
    /// events carrying the attempt number. Non-retryable errors end the loop
    /// at once.
    pub async fn invoke(
        &self,
        provider: &ProviderDescriptor,
        prompt: &str,
        emitter: &EventEmitter,
    ) -> Result<InvokeOutcome, InvocationError> {
        let mut last_error = None;

        for attempt in 1..=self.max_attempts {
            debug!(provider = %provider.name, attempt, "starting attempt");

            let mut error = match self.attempt(provider, prompt, emitter).await {
                Ok(result) => return Ok(Self::complete(provider, emitter, result, false)),
                Err(e) => e,
            };

            if error.is_output_error() && attempt < self.max_attempts {
                info!(provider = %provider.name, attempt, %error, "malformed output, requesting correction");
                match self.correct(provider, prompt).await {
                    Ok(result) => return Ok(Self::complete(provider, emitter, result, true)),
                    Err(e) => error = e,
                }
            }

            warn!(provider = %provider.name, attempt, kind = %error.kind(), %error, "attempt failed");
            emitter.emit(ProgressEvent::attempt_error(error.to_string(), attempt));

            if !error.is_retryable() {
                return Err(InvocationError {
                    provider: provider.name.clone(),
                    attempts: attempt,
                    source: error,
                });
            }
            last_error = Some(error);
        }

        Err(InvocationError {
            provider: provider.name.clone(),
            attempts: self.max_attempts,
            source: last_error
                .unwrap_or_else(|| LlmError::Config("no attempts were made".to_string())),
        })
    }

    fn complete(
        provider: &ProviderDescriptor,
        emitter: &EventEmitter,
        result: StructuredResult,
        corrected: bool,
    ) -> InvokeOutcome {
        emitter.emit(ProgressEvent::Complete {
            provider: provider.name.clone(),
            json: result.clone(),
            corrected,
        });
        InvokeOutcome { result, corrected }
    }

    /// One streamed (or buffered, for providers without streaming) call
    async fn attempt(
        &self,
        provider: &ProviderDescriptor,
        prompt: &str,
        emitter: &EventEmitter,
    ) -> Result<StructuredResult, LlmError> {
        let request = CompletionRequest::new(SYSTEM_PROMPT, user_prompt(prompt), provider.temperature);

        let work = async {
            let content = if provider.client.metadata().capabilities.streaming {
                let mut stream = provider.client.stream_invoke(request).await?;
                let mut full_content = String::new();
                while let Some(piece) = stream.next().await {
                    let piece = piece?;
                    full_content.push_str(&piece);
                    emitter.emit(ProgressEvent::Chunk {
                        content: piece,
                        full_content: full_content.clone(),
                        provider: provider.name.clone(),
                    });
                }
                full_content
            } else {
                provider.client.invoke(request).await?
            };

            Ok::<_, LlmError>(parse_structured(&content)?)
        };

        self.with_timeout(work).await
    }

    /// Non-streaming retry that restates the required structure
    async fn correct(
        &self,
        provider: &ProviderDescriptor,
        prompt: &str,
    ) -> Result<StructuredResult, LlmError> {
        let request = CompletionRequest::new(
            correction_system_prompt(),
            user_prompt(prompt),
            provider.temperature,
        );

        let work = async {
            let content = provider.client.invoke(request).await?;
            Ok::<_, LlmError>(parse_structured(&content)?)
        };

        self.with_timeout(work).await
    }

    async fn with_timeout<F>(&self, work: F) -> Result<StructuredResult, LlmError>
    where
        F: std::future::Future<Output = Result<StructuredResult, LlmError>>,
    {
        tokio::time::timeout(self.attempt_timeout, work)
            .await
            .map_err(|_| LlmError::Timeout(self.attempt_timeout.as_secs()))?
    }
}
