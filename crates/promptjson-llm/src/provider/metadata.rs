use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use crate::error::Result;

/// Stream of text pieces produced by a streaming call
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// One system + user exchange
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
}

impl CompletionRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>, temperature: f32) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            temperature,
        }
    }
}

/// LLM provider adapter
#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn provider_id(&self) -> &str;

    fn metadata(&self) -> &ProviderMetadata;

    /// Complete response text
    async fn invoke(&self, request: CompletionRequest) -> Result<String>;

    /// Response text as it is generated
    async fn stream_invoke(&self, request: CompletionRequest) -> Result<TextStream>;
}

/// Provider metadata
#[derive(Debug, Clone)]
pub struct ProviderMetadata {
    pub id: String,
    /// Human-readable name
    pub name: String,
    pub model: String,
    pub capabilities: ProviderCapabilities,
}

/// Provider capabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderCapabilities {
    /// Supports streaming responses
    pub streaming: bool,
    /// Supports a native JSON response mode
    pub json_mode: bool,
}

impl Default for ProviderCapabilities {
    fn default() -> Self {
        Self {
            streaming: true,
            json_mode: false,
        }
    }
}
