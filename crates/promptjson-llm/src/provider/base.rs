use async_trait::async_trait;
use eventsource_stream::{EventStreamError, Eventsource};
use futures::{future, StreamExt};
use reqwest::{header, Client};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::error::{LlmError, Result};
use crate::provider::{CompletionRequest, LlmProvider, ProviderConfig, ProviderMetadata, TextStream};

/// Outcome of decoding one server-sent event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamStep {
    Text(String),
    /// Event without content (role headers, usage, keep-alives)
    Skip,
    /// End-of-stream marker
    Done,
}

/// Request and response shapes of one provider API
pub trait WireFormat: Send + Sync {
    /// Path appended to the base URL
    fn endpoint(&self) -> &'static str;

    fn build_body(&self, model: &str, request: &CompletionRequest, stream: bool) -> Value;

    /// Text of a non-streaming response
    fn parse_response(&self, body: &Value) -> Result<String>;

    /// Decode one SSE event (`event` is empty when the server sends no event name)
    fn parse_stream_event(&self, event: &str, data: &str) -> Result<StreamStep>;
}

/// Base provider implementation
///
/// Owns the HTTP client (with transient-failure retries), authentication
/// headers and status mapping. The wire format does the rest.
pub struct BaseProvider<T: WireFormat> {
    config: ProviderConfig,
    http_client: reqwest_middleware::ClientWithMiddleware,
    format: Arc<T>,
    metadata: ProviderMetadata,
}

impl<T: WireFormat + 'static> BaseProvider<T> {
    pub fn new(config: ProviderConfig, format: T, metadata: ProviderMetadata) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(LlmError::Config(format!(
                "missing API key for provider '{}'",
                config.provider_id
            )));
        }

        let retry_policy = ExponentialBackoff::builder()
            .base(2)
            .build_with_max_retries(config.transport_retries);

        let http_client = reqwest_middleware::ClientBuilder::new(
            Client::builder()
                .timeout(config.timeout)
                .build()
                .map_err(|e| LlmError::Config(e.to_string()))?,
        )
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build();

        Ok(Self {
            config,
            http_client,
            format: Arc::new(format),
            metadata,
        })
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    fn timeout_secs(&self) -> u64 {
        self.config.timeout.as_secs()
    }

    fn build_headers(&self) -> Result<header::HeaderMap> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, header::HeaderValue::from_static("application/json"));

        let bearer = header::HeaderValue::from_str(&format!("Bearer {}", self.config.api_key))
            .map_err(|e| LlmError::Config(format!("Invalid API key header: {}", e)))?;
        headers.insert(header::AUTHORIZATION, bearer);

        for (key, value) in &self.config.headers {
            let name = header::HeaderName::from_bytes(key.as_bytes())
                .map_err(|e| LlmError::Config(format!("Invalid header name: {}", e)))?;
            let value = header::HeaderValue::from_str(value)
                .map_err(|e| LlmError::Config(format!("Invalid header value: {}", e)))?;
            headers.insert(name, value);
        }

        Ok(headers)
    }

    async fn post(&self, body: &Value) -> Result<reqwest::Response> {
        let url = self.config.endpoint(self.format.endpoint());
        debug!(provider = %self.config.provider_id, %url, "sending request");

        let response = self
            .http_client
            .post(&url)
            .headers(self.build_headers()?)
            .json(body)
            .send()
            .await
            .map_err(|e| LlmError::from_middleware(e, self.timeout_secs()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(LlmError::from_status(status.as_u16(), error_text));
        }

        Ok(response)
    }

    /// Send a non-streaming request
    pub async fn send_request(&self, request: &CompletionRequest) -> Result<String> {
        let body = self.format.build_body(&self.config.model, request, false);
        let response = self.post(&body).await?;

        let data: Value = response
            .json()
            .await
            .map_err(|e| LlmError::from_reqwest(e, self.timeout_secs()))?;

        self.format.parse_response(&data)
    }

    /// Send a streaming request
    pub async fn send_stream_request(&self, request: &CompletionRequest) -> Result<TextStream> {
        let body = self.format.build_body(&self.config.model, request, true);
        let response = self.post(&body).await?;

        let format = Arc::clone(&self.format);
        let timeout_secs = self.timeout_secs();
        let stream = response
            .bytes_stream()
            .eventsource()
            .map(move |item| match item {
                Ok(event) => format.parse_stream_event(&event.event, &event.data),
                Err(EventStreamError::Transport(e)) => Err(LlmError::from_reqwest(e, timeout_secs)),
                Err(e) => Err(LlmError::Stream(e.to_string())),
            })
            .take_while(|step| future::ready(!matches!(step, Ok(StreamStep::Done))))
            .filter_map(|step| {
                future::ready(match step {
                    Ok(StreamStep::Text(text)) if !text.is_empty() => Some(Ok(text)),
                    Ok(_) => None,
                    Err(e) => Some(Err(e)),
                })
            });

        Ok(Box::pin(stream))
    }
}

#[async_trait]
impl<T: WireFormat + 'static> LlmProvider for BaseProvider<T> {
    fn provider_id(&self) -> &str {
        &self.config.provider_id
    }

    fn metadata(&self) -> &ProviderMetadata {
        &self.metadata
    }

    async fn invoke(&self, request: CompletionRequest) -> Result<String> {
        self.send_request(&request).await
    }

    async fn stream_invoke(&self, request: CompletionRequest) -> Result<TextStream> {
        self.send_stream_request(&request).await
    }
}

/// Messages array shared by the chat-style APIs
pub(crate) fn chat_messages(request: &CompletionRequest) -> Value {
    serde_json::json!([
        { "role": "system", "content": request.system },
        { "role": "user", "content": request.user },
    ])
}
