use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::{LlmError, Result};
use crate::provider::base::chat_messages;
use crate::provider::{
    BaseProvider, CompletionRequest, LlmProvider, ProviderCapabilities, ProviderConfig,
    ProviderMetadata, StreamStep, TextStream, WireFormat,
};

/// Cohere v2 `/chat` shapes
#[derive(Debug, Default, Clone, Copy)]
pub struct CohereFormat;

impl CohereFormat {
    fn event_type<'a>(event: &'a str, chunk: &'a Value) -> &'a str {
        if !event.is_empty() {
            return event;
        }
        chunk.get("type").and_then(Value::as_str).unwrap_or_default()
    }
}

impl WireFormat for CohereFormat {
    fn endpoint(&self) -> &'static str {
        "chat"
    }

    fn build_body(&self, model: &str, request: &CompletionRequest, stream: bool) -> Value {
        json!({
            "model": model,
            "messages": chat_messages(request),
            "temperature": request.temperature,
            "stream": stream,
        })
    }

    fn parse_response(&self, body: &Value) -> Result<String> {
        let parts = body
            .pointer("/message/content")
            .and_then(Value::as_array)
            .ok_or_else(|| LlmError::InvalidResponse("missing message.content".to_string()))?;

        let text: String = parts
            .iter()
            .filter(|part| part.get("type").and_then(Value::as_str) == Some("text"))
            .filter_map(|part| part.get("text").and_then(Value::as_str))
            .collect();

        if text.is_empty() {
            return Err(LlmError::InvalidResponse("no text content in response".to_string()));
        }
        Ok(text)
    }

    fn parse_stream_event(&self, event: &str, data: &str) -> Result<StreamStep> {
        let data = data.trim();
        if data.is_empty() {
            return Ok(StreamStep::Skip);
        }

        let chunk: Value = serde_json::from_str(data)
            .map_err(|e| LlmError::Stream(format!("invalid chunk: {}", e)))?;

        Ok(match Self::event_type(event, &chunk) {
            "content-delta" => chunk
                .pointer("/delta/message/content/text")
                .and_then(Value::as_str)
                .map(|text| StreamStep::Text(text.to_string()))
                .unwrap_or(StreamStep::Skip),
            "message-end" => StreamStep::Done,
            _ => StreamStep::Skip,
        })
    }
}

/// Provider for the Cohere v2 chat API
pub struct CohereProvider {
    base: BaseProvider<CohereFormat>,
}

impl CohereProvider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let metadata = ProviderMetadata {
            id: config.provider_id.clone(),
            name: "Cohere".to_string(),
            model: config.model.clone(),
            capabilities: ProviderCapabilities {
                streaming: true,
                json_mode: true,
            },
        };

        Ok(Self {
            base: BaseProvider::new(config, CohereFormat, metadata)?,
        })
    }
}

#[async_trait]
impl LlmProvider for CohereProvider {
    fn provider_id(&self) -> &str {
        self.base.provider_id()
    }

    fn metadata(&self) -> &ProviderMetadata {
        self.base.metadata()
    }

    async fn invoke(&self, request: CompletionRequest) -> Result<String> {
        self.base.invoke(request).await
    }

    async fn stream_invoke(&self, request: CompletionRequest) -> Result<TextStream> {
        self.base.stream_invoke(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use futures::StreamExt;
    use std::time::Duration;

    fn provider(url: &str) -> CohereProvider {
        let config = ProviderConfig::new("cohere", url)
            .with_api_key("co-key")
            .with_model("command")
            .with_timeout(Duration::from_secs(5))
            .with_transport_retries(0);
        CohereProvider::new(config).unwrap()
    }

    fn request() -> CompletionRequest {
        CompletionRequest::new("system", "Compare A and B", 0.1)
    }

    #[test]
    fn test_parse_response_joins_text_parts() {
        let body = json!({
            "message": {
                "role": "assistant",
                "content": [
                    {"type": "text", "text": "{\"action\":"},
                    {"type": "text", "text": "\"compare\"}"}
                ]
            }
        });
        assert_eq!(
            CohereFormat.parse_response(&body).unwrap(),
            "{\"action\":\"compare\"}"
        );
        assert!(CohereFormat.parse_response(&json!({"message": {}})).is_err());
    }

    #[test]
    fn test_parse_stream_event_uses_type_field() {
        let delta = r#"{"type":"content-delta","index":0,"delta":{"message":{"content":{"text":"hi"}}}}"#;
        assert_eq!(
            CohereFormat.parse_stream_event("", delta).unwrap(),
            StreamStep::Text("hi".to_string())
        );
        assert_eq!(
            CohereFormat
                .parse_stream_event("message-start", r#"{"type":"message-start"}"#)
                .unwrap(),
            StreamStep::Skip
        );
        assert_eq!(
            CohereFormat
                .parse_stream_event("", r#"{"type":"message-end","delta":{"finish_reason":"COMPLETE"}}"#)
                .unwrap(),
            StreamStep::Done
        );
    }

    #[tokio::test]
    async fn test_invoke() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat")
            .match_header("authorization", "Bearer co-key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"message":{"role":"assistant","content":[{"type":"text","text":"done"}]}}"#)
            .create_async()
            .await;

        assert_eq!(provider(&server.url()).invoke(request()).await.unwrap(), "done");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_stream_invoke() {
        let mut server = mockito::Server::new_async().await;
        let body = concat!(
            "event: message-start\n",
            "data: {\"type\":\"message-start\"}\n\n",
            "event: content-delta\n",
            "data: {\"type\":\"content-delta\",\"index\":0,\"delta\":{\"message\":{\"content\":{\"text\":\"{\\\"action\\\":\"}}}}\n\n",
            "event: content-delta\n",
            "data: {\"type\":\"content-delta\",\"index\":0,\"delta\":{\"message\":{\"content\":{\"text\":\"\\\"compare\\\"}\"}}}}\n\n",
            "event: message-end\n",
            "data: {\"type\":\"message-end\"}\n\n",
        );
        server
            .mock("POST", "/chat")
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(body)
            .create_async()
            .await;

        let stream = provider(&server.url()).stream_invoke(request()).await.unwrap();
        let text: String = stream.map(|piece| piece.unwrap()).collect::<Vec<_>>().await.concat();
        assert_eq!(text, "{\"action\":\"compare\"}");
    }

    #[tokio::test]
    async fn test_server_error_is_retryable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat")
            .with_status(503)
            .with_body("unavailable")
            .create_async()
            .await;

        let err = provider(&server.url()).invoke(request()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Network);
        assert!(err.is_retryable());
    }
}
