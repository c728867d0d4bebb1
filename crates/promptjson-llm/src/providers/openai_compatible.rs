use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::{LlmError, Result};
use crate::provider::base::chat_messages;
use crate::provider::{
    BaseProvider, CompletionRequest, LlmProvider, ProviderCapabilities, ProviderConfig,
    ProviderMetadata, StreamStep, TextStream, WireFormat,
};

/// `/chat/completions` request and response shapes
///
/// Spoken by Mistral, by Gemini's OpenAI endpoint and by most local servers.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenAiCompatibleFormat;

impl WireFormat for OpenAiCompatibleFormat {
    fn endpoint(&self) -> &'static str {
        "chat/completions"
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
        body.pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| LlmError::InvalidResponse("missing choices[0].message.content".to_string()))
    }

    fn parse_stream_event(&self, _event: &str, data: &str) -> Result<StreamStep> {
        let data = data.trim();
        if data == "[DONE]" {
            return Ok(StreamStep::Done);
        }
        if data.is_empty() {
            return Ok(StreamStep::Skip);
        }

        let chunk: Value = serde_json::from_str(data)
            .map_err(|e| LlmError::Stream(format!("invalid chunk: {}", e)))?;

        Ok(match chunk.pointer("/choices/0/delta/content").and_then(Value::as_str) {
            Some(text) => StreamStep::Text(text.to_string()),
            None => StreamStep::Skip,
        })
    }
}

/// Provider for OpenAI-compatible chat completion APIs
pub struct OpenAiCompatibleProvider {
    base: BaseProvider<OpenAiCompatibleFormat>,
}

impl OpenAiCompatibleProvider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let metadata = ProviderMetadata {
            id: config.provider_id.clone(),
            name: display_name(&config.provider_id),
            model: config.model.clone(),
            capabilities: ProviderCapabilities {
                streaming: true,
                json_mode: false,
            },
        };

        Ok(Self {
            base: BaseProvider::new(config, OpenAiCompatibleFormat, metadata)?,
        })
    }
}

fn display_name(provider_id: &str) -> String {
    match provider_id {
        "gemini" => "Google Gemini".to_string(),
        "mistral" => "Mistral AI".to_string(),
        other => format!("{} (OpenAI compatible)", other),
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
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
