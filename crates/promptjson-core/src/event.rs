//! Progress events of a conversion run and the channel they travel on.
//!
//! The serialized form of [`ProgressEvent`] is the streaming wire format:
//! every frame is `data: <json>\n\n` with a `type` tag.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::schema::StructuredResult;

/// Lifecycle event of a single conversion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// Transport is open
    Connected,
    /// A provider is about to be tried
    Provider { provider: String, status: String },
    /// Incremental model output
    Chunk {
        content: String,
        #[serde(rename = "fullContent")]
        full_content: String,
        provider: String,
    },
    /// Validated result. The provider name stays off the wire.
    Complete {
        #[serde(skip_serializing, default)]
        provider: String,
        json: StructuredResult,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        corrected: bool,
    },
    /// A provider gave up and the run moves on (or stops)
    ProviderError { provider: String, error: String },
    /// An attempt failed, or the whole run failed
    Error {
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attempt: Option<u32>,
    },
    /// Result persisted
    Saved {
        #[serde(rename = "recordId")]
        record_id: String,
        success: bool,
    },
    /// Result delivered but not persisted
    SaveError { error: String },
    /// Last frame of a stream
    End,
}

impl ProgressEvent {
    pub fn provider_starting(provider: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            status: "starting".to_string(),
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self::Error {
            error: error.into(),
            attempt: None,
        }
    }

    pub fn attempt_error(error: impl Into<String>, attempt: u32) -> Self {
        Self::Error {
            error: error.into(),
            attempt: Some(attempt),
        }
    }

    pub fn saved(record_id: impl Into<String>) -> Self {
        Self::Saved {
            record_id: record_id.into(),
            success: true,
        }
    }

    /// Wire tag of this event
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Provider { .. } => "provider",
            Self::Chunk { .. } => "chunk",
            Self::Complete { .. } => "complete",
            Self::ProviderError { .. } => "provider_error",
            Self::Error { .. } => "error",
            Self::Saved { .. } => "saved",
            Self::SaveError { .. } => "save_error",
            Self::End => "end",
        }
    }

    /// Serialize as one `data: <json>\n\n` frame
    pub fn to_frame(&self) -> String {
        let json = serde_json::to_string(self)
            .unwrap_or_else(|e| format!(r#"{{"type":"error","error":"{}"}}"#, e));
        format!("data: {}\n\n", json)
    }
}

/// Ordered sink for progress events
///
/// Backed by an unbounded channel so emitting never suspends the run.
/// A silent emitter drops everything, which is what buffered callers use.
#[derive(Debug, Clone)]
pub struct EventEmitter {
    sender: Option<mpsc::UnboundedSender<ProgressEvent>>,
}

impl EventEmitter {
    /// Create an emitter and the receiver that observes its events in order
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender: Some(sender) }, receiver)
    }

    /// Emitter that discards every event
    pub fn silent() -> Self {
        Self { sender: None }
    }

    pub fn emit(&self, event: ProgressEvent) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(event);
        }
    }

    /// True once the receiving side has gone away
    pub fn is_closed(&self) -> bool {
        self.sender.as_ref().map_or(false, |s| s.is_closed())
    }

    /// Resolves when the receiver is dropped. Never resolves for a silent emitter.
    pub async fn closed(&self) {
        match &self.sender {
            Some(sender) => sender.closed().await,
            None => std::future::pending::<()>().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn wire(event: &ProgressEvent) -> Value {
        serde_json::to_value(event).unwrap()
    }

    #[test]
    fn test_chunk_wire_shape() {
        let event = ProgressEvent::Chunk {
            content: "ar".to_string(),
            full_content: "{\"action\":\"summ".to_string(),
            provider: "gemini".to_string(),
        };
        assert_eq!(
            wire(&event),
            json!({"type": "chunk", "content": "ar", "fullContent": "{\"action\":\"summ", "provider": "gemini"})
        );
    }

    #[test]
    fn test_complete_omits_provider() {
        let event = ProgressEvent::Complete {
            provider: "mistral".to_string(),
            json: StructuredResult::new("summarize", "Summarize it"),
            corrected: false,
        };
        assert_eq!(
            wire(&event),
            json!({"type": "complete", "json": {"action": "summarize", "original_prompt": "Summarize it"}})
        );
    }

    #[test]
    fn test_corrected_flag_only_when_set() {
        let event = ProgressEvent::Complete {
            provider: "mistral".to_string(),
            json: StructuredResult::new("a", "b"),
            corrected: true,
        };
        assert_eq!(wire(&event)["corrected"], json!(true));
    }

    #[test]
    fn test_small_events() {
        assert_eq!(wire(&ProgressEvent::Connected), json!({"type": "connected"}));
        assert_eq!(wire(&ProgressEvent::End), json!({"type": "end"}));
        assert_eq!(
            wire(&ProgressEvent::provider_starting("cohere")),
            json!({"type": "provider", "provider": "cohere", "status": "starting"})
        );
        assert_eq!(
            wire(&ProgressEvent::saved("abc")),
            json!({"type": "saved", "recordId": "abc", "success": true})
        );
        assert_eq!(
            wire(&ProgressEvent::SaveError { error: "disk full".to_string() }),
            json!({"type": "save_error", "error": "disk full"})
        );
        assert_eq!(
            wire(&ProgressEvent::error("boom")),
            json!({"type": "error", "error": "boom"})
        );
    }

    #[test]
    fn test_frame_format() {
        assert_eq!(ProgressEvent::End.to_frame(), "data: {\"type\":\"end\"}\n\n");
    }

    #[test]
    fn test_kind_matches_tag() {
        let event = ProgressEvent::ProviderError {
            provider: "gemini".to_string(),
            error: "rate limited".to_string(),
        };
        assert_eq!(wire(&event)["type"], json!(event.kind()));
    }

    #[tokio::test]
    async fn test_emitter_preserves_order() {
        let (emitter, mut rx) = EventEmitter::channel();
        emitter.emit(ProgressEvent::Connected);
        emitter.emit(ProgressEvent::provider_starting("gemini"));
        emitter.emit(ProgressEvent::End);
        drop(emitter);

        let mut kinds = Vec::new();
        while let Some(event) = rx.recv().await {
            kinds.push(event.kind());
        }
        assert_eq!(kinds, vec!["connected", "provider", "end"]);
    }

    #[tokio::test]
    async fn test_emitter_reports_closed_receiver() {
        let (emitter, rx) = EventEmitter::channel();
        assert!(!emitter.is_closed());
        drop(rx);
        assert!(emitter.is_closed());
        emitter.closed().await;
        emitter.emit(ProgressEvent::End);
    }

    #[test]
    fn test_silent_emitter() {
        let emitter = EventEmitter::silent();
        emitter.emit(ProgressEvent::Connected);
        assert!(!emitter.is_closed());
    }
}
