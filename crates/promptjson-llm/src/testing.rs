//! Scripted provider for exercising the pipeline without network access.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::{LlmError, Result};
use crate::provider::{
    CompletionRequest, LlmProvider, ProviderCapabilities, ProviderMetadata, TextStream,
};
use crate::registry::ProviderDescriptor;

/// What the provider does on one call
#[derive(Debug, Clone)]
pub enum Reply {
    /// Stream these pieces (joined for non-streaming calls)
    Chunks(Vec<String>),
    /// Fail with this HTTP status
    Status(u16),
    /// Fail at the transport level
    Network,
    /// Emit these pieces, then break the stream
    Interrupted(Vec<String>),
    /// Never answer
    Hang,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Chunks(vec![text.into()])
    }
}

/// Provider that replays a script, one reply per call
///
/// The last reply repeats once the script runs out.
pub struct ScriptedProvider {
    metadata: ProviderMetadata,
    script: Mutex<VecDeque<Reply>>,
    calls: AtomicUsize,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    pub fn new(id: impl Into<String>, script: Vec<Reply>) -> Self {
        let id = id.into();
        Self {
            metadata: ProviderMetadata {
                id: id.clone(),
                name: format!("Scripted {}", id),
                model: "scripted".to_string(),
                capabilities: ProviderCapabilities::default(),
            },
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Same reply on every call
    pub fn always(id: impl Into<String>, reply: Reply) -> Self {
        Self::new(id, vec![reply])
    }

    /// Disable streaming so the pipeline uses `invoke`
    pub fn buffered(mut self) -> Self {
        self.metadata.capabilities.streaming = false;
        self
    }

    /// Number of invoke and stream_invoke calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().await.clone()
    }

    /// Shared handle plus a descriptor for a registry
    pub fn into_descriptor(self) -> (Arc<Self>, ProviderDescriptor) {
        let provider = Arc::new(self);
        let descriptor = ProviderDescriptor::new(
            provider.metadata.id.clone(),
            Arc::clone(&provider) as Arc<dyn LlmProvider>,
            0.1,
        );
        (provider, descriptor)
    }

    async fn next_reply(&self, request: CompletionRequest) -> Reply {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().await.push(request);

        let mut script = self.script.lock().await;
        match script.len() {
            0 => Reply::Status(500),
            1 => script[0].clone(),
            _ => script.pop_front().unwrap_or(Reply::Status(500)),
        }
    }

    fn failure(&self, reply: Reply) -> LlmError {
        match reply {
            Reply::Status(status) => LlmError::from_status(
                status,
                format!("{} returned {}", self.metadata.id, status),
            ),
            _ => LlmError::Network("connection refused".to_string()),
        }
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn provider_id(&self) -> &str {
        &self.metadata.id
    }

    fn metadata(&self) -> &ProviderMetadata {
        &self.metadata
    }

    async fn invoke(&self, request: CompletionRequest) -> Result<String> {
        match self.next_reply(request).await {
            Reply::Chunks(pieces) => Ok(pieces.concat()),
            Reply::Interrupted(_) => Err(LlmError::Stream("connection reset".to_string())),
            Reply::Hang => futures::future::pending::<Result<String>>().await,
            other => Err(self.failure(other)),
        }
    }

    async fn stream_invoke(&self, request: CompletionRequest) -> Result<TextStream> {
        let items: Vec<Result<String>> = match self.next_reply(request).await {
            Reply::Chunks(pieces) => pieces.into_iter().map(Ok).collect(),
            Reply::Interrupted(pieces) => pieces
                .into_iter()
                .map(Ok)
                .chain(std::iter::once(Err(LlmError::Stream(
                    "connection reset".to_string(),
                ))))
                .collect(),
            Reply::Hang => futures::future::pending::<Vec<Result<String>>>().await,
            other => return Err(self.failure(other)),
        };
        Ok(Box::pin(futures::stream::iter(items)))
    }
}

/// Minimal valid model output
pub fn valid_output(action: &str, prompt: &str) -> String {
    serde_json::json!({ "action": action, "original_prompt": prompt }).to_string()
}
