//! Authenticated conversion endpoints, buffered and streaming.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use promptjson_core::{EventEmitter, NewConversion, ProgressEvent, StructuredResult};
use promptjson_llm::{ConversionOutcome, PipelineError};
use serde::Serialize;
use tracing::{info, info_span, warn, Instrument, Span};
use uuid::Uuid;

use super::{require_prompt, ApiResponse, ConvertRequest};
use crate::error::ApiError;
use crate::middleware::CallerIdentity;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertResponse {
    pub optimized_json: StructuredResult,
    /// Absent when persistence failed
    pub record_id: Option<String>,
}

fn conversion_span(user_id: &str, mode: &'static str) -> Span {
    info_span!("conversion", request_id = %Uuid::new_v4(), user = %user_id, mode)
}

/// Persist a successful run
async fn persist(
    state: &AppState,
    user_id: &str,
    prompt: &str,
    outcome: &ConversionOutcome,
) -> Result<String, String> {
    let record = state
        .store
        .create(NewConversion {
            original_prompt: prompt.to_string(),
            generated_json: outcome.result.clone(),
            llm_provider: outcome.provider.clone(),
            user_id: user_id.to_string(),
        })
        .await
        .map_err(|e| {
            warn!(error = %e, "failed to save conversion");
            e.to_string()
        })?;

    info!(record_id = %record.id, provider = %outcome.provider, "conversion saved");
    Ok(record.id)
}

/// `POST /api/convert-prompt`
pub async fn buffered(
    State(state): State<Arc<AppState>>,
    identity: CallerIdentity,
    payload: Result<Json<ConvertRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<ConvertResponse>>, ApiError> {
    let prompt = require_prompt(payload)?;
    let span = conversion_span(&identity.user_id, "buffered");

    async move {
        let outcome = state.orchestrator.run(&prompt, &EventEmitter::silent()).await?;
        let record_id = persist(&state, &identity.user_id, &prompt, &outcome).await.ok();

        Ok::<_, ApiError>(ApiResponse::ok(ConvertResponse {
            optimized_json: outcome.result,
            record_id,
        }))
    }
    .instrument(span)
    .await
}

/// `POST /api/convert-prompt/stream`
///
/// Progress is relayed as `data: <json>\n\n` frames in emission order. The
/// run is cancelled as soon as the client goes away. Without any provider
/// the request fails before the stream opens.
pub async fn stream(
    State(state): State<Arc<AppState>>,
    identity: CallerIdentity,
    payload: Result<Json<ConvertRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let prompt = require_prompt(payload)?;
    if state.orchestrator.registry().is_empty() {
        return Err(PipelineError::NoProvidersConfigured.into());
    }

    let (emitter, mut events) = EventEmitter::channel();
    let span = conversion_span(&identity.user_id, "stream");
    tokio::spawn(run_streaming(state, identity.user_id, prompt, emitter).instrument(span));

    let frames = async_stream::stream! {
        while let Some(event) = events.recv().await {
            yield Ok::<_, Infallible>(event.to_frame());
        }
    };

    let mut response = Body::from_stream(frames).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    Ok(response)
}

async fn run_streaming(state: Arc<AppState>, user_id: String, prompt: String, emitter: EventEmitter) {
    emitter.emit(ProgressEvent::Connected);

    let result = tokio::select! {
        result = state.orchestrator.run(&prompt, &emitter) => result,
        _ = emitter.closed() => {
            info!("client disconnected, conversion cancelled");
            return;
        }
    };

    match result {
        Ok(outcome) => match persist(&state, &user_id, &prompt, &outcome).await {
            Ok(record_id) => emitter.emit(ProgressEvent::saved(record_id)),
            Err(error) => emitter.emit(ProgressEvent::SaveError { error }),
        },
        Err(e) => {
            warn!(error = %e, "conversion failed");
            emitter.emit(ProgressEvent::error(e.to_string()));
        }
    }

    emitter.emit(ProgressEvent::End);
}
