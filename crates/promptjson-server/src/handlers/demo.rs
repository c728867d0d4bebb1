//! Unauthenticated demo endpoints with a per-client quota.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    Json,
};
use promptjson_core::{EventEmitter, StructuredResult};
use serde::Serialize;
use tracing::{debug, info, warn, Instrument};

use super::{require_prompt, ApiResponse, ConvertRequest};
use crate::counters::{DemoGate, DemoUsage};
use crate::error::ApiError;
use crate::middleware::ClientAddr;
use crate::state::AppState;

pub const DEMO_TOKEN_HEADER: &str = "x-demo-token";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub token: String,
    pub expires_in: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DemoConvertResponse {
    pub original_prompt: String,
    pub generated_json: StructuredResult,
    pub llm_provider: String,
    pub is_demo: bool,
}

fn demo_gate(state: &AppState) -> Result<&DemoGate, ApiError> {
    state
        .demo
        .as_ref()
        .ok_or_else(|| ApiError::NotFound("Demo mode is disabled".to_string()))
}

/// Human-readable token lifetime, e.g. `24 hours`
fn describe_ttl(ttl: Duration) -> String {
    let secs = ttl.as_secs();
    match secs {
        s if s >= 3600 && s % 3600 == 0 => {
            let hours = s / 3600;
            format!("{} hour{}", hours, if hours == 1 { "" } else { "s" })
        }
        s if s >= 60 && s % 60 == 0 => format!("{} minutes", s / 60),
        s => format!("{} seconds", s),
    }
}

/// `POST /api/demo/generate-token`
pub async fn generate_token(
    State(state): State<Arc<AppState>>,
    client: ClientAddr,
) -> Result<Json<ApiResponse<TokenResponse>>, ApiError> {
    let gate = demo_gate(&state)?;
    let token = gate.issue_token(client.as_str()).await;

    Ok(ApiResponse::ok(TokenResponse {
        token,
        expires_in: describe_ttl(gate.token_ttl()),
    }))
}

/// `GET /api/demo/usage`
pub async fn usage(
    State(state): State<Arc<AppState>>,
    client: ClientAddr,
) -> Result<Json<ApiResponse<DemoUsage>>, ApiError> {
    let usage = demo_gate(&state)?.usage(client.as_str()).await;
    Ok(ApiResponse::ok(usage))
}

/// `POST /api/demo/convert-prompt`
///
/// Buffered conversion that is never persisted. Every valid request counts
/// against the client's window, token or not.
pub async fn convert(
    State(state): State<Arc<AppState>>,
    client: ClientAddr,
    headers: HeaderMap,
    payload: Result<Json<ConvertRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<DemoConvertResponse>>, ApiError> {
    let gate = demo_gate(&state)?;
    let prompt = require_prompt(payload)?;

    if let Some(token) = headers.get(DEMO_TOKEN_HEADER).and_then(|v| v.to_str().ok()) {
        match gate.token_owner(token).await {
            Some(owner) => debug!(client = client.as_str(), %owner, "demo token presented"),
            None => debug!(client = client.as_str(), "unknown or expired demo token"),
        }
    }

    let usage = gate.consume(client.as_str()).await;
    if usage.is_exceeded() {
        warn!(client = client.as_str(), usage = usage.usage, "demo limit reached");
        return Err(ApiError::DemoLimitReached);
    }

    let span = tracing::info_span!("demo_conversion", client = client.as_str());
    let outcome = state
        .orchestrator
        .run(&prompt, &EventEmitter::silent())
        .instrument(span)
        .await?;

    info!(client = client.as_str(), provider = %outcome.provider, "demo conversion completed");

    Ok(ApiResponse::ok(DemoConvertResponse {
        original_prompt: prompt,
        generated_json: outcome.result,
        llm_provider: outcome.provider,
        is_demo: true,
    }))
}
