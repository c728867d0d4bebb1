pub mod convert;
pub mod demo;
pub mod health;

use axum::extract::rejection::JsonRejection;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Body of every conversion request
#[derive(Debug, Deserialize)]
pub struct ConvertRequest {
    #[serde(default)]
    pub prompt: Option<String>,
}

/// `{success: true, data}` envelope
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self { success: true, data })
    }
}

/// Non-blank prompt from the request body
///
/// An unreadable body is treated like a missing prompt.
pub fn require_prompt(payload: Result<Json<ConvertRequest>, JsonRejection>) -> Result<String, ApiError> {
    let Ok(Json(request)) = payload else {
        return Err(ApiError::prompt_required());
    };
    request
        .prompt
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(ApiError::prompt_required)
}
