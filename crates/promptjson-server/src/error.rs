use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use promptjson_llm::PipelineError;
use serde_json::json;
use thiserror::Error;

/// Error returned by HTTP handlers
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Demo limit reached. Please sign up for unlimited access.")]
    DemoLimitReached,

    #[error("{0}")]
    Configuration(String),

    #[error("{0}")]
    Conversion(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn prompt_required() -> Self {
        Self::Validation("Prompt is required".to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::DemoLimitReached => StatusCode::TOO_MANY_REQUESTS,
            Self::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Conversion(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        let message = err.to_string();
        match err {
            PipelineError::EmptyPrompt => Self::Validation(message),
            PipelineError::NoProvidersConfigured => Self::Configuration(message),
            _ => Self::Conversion(message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "request rejected");
        }

        let body = match &self {
            Self::DemoLimitReached => json!({
                "success": false,
                "error": self.to_string(),
                "limitReached": true,
            }),
            _ => json!({
                "success": false,
                "error": self.to_string(),
            }),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_error_mapping() {
        assert_eq!(
            ApiError::from(PipelineError::NoProvidersConfigured).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::from(PipelineError::EmptyPrompt).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::DemoLimitReached.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            ApiError::Internal("disk full".to_string()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_limit_body_flags_limit_reached() {
        let response = ApiError::DemoLimitReached.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["limitReached"], true);
    }
}
