use promptjson_core::ExtractError;
use thiserror::Error;

/// Failure class used for retry and fallback decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    RateLimit,
    Timeout,
    Network,
    MalformedOutput,
    Other,
}

impl ErrorKind {
    /// Worth another attempt or another provider
    pub fn is_retryable(self) -> bool {
        !matches!(self, Self::Other)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::RateLimit => "rate_limit",
            Self::Timeout => "timeout",
            Self::Network => "network",
            Self::MalformedOutput => "malformed_output",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified error type for provider calls
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("api error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("authentication error: {0}")]
    Auth(String),

    #[error("stream error: {0}")]
    Stream(String),

    #[error(transparent)]
    MalformedOutput(#[from] ExtractError),

    #[error("unexpected response body: {0}")]
    InvalidResponse(String),

    #[error("config error: {0}")]
    Config(String),
}

impl LlmError {
    /// Classify by variant, and by HTTP status for API errors
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network(_) | Self::Stream(_) => ErrorKind::Network,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::RateLimited(_) => ErrorKind::RateLimit,
            Self::Api { status, .. } => match status {
                429 => ErrorKind::RateLimit,
                408 | 504 => ErrorKind::Timeout,
                500 | 502 | 503 => ErrorKind::Network,
                _ => ErrorKind::Other,
            },
            Self::MalformedOutput(_) | Self::InvalidResponse(_) => ErrorKind::MalformedOutput,
            Self::Auth(_) | Self::Config(_) => ErrorKind::Other,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    /// Model output failed JSON extraction or schema validation
    pub fn is_output_error(&self) -> bool {
        matches!(self, Self::MalformedOutput(_))
    }

    /// Map a non-success HTTP status
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => Self::Auth(body),
            429 => Self::RateLimited(body),
            _ => Self::Api {
                status,
                message: body,
            },
        }
    }

    pub fn from_reqwest(err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            Self::Timeout(timeout_secs)
        } else if err.is_decode() || err.is_body() {
            Self::Stream(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }

    pub fn from_middleware(err: reqwest_middleware::Error, timeout_secs: u64) -> Self {
        match err {
            reqwest_middleware::Error::Reqwest(e) => Self::from_reqwest(e, timeout_secs),
            reqwest_middleware::Error::Middleware(e) => Self::Network(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, LlmError>;
