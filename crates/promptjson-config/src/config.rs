use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub pipeline: PipelineConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    pub demo: DemoConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Look up a value by dotted key, e.g. `server.port`
    pub fn get_value(&self, key: &str) -> Option<String> {
        let parts: Vec<&str> = key.split('.').collect();
        match parts.as_slice() {
            ["server", "port"] => Some(self.server.port.to_string()),
            ["server", "host"] => Some(self.server.host.clone()),
            ["server", "cors"] => Some(self.server.cors.to_string()),
            ["llm", "providers"] => Some(
                self.llm
                    .providers
                    .iter()
                    .map(|p| p.name.as_str())
                    .collect::<Vec<_>>()
                    .join(","),
            ),
            ["pipeline", "max_attempts"] => Some(self.pipeline.max_attempts.to_string()),
            ["pipeline", "attempt_timeout_secs"] => {
                Some(self.pipeline.attempt_timeout_secs.to_string())
            }
            ["pipeline", "transport_retries"] => Some(self.pipeline.transport_retries.to_string()),
            ["storage", "type"] => Some(format!("{:?}", self.storage.storage_type).to_lowercase()),
            ["storage", "path"] => self.storage.path.clone(),
            ["demo", "limit"] => Some(self.demo.limit.to_string()),
            ["demo", "window_secs"] => Some(self.demo.window_secs.to_string()),
            ["demo", "counters"] => Some(format!("{:?}", self.demo.counters).to_lowercase()),
            ["logging", "level"] => Some(self.logging.level.as_str().to_string()),
            ["logging", "json_format"] => Some(self.logging.json_format.to_string()),
            _ => None,
        }
    }
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            host: "127.0.0.1".to_string(),
            cors: true,
        }
    }
}

/// LLM backends, in fallback priority order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    pub providers: Vec<ProviderSettings>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            providers: vec![
                ProviderSettings::new(
                    "gemini",
                    ProviderKind::OpenAiCompatible,
                    "https://generativelanguage.googleapis.com/v1beta/openai",
                    "gemini-1.5-flash",
                    "GOOGLE_GEMINI_API_KEY",
                ),
                ProviderSettings::new(
                    "mistral",
                    ProviderKind::OpenAiCompatible,
                    "https://api.mistral.ai/v1",
                    "mistral-large-latest",
                    "MISTRAL_API_KEY",
                ),
                ProviderSettings::new(
                    "cohere",
                    ProviderKind::Cohere,
                    "https://api.cohere.com/v2",
                    "command",
                    "COHERE_API_KEY",
                ),
            ],
        }
    }
}

/// Wire protocol spoken by a provider
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    #[serde(rename = "openai_compatible", alias = "open_ai_compatible")]
    OpenAiCompatible,
    Cohere,
}

/// One configured LLM backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderSettings {
    pub name: String,
    pub kind: ProviderKind,
    pub base_url: String,
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Environment variable holding the API key
    pub api_key_env: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl ProviderSettings {
    pub fn new(
        name: impl Into<String>,
        kind: ProviderKind,
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key_env: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            base_url: base_url.into(),
            model: model.into(),
            temperature: default_temperature(),
            api_key_env: api_key_env.into(),
            enabled: true,
            timeout_seconds: default_timeout_seconds(),
        }
    }

    /// Credential from the environment, if present and non-empty
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
    }
}

fn default_temperature() -> f32 {
    0.1
}

fn default_true() -> bool {
    true
}

fn default_timeout_seconds() -> u64 {
    60
}

/// Retry and timeout policy of a conversion run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Attempts per provider before falling back
    pub max_attempts: u32,
    /// Upper bound for one provider attempt
    pub attempt_timeout_secs: u64,
    /// HTTP-level retries of transient failures inside one call
    pub transport_retries: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            attempt_timeout_secs: 60,
            transport_retries: 1,
        }
    }
}

/// Bearer token to user id mapping. Empty means development mode.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct AuthConfig {
    pub tokens: HashMap<String, String>,
}

/// Conversion store backend
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    Memory,
    #[default]
    Jsonl,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    #[serde(rename = "type")]
    pub storage_type: StorageType,
    pub path: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            storage_type: StorageType::Jsonl,
            path: Some("~/.promptjson/conversions.jsonl".to_string()),
        }
    }
}

/// Counter store backend for the demo quota
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CounterBackend {
    #[default]
    Memory,
    Redis,
}

/// Unauthenticated demo access
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DemoConfig {
    pub enabled: bool,
    /// Conversions allowed per client and window
    pub limit: u64,
    pub window_secs: u64,
    pub token_ttl_secs: u64,
    pub counters: CounterBackend,
    pub redis_url: String,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            limit: 3,
            window_secs: 24 * 60 * 60,
            token_ttl_secs: 24 * 60 * 60,
            counters: CounterBackend::Memory,
            redis_url: "redis://localhost:6379".to_string(),
        }
    }
}

/// Log level
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> ConfigResult<Self> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(ConfigError::Validation(format!("Invalid log level: {}", s))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub json_format: bool,
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
