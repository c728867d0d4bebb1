use std::collections::HashMap;
use std::time::Duration;

/// Connection settings of one provider client
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Provider ID, also the name reported in progress events
    pub provider_id: String,
    /// Base URL for the API, without trailing slash
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    /// Whole-request timeout, including the streamed body
    pub timeout: Duration,
    /// Transport-level retries of transient HTTP failures
    pub transport_retries: u32,
    /// Additional headers to include
    pub headers: HashMap<String, String>,
}

impl ProviderConfig {
    pub fn new(provider_id: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: String::new(),
            model: String::new(),
            timeout: Duration::from_secs(60),
            transport_retries: 1,
            headers: HashMap::new(),
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = key.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_transport_retries(mut self, retries: u32) -> Self {
        self.transport_retries = retries;
        self
    }

    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    /// Join the base URL and an endpoint path
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_without_double_slash() {
        let config = ProviderConfig::new("mistral", "https://api.mistral.ai/v1/");
        assert_eq!(config.endpoint("/chat/completions"), "https://api.mistral.ai/v1/chat/completions");
        assert_eq!(config.endpoint("chat"), "https://api.mistral.ai/v1/chat");
    }

    #[test]
    fn test_builder() {
        let config = ProviderConfig::new("cohere", "https://api.cohere.com/v2")
            .with_api_key("key")
            .with_model("command")
            .with_timeout(Duration::from_secs(5))
            .with_transport_retries(0);
        assert_eq!(config.api_key, "key");
        assert_eq!(config.model, "command");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.transport_retries, 0);
    }
}
