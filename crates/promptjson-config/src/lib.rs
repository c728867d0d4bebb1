pub mod config;
pub mod manager;

pub use config::{
    AuthConfig, Config, ConfigError, ConfigResult, CounterBackend, DemoConfig, LlmConfig, LogLevel,
    LoggingConfig, PipelineConfig, ProviderKind, ProviderSettings, ServerConfig, StorageConfig,
    StorageType,
};
pub use manager::ConfigManager;

use std::path::PathBuf;

/// Application data directory (`~/.promptjson`)
pub fn app_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".promptjson"))
}

/// Default config file path
pub fn default_config_path() -> Option<PathBuf> {
    app_dir().map(|dir| dir.join("config.json"))
}

/// Default location of the JSONL conversion store
pub fn default_store_path() -> Option<PathBuf> {
    app_dir().map(|dir| dir.join("conversions.jsonl"))
}

/// Expand a leading `~/` to the home directory
pub fn expand_tilde(path: &str) -> Option<PathBuf> {
    if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir().map(|home| home.join(rest))
    } else {
        Some(PathBuf::from(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_dir() {
        let dir = app_dir();
        assert!(dir.is_some());
        assert!(dir.unwrap().to_string_lossy().contains(".promptjson"));
    }

    #[test]
    fn test_expand_tilde() {
        let expanded = expand_tilde("~/.promptjson/config.json");
        assert!(expanded.is_some());
        assert!(!expanded.unwrap().to_string_lossy().starts_with('~'));

        assert_eq!(expand_tilde("/tmp/x.json"), Some(PathBuf::from("/tmp/x.json")));
    }
}
