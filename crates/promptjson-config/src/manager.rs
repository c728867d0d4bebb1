use crate::config::{Config, ConfigError, ConfigResult};
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Loads, validates and persists the configuration file
#[derive(Clone)]
pub struct ConfigManager {
    path: PathBuf,
    config: Arc<RwLock<Config>>,
}

impl ConfigManager {
    /// Load the config file, writing defaults first if it does not exist
    pub async fn load(path: &Path) -> ConfigResult<Self> {
        let config = if path.exists() {
            info!("Loading config from {:?}", path);
            let content = tokio::fs::read_to_string(path).await?;
            let content = Self::expand_env_vars(&content)?;
            let config: Config = serde_json::from_str(&content)?;
            Self::validate(&config)?;
            config
        } else {
            info!("Config file not found, creating default config at {:?}", path);
            let default_config = Config::default();
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            let content = serde_json::to_string_pretty(&default_config)?;
            tokio::fs::write(path, &content).await?;
            default_config
        };

        Ok(Self {
            path: path.to_path_buf(),
            config: Arc::new(RwLock::new(config)),
        })
    }

    /// Load from `~/.promptjson/config.json`
    pub async fn load_default() -> ConfigResult<Self> {
        let path = crate::default_config_path()
            .ok_or_else(|| ConfigError::InvalidPath("Could not find home directory".to_string()))?;
        Self::load(&path).await
    }

    /// Wrap an in-memory config (tests, embedding)
    pub fn new(config: Config, path: PathBuf) -> Self {
        Self {
            path,
            config: Arc::new(RwLock::new(config)),
        }
    }

    pub fn get(&self) -> Arc<RwLock<Config>> {
        Arc::clone(&self.config)
    }

    /// Clone of the current configuration
    pub async fn snapshot(&self) -> Config {
        self.config.read().await.clone()
    }

    pub async fn save(&self) -> ConfigResult<()> {
        let content = {
            let config = self.config.read().await;
            serde_json::to_string_pretty(&*config)?
        };

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(&self.path, content).await?;
        info!("Config saved to {:?}", self.path);
        Ok(())
    }

    /// Apply a change and persist it
    pub async fn update<F>(&self, f: F) -> ConfigResult<()>
    where
        F: FnOnce(&mut Config),
    {
        {
            let mut config = self.config.write().await;
            let mut next = config.clone();
            f(&mut next);
            Self::validate(&next)?;
            *config = next;
        }
        self.save().await
    }

    pub fn validate(config: &Config) -> ConfigResult<()> {
        if config.server.port == 0 {
            return Err(ConfigError::Validation("Server port cannot be 0".to_string()));
        }

        if config.pipeline.max_attempts == 0 {
            return Err(ConfigError::Validation(
                "pipeline.max_attempts must be greater than 0".to_string(),
            ));
        }

        if config.pipeline.attempt_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "pipeline.attempt_timeout_secs must be greater than 0".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for provider in &config.llm.providers {
            if provider.name.trim().is_empty() {
                return Err(ConfigError::Validation("Provider name cannot be empty".to_string()));
            }
            if !seen.insert(provider.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "Duplicate provider '{}'",
                    provider.name
                )));
            }
            if !(0.0..=2.0).contains(&provider.temperature) {
                return Err(ConfigError::Validation(format!(
                    "Provider '{}' temperature must be within 0.0-2.0",
                    provider.name
                )));
            }
        }

        Ok(())
    }

    /// Expand `${VAR}` and `${VAR:-default}`
    fn expand_env_vars(content: &str) -> ConfigResult<String> {
        let re = Regex::new(r"\$\{([^}]+)\}")
            .map_err(|e| ConfigError::Validation(e.to_string()))?;
        let mut result = content.to_string();

        for cap in re.captures_iter(content) {
            let (Some(full), Some(expr)) = (cap.get(0), cap.get(1)) else {
                continue;
            };

            let (var_name, default_value) = match expr.as_str().split_once(":-") {
                Some((name, default)) => (name, Some(default)),
                None => (expr.as_str(), None),
            };

            let replacement = match std::env::var(var_name) {
                Ok(val) => val,
                Err(_) => match default_value {
                    Some(default) => default.to_string(),
                    None => return Err(ConfigError::EnvVarNotFound(var_name.to_string())),
                },
            };

            result = result.replace(full.as_str(), &replacement);
        }

        Ok(result)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
