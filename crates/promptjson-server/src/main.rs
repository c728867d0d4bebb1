use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use promptjson_config::{ConfigManager, LogLevel};
use promptjson_server::{init_logging, run_server, AppState};

#[derive(Parser, Debug, Clone)]
#[command(name = "promptjson-server")]
#[command(about = "Converts natural-language prompts into structured JSON")]
#[command(version)]
struct Cli {
    /// Config file path
    #[arg(long, env = "PROMPTJSON_CONFIG", default_value = "~/.promptjson/config.json")]
    config: String,

    /// Server port (overrides config)
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// Bind address (overrides config)
    #[arg(long, env = "HOST")]
    host: Option<String>,

    /// Log level (overrides config)
    #[arg(long, env = "LOG_LEVEL")]
    log_level: Option<LogLevel>,

    /// Shorthand for `--log-level debug`
    #[arg(long, env = "DEBUG", default_value = "false")]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = promptjson_config::expand_tilde(&cli.config).unwrap_or_else(|| PathBuf::from(&cli.config));
    let config_manager = ConfigManager::load(&config_path)
        .await
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;
    let config = config_manager.snapshot().await;

    let level = if cli.debug {
        LogLevel::Debug
    } else {
        cli.log_level.unwrap_or(config.logging.level)
    };
    init_logging(level, config.logging.json_format);

    let host = cli.host.unwrap_or_else(|| config.server.host.clone());
    let port = cli.port.unwrap_or(config.server.port);

    tracing::info!("Config loaded from {:?}", config_manager.path());
    tracing::debug!(
        storage = config.get_value("storage.type").as_deref().unwrap_or("?"),
        demo = config.demo.enabled,
        cors = config.server.cors,
        "Effective configuration"
    );

    let state = AppState::from_config(&config)
        .await
        .context("Failed to initialize conversion store")?;

    let order = state.orchestrator.registry().names();
    if order.is_empty() {
        tracing::warn!("No LLM providers configured. Please add at least one API key.");
    } else {
        tracing::info!("Provider order: {}", order.join(" -> "));
    }

    run_server(Arc::new(state), &host, port, config.server.cors).await
}
