//! Structured logging setup.

use promptjson_config::LogLevel;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter directives for a level. Our crates log at `level`, dependencies at
/// `warn` unless asked for more.
fn directives(level: LogLevel) -> String {
    let level = level.as_str();
    let deps = match level {
        "debug" => "info",
        _ => "warn",
    };
    format!(
        "{deps},promptjson_server={level},promptjson_llm={level},promptjson_config={level},tower_http={level}"
    )
}

/// Install the global subscriber. `RUST_LOG` wins over `level`.
///
/// Calling this twice is harmless; the second call is ignored.
pub fn init_logging(level: LogLevel, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives(level)));
    let registry = tracing_subscriber::registry().with(filter);

    let result = if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true).with_line_number(true))
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init()
    };

    if result.is_ok() {
        tracing::debug!(level = level.as_str(), json, "logging initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directives_follow_level() {
        let debug = directives(LogLevel::Debug);
        assert!(debug.starts_with("info,"));
        assert!(debug.contains("promptjson_llm=debug"));

        let error = directives(LogLevel::Error);
        assert!(error.starts_with("warn,"));
        assert!(error.contains("promptjson_server=error"));
        assert!(EnvFilter::try_new(error).is_ok());
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init_logging(LogLevel::Info, false);
        init_logging(LogLevel::Debug, true);
    }
}
