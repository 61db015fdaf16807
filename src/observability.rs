//! Shared logging configuration, subscriber setup and run lifecycle events.

use std::env;
use std::error::Error as StdError;
use std::path::Path;

use thiserror::Error;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

pub const LOG_LEVEL_ENV: &str = "BRIDGE_LOG_LEVEL";
pub const LOG_FORMAT_ENV: &str = "BRIDGE_LOG_FORMAT";
pub const LOG_TARGET_ENV: &str = "BRIDGE_LOG_TARGET";

const COMPONENT: &str = "bridge_pipeline";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Pretty => "pretty",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "pretty" => Some(Self::Pretty),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            include_target: true,
        }
    }
}

impl LoggingConfig {
    /// Builds the config from a key lookup; blank or unparsable values keep the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let value = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty())
        };

        if let Some(level) = value(LOG_LEVEL_ENV) {
            config.level = level;
        }
        if let Some(format) = value(LOG_FORMAT_ENV).as_deref().and_then(LogFormat::parse) {
            config.format = format;
        }
        if let Some(include_target) = value(LOG_TARGET_ENV).as_deref().and_then(parse_bool) {
            config.include_target = include_target;
        }

        config
    }
}

#[derive(Debug, Error)]
pub enum LoggingInitError {
    #[error("logging already initialized: {0}")]
    AlreadyInitialized(#[from] tracing::subscriber::SetGlobalDefaultError),
}

pub fn logging_config_from_env() -> LoggingConfig {
    LoggingConfig::from_lookup(|key| env::var(key).ok())
}

pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingInitError> {
    let env_filter =
        EnvFilter::try_new(config.level.clone()).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(config.include_target)
        .with_ansi(matches!(config.format, LogFormat::Pretty));

    match config.format {
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish())?,
        LogFormat::Pretty => tracing::subscriber::set_global_default(builder.pretty().finish())?,
    }

    Ok(())
}

pub fn log_app_start(config: &LoggingConfig, mode: &str) {
    info!(
        component = COMPONENT,
        event = "app.start",
        mode,
        log_level = %config.level,
        log_format = config.format.as_str(),
        include_target = config.include_target
    );
}

pub fn log_config_loaded(config_path: &Path, ticker: &str, weeks_back: u32, time_steps: usize) {
    info!(
        component = COMPONENT,
        event = "config.loaded",
        config_path = %config_path.display(),
        ticker,
        weeks_back,
        time_steps
    );
}

pub fn log_app_finish(mode: &str, ticker: &str, elapsed_ms: u64, artifacts_written: usize) {
    info!(
        component = COMPONENT,
        event = "app.finish",
        mode,
        ticker,
        elapsed_ms,
        artifacts_written
    );
}

pub fn log_app_failed(mode: &str, elapsed_ms: u64, err: &dyn StdError) {
    let mut causes = Vec::new();
    let mut source = err.source();
    while let Some(cause) = source {
        causes.push(cause.to_string());
        source = cause.source();
    }
    error!(
        component = COMPONENT,
        event = "app.failed",
        mode,
        elapsed_ms,
        error = %err,
        causes = ?causes
    );
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
