//! YAML run configuration: ticker, lookback, market windows, bridge grid and
//! output directories.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::returns::{ExtractError, WindowSpec};

pub const DEFAULT_TIMEZONE: &str = "America/New_York";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub data: DataConfig,
    pub bridge: BridgeConfig,
    pub paths: PathsConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataConfig {
    pub ticker: String,
    pub weeks_back: u32,
    pub interval: String,
    pub market_open: String,
    pub market_close: String,
    pub open_window: String,
    pub close_start: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    pub time_steps: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathsConfig {
    pub raw_data: PathBuf,
    pub processed_data: PathBuf,
    pub results_tables: PathBuf,
    pub results_figures: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub http_timeout_ms: u64,
    /// Coarser intervals tried in order when a chunk fails at `data.interval`.
    pub fallback_intervals: Vec<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            http_timeout_ms: 15_000,
            fallback_intervals: Vec::new(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}

pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse_config(&raw)?;

    info!(
        component = "config",
        event = "config.parsed",
        path = %path.display(),
        ticker = %config.data.ticker,
        interval = %config.data.interval,
        fallback_intervals = ?config.fetch.fallback_intervals
    );

    Ok(config)
}

pub fn parse_config(raw: &str) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = serde_yaml::from_str(raw)?;
    config.validate()?;
    Ok(config)
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data.ticker.trim().is_empty() {
            return Err(ConfigError::InvalidConfiguration(
                "data.ticker must not be empty".to_string(),
            ));
        }
        if self.data.weeks_back == 0 {
            return Err(ConfigError::InvalidConfiguration(
                "data.weeks_back must be > 0".to_string(),
            ));
        }
        if self.data.interval.trim().is_empty() {
            return Err(ConfigError::InvalidConfiguration(
                "data.interval must not be empty".to_string(),
            ));
        }
        if self.bridge.time_steps < 2 {
            return Err(ConfigError::InvalidConfiguration(format!(
                "bridge.time_steps must be >= 2, got {}",
                self.bridge.time_steps
            )));
        }
        if self.fetch.http_timeout_ms == 0 {
            return Err(ConfigError::InvalidConfiguration(
                "fetch.http_timeout_ms must be > 0".to_string(),
            ));
        }

        self.window_spec()?;
        self.timezone()?;
        Ok(())
    }

    pub fn window_spec(&self) -> Result<WindowSpec, ConfigError> {
        let spec = WindowSpec {
            market_open: parse_time_of_day("data.market_open", &self.data.market_open)?,
            open_window_end: parse_time_of_day("data.open_window", &self.data.open_window)?,
            close_window_start: parse_time_of_day("data.close_start", &self.data.close_start)?,
            market_close: parse_time_of_day("data.market_close", &self.data.market_close)?,
        };
        spec.validate().map_err(|err| match err {
            ExtractError::InvalidConfiguration(message) => {
                ConfigError::InvalidConfiguration(message)
            }
            other => ConfigError::InvalidConfiguration(other.to_string()),
        })?;
        Ok(spec)
    }

    pub fn timezone(&self) -> Result<Tz, ConfigError> {
        self.data.timezone.trim().parse::<Tz>().map_err(|_| {
            ConfigError::InvalidConfiguration(format!(
                "data.timezone '{}' is not a known IANA time zone",
                self.data.timezone
            ))
        })
    }

    /// Requested interval first, then the configured fallbacks, without repeats.
    pub fn resolution_ladder(&self) -> Vec<String> {
        let mut ladder = vec![self.data.interval.trim().to_string()];
        for interval in &self.fetch.fallback_intervals {
            let interval = interval.trim();
            if !interval.is_empty() && !ladder.iter().any(|existing| existing == interval) {
                ladder.push(interval.to_string());
            }
        }
        ladder
    }

    pub fn raw_bars_path(&self) -> PathBuf {
        self.paths.raw_data.join(format!(
            "{}_intraday_full.csv",
            self.data.ticker.trim().to_ascii_lowercase()
        ))
    }

    pub fn ensure_output_dirs(&self) -> Result<(), ConfigError> {
        for dir in [
            &self.paths.raw_data,
            &self.paths.processed_data,
            &self.paths.results_tables,
            &self.paths.results_figures,
        ] {
            fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(())
    }
}

pub fn parse_time_of_day(field: &str, raw: &str) -> Result<NaiveTime, ConfigError> {
    let trimmed = raw.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M"))
        .map_err(|_| {
            ConfigError::InvalidConfiguration(format!(
                "{field} must be HH:MM or HH:MM:SS, got '{raw}'"
            ))
        })
}
