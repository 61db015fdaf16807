//! Open/close window log-return extraction.
//!
//! Windowing rule: a return is attributed to the bar that closes it, and
//! window bounds are inclusive on both ends. Returns never span two exchange
//! calendar days, so the first bar of each day contributes no return.

use std::fmt;
use std::path::Path;

use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::intraday_bars::PriceBar;
use crate::output::{csv_bytes, write_atomic};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SampleWindow {
    Open,
    Close,
}

impl SampleWindow {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Close => "close",
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            Self::Open => "open_returns.csv",
            Self::Close => "close_returns.csv",
        }
    }
}

impl fmt::Display for SampleWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Finite log-returns drawn from one window. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnSample {
    window: SampleWindow,
    values: Vec<f64>,
}

impl ReturnSample {
    /// Non-finite values are discarded.
    pub fn new(window: SampleWindow, values: impl IntoIterator<Item = f64>) -> Self {
        Self {
            window,
            values: values.into_iter().filter(|v| v.is_finite()).collect(),
        }
    }

    pub fn window(&self) -> SampleWindow {
        self.window
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSpec {
    pub market_open: NaiveTime,
    pub open_window_end: NaiveTime,
    pub close_window_start: NaiveTime,
    pub market_close: NaiveTime,
}

impl WindowSpec {
    pub fn validate(&self) -> Result<(), ExtractError> {
        if self.market_open >= self.market_close {
            return Err(ExtractError::InvalidConfiguration(format!(
                "market_open {} must be before market_close {}",
                self.market_open, self.market_close
            )));
        }
        if self.open_window_end < self.market_open {
            return Err(ExtractError::InvalidConfiguration(format!(
                "open_window {} is before market_open {}",
                self.open_window_end, self.market_open
            )));
        }
        if self.close_window_start < self.open_window_end {
            return Err(ExtractError::InvalidConfiguration(format!(
                "close_start {} is before open_window {}",
                self.close_window_start, self.open_window_end
            )));
        }
        if self.market_close < self.close_window_start {
            return Err(ExtractError::InvalidConfiguration(format!(
                "market_close {} is before close_start {}",
                self.market_close, self.close_window_start
            )));
        }
        Ok(())
    }

    fn bounds(&self, window: SampleWindow) -> (NaiveTime, NaiveTime) {
        match window {
            SampleWindow::Open => (self.market_open, self.open_window_end),
            SampleWindow::Close => (self.close_window_start, self.market_close),
        }
    }

    fn in_market_hours(&self, time: NaiveTime) -> bool {
        time >= self.market_open && time <= self.market_close
    }

    fn in_window(&self, window: SampleWindow, time: NaiveTime) -> bool {
        let (start, end) = self.bounds(window);
        time >= start && time <= end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionReport {
    pub input_bars: u64,
    pub trading_days: u64,
    pub market_hours_returns: u64,
    pub non_finite_dropped: u64,
    pub open_observations: u64,
    pub close_observations: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedSamples {
    pub open: ReturnSample,
    pub close: ReturnSample,
    pub report: ExtractionReport,
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("no returns fall in the {window} window [{start}, {end}]")]
    EmptyWindow {
        window: SampleWindow,
        start: NaiveTime,
        end: NaiveTime,
    },
    #[error("bars must be strictly time-ordered; {ts_ms_utc} follows {previous_ts_ms_utc}")]
    UnorderedBars {
        previous_ts_ms_utc: i64,
        ts_ms_utc: i64,
    },
    #[error("invalid UTC timestamp: {0}")]
    InvalidTimestamp(i64),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub fn extract_window_returns(
    bars: &[PriceBar],
    windows: &WindowSpec,
    tz: Tz,
) -> Result<ExtractedSamples, ExtractError> {
    windows.validate()?;

    let mut open_values = Vec::new();
    let mut close_values = Vec::new();
    let mut report = ExtractionReport {
        input_bars: bars.len() as u64,
        trading_days: 0,
        market_hours_returns: 0,
        non_finite_dropped: 0,
        open_observations: 0,
        close_observations: 0,
    };

    let mut previous: Option<(i64, NaiveDate, f64)> = None;
    for bar in bars {
        let local = Utc
            .timestamp_millis_opt(bar.ts_ms_utc)
            .single()
            .ok_or(ExtractError::InvalidTimestamp(bar.ts_ms_utc))?
            .with_timezone(&tz);
        let date = local.date_naive();
        let time = local.time();

        let prior_close = match previous {
            Some((prev_ts, _, _)) if bar.ts_ms_utc <= prev_ts => {
                return Err(ExtractError::UnorderedBars {
                    previous_ts_ms_utc: prev_ts,
                    ts_ms_utc: bar.ts_ms_utc,
                });
            }
            Some((_, prev_date, prev_close)) if prev_date == date => Some(prev_close),
            _ => {
                report.trading_days += 1;
                None
            }
        };
        previous = Some((bar.ts_ms_utc, date, bar.close));

        let Some(prior_close) = prior_close else {
            continue;
        };
        if !windows.in_market_hours(time) {
            continue;
        }

        report.market_hours_returns += 1;
        let log_return = (bar.close / prior_close).ln();
        if !log_return.is_finite() {
            report.non_finite_dropped += 1;
            continue;
        }

        if windows.in_window(SampleWindow::Open, time) {
            open_values.push(log_return);
        }
        if windows.in_window(SampleWindow::Close, time) {
            close_values.push(log_return);
        }
    }

    report.open_observations = open_values.len() as u64;
    report.close_observations = close_values.len() as u64;

    for (window, values) in [
        (SampleWindow::Open, &open_values),
        (SampleWindow::Close, &close_values),
    ] {
        if values.is_empty() {
            let (start, end) = windows.bounds(window);
            warn!(
                component = "returns",
                event = "returns.extract.empty_window",
                window = window.as_str(),
                start = %start,
                end = %end,
                input_bars = report.input_bars
            );
            return Err(ExtractError::EmptyWindow { window, start, end });
        }
    }

    info!(
        component = "returns",
        event = "returns.extract.finish",
        input_bars = report.input_bars,
        trading_days = report.trading_days,
        market_hours_returns = report.market_hours_returns,
        non_finite_dropped = report.non_finite_dropped,
        open_observations = report.open_observations,
        close_observations = report.close_observations
    );

    Ok(ExtractedSamples {
        open: ReturnSample::new(SampleWindow::Open, open_values),
        close: ReturnSample::new(SampleWindow::Close, close_values),
        report,
    })
}

#[derive(Debug, Serialize, Deserialize)]
struct ReturnRow {
    returns: f64,
}

pub fn write_return_sample(dir: &Path, sample: &ReturnSample) -> Result<(), ExtractError> {
    let path = dir.join(sample.window().file_name());
    let rows = sample.values().iter().map(|value| ReturnRow { returns: *value });
    write_atomic(&path, &csv_bytes(rows)?)?;

    info!(
        component = "returns",
        event = "returns.write",
        window = sample.window().as_str(),
        path = %path.display(),
        observations = sample.len()
    );
    Ok(())
}

pub fn read_return_sample(dir: &Path, window: SampleWindow) -> Result<ReturnSample, ExtractError> {
    let path = dir.join(window.file_name());
    let mut reader = csv::Reader::from_path(&path)?;
    let mut values = Vec::new();
    for row in reader.deserialize() {
        let row: ReturnRow = row?;
        values.push(row.returns);
    }
    Ok(ReturnSample::new(window, values))
}
