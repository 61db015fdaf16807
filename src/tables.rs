//! Tabular bridge results: the sampled path and the summary metrics.

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::bridge::{BridgeFit, BridgePath};
use crate::output::{csv_bytes, write_atomic};

pub const BRIDGE_PATH_FILE: &str = "bridge_path.csv";
pub const SUMMARY_STATS_FILE: &str = "summary_stats.csv";

#[derive(Debug, Error)]
pub enum TableError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Serialize)]
struct PathRow {
    time: f64,
    mean: f64,
    volatility: f64,
}

#[derive(Debug, Serialize)]
struct SummaryRow<'a> {
    #[serde(rename = "Metric")]
    metric: &'a str,
    #[serde(rename = "Value")]
    value: &'a str,
}

pub fn write_bridge_path(dir: &Path, path: &BridgePath) -> Result<PathBuf, TableError> {
    let out = dir.join(BRIDGE_PATH_FILE);
    let rows = path.points.iter().map(|point| PathRow {
        time: point.t,
        mean: point.mean,
        volatility: point.std_dev,
    });
    write_atomic(&out, &csv_bytes(rows)?)?;

    info!(
        component = "tables",
        event = "tables.write",
        table = BRIDGE_PATH_FILE,
        path = %out.display(),
        rows = path.len()
    );
    Ok(out)
}

pub fn summary_rows(fit: &BridgeFit) -> Vec<(&'static str, String)> {
    vec![
        ("Initial mean", fit.open.mean.to_string()),
        ("Final mean", fit.close.mean.to_string()),
        ("Initial vol", fit.open.std_dev.to_string()),
        ("Final vol", fit.close.std_dev.to_string()),
        ("Drift", fit.summary.drift.to_string()),
        ("Volatility", fit.summary.volatility.to_string()),
        (
            "Reversion strength",
            match fit.summary.reversion_strength.value() {
                Some(v) => v.to_string(),
                None => "undefined".to_string(),
            },
        ),
    ]
}

pub fn write_summary_stats(dir: &Path, fit: &BridgeFit) -> Result<PathBuf, TableError> {
    let out = dir.join(SUMMARY_STATS_FILE);
    let rows = summary_rows(fit);
    let bytes = csv_bytes(rows.iter().map(|(metric, value)| SummaryRow {
        metric: *metric,
        value: value.as_str(),
    }))?;
    write_atomic(&out, &bytes)?;

    info!(
        component = "tables",
        event = "tables.write",
        table = SUMMARY_STATS_FILE,
        path = %out.display(),
        rows = rows.len()
    );
    Ok(out)
}
