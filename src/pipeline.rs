//! End-to-end orchestration: fetch, extract, fit, export.

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::bridge::{self, BridgeError, BridgeFit};
use crate::charts::{self, ChartArtifacts, ChartError};
use crate::config::{AppConfig, ConfigError};
use crate::intraday_bars::{
    fetch_intraday_bars, write_raw_bars, BarFetcher, DataAccessError, IntradayFetchConfig,
};
use crate::returns::{
    extract_window_returns, read_return_sample, write_return_sample, ExtractError,
    ExtractionReport, ReturnSample, SampleWindow,
};
use crate::tables::{self, TableError};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    DataAccess(#[from] DataAccessError),
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error(transparent)]
    Bridge(#[from] BridgeError),
    #[error(transparent)]
    Table(#[from] TableError),
    #[error(transparent)]
    Chart(#[from] ChartError),
}

/// Fetch bookkeeping for a full run; absent when starting from processed samples.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchSummary {
    pub raw_bars_path: PathBuf,
    pub bars: u64,
    pub chunks: u64,
    pub skipped_chunks: u64,
    pub duplicate_bars_removed: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineReport {
    pub ticker: String,
    pub fetch: Option<FetchSummary>,
    pub extraction: Option<ExtractionReport>,
    pub processed_samples: Vec<PathBuf>,
    pub fit: BridgeFit,
    pub bridge_path_csv: PathBuf,
    pub summary_stats_csv: PathBuf,
    pub charts: ChartArtifacts,
}

impl PipelineReport {
    /// Every file this run wrote, in pipeline order.
    pub fn artifacts(&self) -> Vec<&Path> {
        let mut out: Vec<&Path> = Vec::new();
        if let Some(fetch) = &self.fetch {
            out.push(&fetch.raw_bars_path);
            out.extend(self.processed_samples.iter().map(PathBuf::as_path));
        }
        out.push(&self.bridge_path_csv);
        out.push(&self.summary_stats_csv);
        out.push(&self.charts.distributions);
        out.push(&self.charts.bridge_evolution);
        out.push(&self.charts.summary);
        out
    }
}

pub fn run_pipeline(
    cfg: &AppConfig,
    fetcher: &dyn BarFetcher,
    now_ts_ms_utc: i64,
) -> Result<PipelineReport, PipelineError> {
    info!(
        component = "pipeline",
        event = "pipeline.start",
        mode = "full",
        ticker = %cfg.data.ticker,
        weeks_back = cfg.data.weeks_back,
        time_steps = cfg.bridge.time_steps
    );

    cfg.ensure_output_dirs()?;
    let window_spec = cfg.window_spec()?;
    let tz = cfg.timezone()?;

    let fetch_cfg = IntradayFetchConfig::from_app_config(cfg);
    let outcome = fetch_intraday_bars(&fetch_cfg, fetcher, now_ts_ms_utc)?;
    let raw_bars_path = cfg.raw_bars_path();
    write_raw_bars(&raw_bars_path, &outcome.bars)?;

    let extracted = extract_window_returns(&outcome.bars, &window_spec, tz)?;
    write_return_sample(&cfg.paths.processed_data, &extracted.open)?;
    write_return_sample(&cfg.paths.processed_data, &extracted.close)?;
    let processed_samples = processed_sample_paths(cfg);

    let fetch = FetchSummary {
        raw_bars_path,
        bars: outcome.bars.len() as u64,
        chunks: outcome.chunks.len() as u64,
        skipped_chunks: outcome.skipped_chunks,
        duplicate_bars_removed: outcome.duplicate_bars_removed,
    };

    analyze(
        cfg,
        &extracted.open,
        &extracted.close,
        Some(fetch),
        Some(extracted.report.clone()),
        processed_samples,
    )
}

/// Re-runs the analysis on samples persisted by an earlier full run.
pub fn run_from_processed(cfg: &AppConfig) -> Result<PipelineReport, PipelineError> {
    info!(
        component = "pipeline",
        event = "pipeline.start",
        mode = "processed",
        ticker = %cfg.data.ticker,
        processed_dir = %cfg.paths.processed_data.display(),
        time_steps = cfg.bridge.time_steps
    );

    cfg.ensure_output_dirs()?;
    let open = read_return_sample(&cfg.paths.processed_data, SampleWindow::Open)?;
    let close = read_return_sample(&cfg.paths.processed_data, SampleWindow::Close)?;

    analyze(cfg, &open, &close, None, None, processed_sample_paths(cfg))
}

fn processed_sample_paths(cfg: &AppConfig) -> Vec<PathBuf> {
    [SampleWindow::Open, SampleWindow::Close]
        .iter()
        .map(|window| cfg.paths.processed_data.join(window.file_name()))
        .collect()
}

fn analyze(
    cfg: &AppConfig,
    open: &ReturnSample,
    close: &ReturnSample,
    fetch: Option<FetchSummary>,
    extraction: Option<ExtractionReport>,
    processed_samples: Vec<PathBuf>,
) -> Result<PipelineReport, PipelineError> {
    let fit = bridge::fit(open, close, cfg.bridge.time_steps)?;

    let bridge_path_csv = tables::write_bridge_path(&cfg.paths.results_tables, &fit.path)?;
    let summary_stats_csv = tables::write_summary_stats(&cfg.paths.results_tables, &fit)?;
    let charts = charts::render_all(&cfg.paths.results_figures, open, close, &fit)?;

    info!(
        component = "pipeline",
        event = "pipeline.finish",
        ticker = %cfg.data.ticker,
        open_observations = open.len(),
        close_observations = close.len(),
        skipped_chunks = fetch.as_ref().map(|f| f.skipped_chunks).unwrap_or(0),
        drift = fit.summary.drift,
        volatility = fit.summary.volatility,
        reversion_strength = %fit.summary.reversion_strength
    );

    Ok(PipelineReport {
        ticker: cfg.data.ticker.clone(),
        fetch,
        extraction,
        processed_samples,
        fit,
        bridge_path_csv,
        summary_stats_csv,
        charts,
    })
}
