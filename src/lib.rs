//! Intraday bridge core crate.
//!
//! Current implemented scope:
//! - weekly-chunked intraday bar loading with a resolution ladder
//! - open/close window log-return extraction in exchange local time
//! - closed-form Gaussian bridge between the two return distributions
//! - CSV result tables and SVG charts

mod bridge;
mod charts;
mod config;
mod intraday_bars;
mod observability;
mod output;
mod pipeline;
mod returns;
mod stats;
mod tables;

pub use bridge::{
    fit, fit_gaussians, BridgeError, BridgeFit, BridgePath, BridgePoint, BridgeSummary,
    GaussianFit, ReversionStrength, MIN_OBSERVATIONS, MIN_TIME_STEPS,
};
pub use charts::{
    render_all, render_bridge_evolution, render_distributions, render_summary, ChartArtifacts,
    ChartError, BRIDGE_EVOLUTION_FILE, DISTRIBUTIONS_FILE, SUMMARY_FILE,
};
pub use config::{
    load_config, parse_config, parse_time_of_day, AppConfig, BridgeConfig, ConfigError,
    DataConfig, FetchConfig, PathsConfig, DEFAULT_TIMEZONE,
};
pub use intraday_bars::{
    fetch_intraday_bars, load_intraday_bars, plan_weekly_chunks, read_raw_bars, write_raw_bars,
    BarFetcher, ChunkFetchError, ChunkReport, ChunkStatus, DataAccessError, FetchChunk,
    FetchOutcome, IntradayFetchConfig, PriceBar, YahooChartFetcher,
};
pub use observability::{
    init_logging, log_app_failed, log_app_finish, log_app_start, log_config_loaded,
    logging_config_from_env, LogFormat, LoggingConfig, LoggingInitError, LOG_FORMAT_ENV,
    LOG_LEVEL_ENV, LOG_TARGET_ENV,
};
pub use pipeline::{run_from_processed, run_pipeline, FetchSummary, PipelineError, PipelineReport};
pub use returns::{
    extract_window_returns, read_return_sample, write_return_sample, ExtractError,
    ExtractedSamples, ExtractionReport, ReturnSample, SampleWindow, WindowSpec,
};
pub use stats::{mean, pairwise_sum};
pub use tables::{
    summary_rows, write_bridge_path, write_summary_stats, TableError, BRIDGE_PATH_FILE,
    SUMMARY_STATS_FILE,
};
