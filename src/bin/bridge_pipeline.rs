use std::path::PathBuf;
use std::time::Instant;

use chrono::Utc;
use intraday_bridge::{
    init_logging, load_config, log_app_failed, log_app_finish, log_app_start, log_config_loaded,
    logging_config_from_env, run_from_processed, run_pipeline, PipelineReport,
    YahooChartFetcher,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Full,
    Processed,
}

impl Mode {
    fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Processed => "processed",
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let logging_cfg = logging_config_from_env();
    init_logging(&logging_cfg)?;

    let mode = parse_mode()?;
    log_app_start(&logging_cfg, mode.as_str());

    let started = Instant::now();
    match run(mode) {
        Ok(report) => {
            log_app_finish(
                mode.as_str(),
                &report.ticker,
                elapsed_ms(started),
                report.artifacts().len(),
            );
            print_report(&report);
            Ok(())
        }
        Err(err) => {
            log_app_failed(mode.as_str(), elapsed_ms(started), err.as_ref());
            Err(err)
        }
    }
}

fn run(mode: Mode) -> Result<PipelineReport, Box<dyn std::error::Error>> {
    let config_path = std::env::var("BRIDGE_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.yaml"));
    let cfg = load_config(&config_path)?;
    log_config_loaded(
        &config_path,
        &cfg.data.ticker,
        cfg.data.weeks_back,
        cfg.bridge.time_steps,
    );

    let report = match mode {
        Mode::Full => {
            let fetcher = YahooChartFetcher::new(cfg.fetch.http_timeout_ms)?;
            run_pipeline(&cfg, &fetcher, Utc::now().timestamp_millis())?
        }
        Mode::Processed => run_from_processed(&cfg)?,
    };
    Ok(report)
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn parse_mode() -> Result<Mode, String> {
    let raw = std::env::var("BRIDGE_PIPELINE_MODE").unwrap_or_else(|_| "full".to_string());
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "full" => Ok(Mode::Full),
        "processed" => Ok(Mode::Processed),
        other => Err(format!(
            "invalid BRIDGE_PIPELINE_MODE '{other}' (expected 'full' or 'processed')"
        )),
    }
}

fn print_report(report: &PipelineReport) {
    println!("ticker={}", report.ticker);
    if let Some(fetch) = &report.fetch {
        println!(
            "bars={} chunks={} skipped_chunks={} duplicates_removed={} raw={}",
            fetch.bars,
            fetch.chunks,
            fetch.skipped_chunks,
            fetch.duplicate_bars_removed,
            fetch.raw_bars_path.display()
        );
    }
    println!(
        "open: n={} mean={:.6} std={:.6}",
        report.fit.open.observations, report.fit.open.mean, report.fit.open.std_dev
    );
    println!(
        "close: n={} mean={:.6} std={:.6}",
        report.fit.close.observations, report.fit.close.mean, report.fit.close.std_dev
    );
    println!(
        "drift={:.6} volatility={:.6} reversion_strength={}",
        report.fit.summary.drift, report.fit.summary.volatility, report.fit.summary.reversion_strength
    );
    println!("tables: {} {}", report.bridge_path_csv.display(), report.summary_stats_csv.display());
    println!(
        "figures: {} {} {}",
        report.charts.distributions.display(),
        report.charts.bridge_evolution.display(),
        report.charts.summary.display()
    );
}
