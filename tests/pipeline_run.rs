use std::fs;
use std::path::Path;

use chrono::{NaiveDate, TimeZone};
use chrono_tz::America::New_York;
use intraday_bridge::{
    parse_config, run_from_processed, run_pipeline, AppConfig, BarFetcher, ChunkFetchError,
    DataAccessError, FetchChunk, PipelineError, PriceBar, BRIDGE_EVOLUTION_FILE,
    BRIDGE_PATH_FILE, DISTRIBUTIONS_FILE, SUMMARY_FILE, SUMMARY_STATS_FILE,
};
use regex::Regex;
use tempfile::tempdir;

const SESSION_MINUTES: u32 = 390;

fn now_ts_ms() -> i64 {
    // Saturday 2024-03-16 12:00 New York
    New_York
        .with_ymd_and_hms(2024, 3, 16, 12, 0, 0)
        .single()
        .expect("valid local timestamp")
        .timestamp_millis()
}

fn session_bars() -> Vec<PriceBar> {
    let mut bars = Vec::new();
    for day in 11..=15 {
        let date = NaiveDate::from_ymd_opt(2024, 3, day).expect("valid date");
        let open = New_York
            .from_local_datetime(&date.and_hms_opt(9, 30, 0).expect("valid time"))
            .single()
            .expect("unambiguous local time");
        for minute in 0..=SESSION_MINUTES {
            let wiggle = f64::from((minute * 7 + day * 3) % 13) * 0.02;
            let close = 500.0 + f64::from(day) + wiggle;
            bars.push(PriceBar {
                ts_ms_utc: open.timestamp_millis() + i64::from(minute) * 60_000,
                open: close,
                high: close + 0.05,
                low: close - 0.05,
                close,
                volume: 1_000.0,
            });
        }
    }
    bars
}

struct SessionFetcher {
    bars: Vec<PriceBar>,
}

impl BarFetcher for SessionFetcher {
    fn fetch_bars(
        &self,
        _ticker: &str,
        chunk: &FetchChunk,
        _interval: &str,
    ) -> Result<Vec<PriceBar>, ChunkFetchError> {
        Ok(self
            .bars
            .iter()
            .filter(|bar| {
                bar.ts_ms_utc >= chunk.start_ts_ms_utc
                    && bar.ts_ms_utc < chunk.end_ts_ms_utc_exclusive
            })
            .cloned()
            .collect())
    }
}

struct OfflineFetcher;

impl BarFetcher for OfflineFetcher {
    fn fetch_bars(
        &self,
        ticker: &str,
        _chunk: &FetchChunk,
        _interval: &str,
    ) -> Result<Vec<PriceBar>, ChunkFetchError> {
        Err(ChunkFetchError::HttpRequest {
            url: format!("mock://{ticker}"),
            message: "connection refused".to_string(),
        })
    }
}

fn config_for(root: &Path, weeks_back: u32) -> AppConfig {
    let raw = format!(
        r#"
data:
  ticker: SPY
  weeks_back: {weeks_back}
  interval: 1m
  market_open: "09:30"
  market_close: "16:00"
  open_window: "09:35"
  close_start: "15:55"
bridge:
  time_steps: 50
paths:
  raw_data: "{root}/data/raw"
  processed_data: "{root}/data/processed"
  results_tables: "{root}/results/tables"
  results_figures: "{root}/results/figures"
"#,
        root = root.display()
    );
    parse_config(&raw).expect("config should parse")
}

#[test]
fn full_run_writes_every_artifact() {
    let temp = tempdir().expect("temp dir should be created");
    let cfg = config_for(temp.path(), 2);
    let fetcher = SessionFetcher {
        bars: session_bars(),
    };

    let report = run_pipeline(&cfg, &fetcher, now_ts_ms()).expect("pipeline should succeed");

    let fetch = report.fetch.as_ref().expect("full run reports fetch stats");
    assert_eq!(fetch.chunks, 2);
    assert_eq!(fetch.skipped_chunks, 0);
    assert_eq!(fetch.bars, 5 * u64::from(SESSION_MINUTES + 1));
    assert!(fetch.raw_bars_path.ends_with("spy_intraday_full.csv"));

    let extraction = report.extraction.as_ref().expect("full run reports extraction");
    assert_eq!(extraction.trading_days, 5);
    assert_eq!(extraction.open_observations, 25);
    assert_eq!(extraction.close_observations, 30);
    assert_eq!(report.fit.open.observations, 25);
    assert_eq!(report.fit.close.observations, 30);

    let processed = temp.path().join("data/processed");
    assert!(processed.join("open_returns.csv").is_file());
    assert!(processed.join("close_returns.csv").is_file());

    let path_csv = fs::read_to_string(temp.path().join("results/tables").join(BRIDGE_PATH_FILE))
        .expect("bridge path table should exist");
    assert_eq!(path_csv.lines().next(), Some("time,mean,volatility"));
    assert_eq!(path_csv.lines().count(), 51);

    let summary_csv =
        fs::read_to_string(temp.path().join("results/tables").join(SUMMARY_STATS_FILE))
            .expect("summary table should exist");
    let metric_row = Regex::new(r"(?m)^Drift,-?\d").expect("valid regex");
    assert!(metric_row.is_match(&summary_csv));

    let figures = temp.path().join("results/figures");
    for name in [DISTRIBUTIONS_FILE, BRIDGE_EVOLUTION_FILE, SUMMARY_FILE] {
        let svg = fs::read_to_string(figures.join(name)).expect("chart should exist");
        assert!(svg.starts_with("<svg"), "{name} should be an svg document");
    }
    assert_eq!(report.charts.summary, figures.join(SUMMARY_FILE));

    let artifacts = report.artifacts();
    assert_eq!(artifacts.len(), 8);
    assert!(artifacts.iter().all(|path| path.is_file()));
}

#[test]
fn processed_mode_reproduces_the_full_fit() {
    let temp = tempdir().expect("temp dir should be created");
    let cfg = config_for(temp.path(), 1);
    let fetcher = SessionFetcher {
        bars: session_bars(),
    };

    let full = run_pipeline(&cfg, &fetcher, now_ts_ms()).expect("pipeline should succeed");
    let reloaded = run_from_processed(&cfg).expect("processed run should succeed");

    assert!(reloaded.fetch.is_none());
    assert!(reloaded.extraction.is_none());
    assert_eq!(reloaded.fit, full.fit);
    assert_eq!(reloaded.artifacts().len(), 5);
}

#[test]
fn processed_mode_without_samples_fails() {
    let temp = tempdir().expect("temp dir should be created");
    let cfg = config_for(temp.path(), 1);

    let err = run_from_processed(&cfg).expect_err("nothing has been extracted yet");
    assert!(matches!(err, PipelineError::Extract(_)));
}

#[test]
fn every_chunk_failing_is_no_data() {
    let temp = tempdir().expect("temp dir should be created");
    let cfg = config_for(temp.path(), 3);

    let err = run_pipeline(&cfg, &OfflineFetcher, now_ts_ms()).expect_err("no bars at all");
    match err {
        PipelineError::DataAccess(DataAccessError::NoData {
            ticker,
            attempted_chunks,
        }) => {
            assert_eq!(ticker, "SPY");
            assert_eq!(attempted_chunks, 3);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!cfg.raw_bars_path().exists());
}
