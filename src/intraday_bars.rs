//! Weekly-chunked intraday bar loading for a single ticker.
//!
//! The upstream chart endpoint only serves fine-grained intraday bars for a
//! few days per request, so the lookback window is split into 7-day chunks
//! fetched one after another. A chunk that fails on every rung of the
//! resolution ladder is skipped and counted; the run only fails when no chunk
//! produced any bar.

use std::path::Path;

use chrono::{SecondsFormat, TimeZone, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::output::{csv_bytes, write_atomic};

const YAHOO_CHART_BASE_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";
const CHUNK_MS: i64 = 7 * 86_400_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub ts_ms_utc: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchChunk {
    pub index: u32,
    pub start_ts_ms_utc: i64,
    pub end_ts_ms_utc_exclusive: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChunkStatus {
    Loaded {
        interval: String,
        bars: u64,
        degraded: bool,
    },
    Skipped {
        failures: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkReport {
    pub chunk: FetchChunk,
    pub status: ChunkStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchOutcome {
    pub ticker: String,
    pub bars: Vec<PriceBar>,
    pub chunks: Vec<ChunkReport>,
    pub skipped_chunks: u64,
    pub duplicate_bars_removed: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntradayFetchConfig {
    pub ticker: String,
    pub weeks_back: u32,
    pub resolution_ladder: Vec<String>,
    pub http_timeout_ms: u64,
}

impl IntradayFetchConfig {
    pub fn from_app_config(cfg: &AppConfig) -> Self {
        Self {
            ticker: cfg.data.ticker.trim().to_string(),
            weeks_back: cfg.data.weeks_back,
            resolution_ladder: cfg.resolution_ladder(),
            http_timeout_ms: cfg.fetch.http_timeout_ms,
        }
    }
}

/// Failure to retrieve one chunk at one interval. Recovered by the caller.
#[derive(Debug, Error)]
pub enum ChunkFetchError {
    #[error("HTTP client build error: {0}")]
    HttpClientBuild(String),
    #[error("cannot build chart URL for {symbol}: {message}")]
    InvalidUrl { symbol: String, message: String },
    #[error("HTTP request failed for {url}: {message}")]
    HttpRequest { url: String, message: String },
    #[error("unexpected chart payload from {url}: {message}")]
    ResponseFormat { url: String, message: String },
    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },
}

#[derive(Debug, Error)]
pub enum DataAccessError {
    #[error("invalid fetch request: {0}")]
    InvalidRequest(String),
    #[error("no intraday bars for {ticker}: all {attempted_chunks} weekly chunks were empty or failed")]
    NoData {
        ticker: String,
        attempted_chunks: usize,
    },
    #[error(transparent)]
    Fetch(#[from] ChunkFetchError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid timestamp in bar: {0}")]
    InvalidTimestamp(i64),
}

pub trait BarFetcher {
    fn fetch_bars(
        &self,
        ticker: &str,
        chunk: &FetchChunk,
        interval: &str,
    ) -> Result<Vec<PriceBar>, ChunkFetchError>;
}

pub fn plan_weekly_chunks(now_ts_ms_utc: i64, weeks_back: u32) -> Vec<FetchChunk> {
    (0..weeks_back)
        .map(|week| {
            let end = now_ts_ms_utc - i64::from(week) * CHUNK_MS;
            FetchChunk {
                index: week,
                start_ts_ms_utc: end - CHUNK_MS,
                end_ts_ms_utc_exclusive: end,
            }
        })
        .collect()
}

pub fn load_intraday_bars(
    cfg: &IntradayFetchConfig,
    now_ts_ms_utc: i64,
) -> Result<FetchOutcome, DataAccessError> {
    let fetcher = YahooChartFetcher::new(cfg.http_timeout_ms)?;
    fetch_intraday_bars(cfg, &fetcher, now_ts_ms_utc)
}

pub fn fetch_intraday_bars(
    cfg: &IntradayFetchConfig,
    fetcher: &dyn BarFetcher,
    now_ts_ms_utc: i64,
) -> Result<FetchOutcome, DataAccessError> {
    validate_request(cfg)?;
    let chunks = plan_weekly_chunks(now_ts_ms_utc, cfg.weeks_back);

    info!(
        component = "intraday_bars",
        event = "fetch.start",
        ticker = %cfg.ticker,
        chunk_count = chunks.len(),
        resolution_ladder = ?cfg.resolution_ladder
    );

    let mut all_bars = Vec::new();
    let mut reports = Vec::with_capacity(chunks.len());
    let mut skipped_chunks = 0u64;

    for chunk in &chunks {
        let mut failures = Vec::new();
        let mut loaded = None;

        for (rung, interval) in cfg.resolution_ladder.iter().enumerate() {
            debug!(
                component = "intraday_bars",
                event = "fetch.chunk.start",
                chunk = chunk.index,
                interval = %interval,
                start_ts_ms_utc = chunk.start_ts_ms_utc,
                end_ts_ms_utc_exclusive = chunk.end_ts_ms_utc_exclusive
            );

            match fetcher.fetch_bars(&cfg.ticker, chunk, interval) {
                Ok(bars) => {
                    loaded = Some((interval.clone(), rung > 0, bars));
                    break;
                }
                Err(err) => {
                    warn!(
                        component = "intraday_bars",
                        event = "fetch.chunk.attempt_failed",
                        chunk = chunk.index,
                        interval = %interval,
                        error = %err
                    );
                    failures.push(format!("{interval}: {err}"));
                }
            }
        }

        match loaded {
            Some((interval, degraded, bars)) => {
                let in_range: Vec<PriceBar> = bars
                    .into_iter()
                    .filter(|bar| {
                        bar.ts_ms_utc >= chunk.start_ts_ms_utc
                            && bar.ts_ms_utc < chunk.end_ts_ms_utc_exclusive
                    })
                    .collect();
                info!(
                    component = "intraday_bars",
                    event = "fetch.chunk.loaded",
                    chunk = chunk.index,
                    interval = %interval,
                    degraded,
                    bars = in_range.len()
                );
                reports.push(ChunkReport {
                    chunk: *chunk,
                    status: ChunkStatus::Loaded {
                        interval,
                        bars: in_range.len() as u64,
                        degraded,
                    },
                });
                all_bars.extend(in_range);
            }
            None => {
                skipped_chunks += 1;
                warn!(
                    component = "intraday_bars",
                    event = "fetch.chunk.skipped",
                    chunk = chunk.index,
                    attempts = failures.len()
                );
                reports.push(ChunkReport {
                    chunk: *chunk,
                    status: ChunkStatus::Skipped { failures },
                });
            }
        }
    }

    let (bars, duplicate_bars_removed) = sort_and_dedupe(all_bars);
    if bars.is_empty() {
        warn!(
            component = "intraday_bars",
            event = "fetch.no_data",
            ticker = %cfg.ticker,
            skipped_chunks
        );
        return Err(DataAccessError::NoData {
            ticker: cfg.ticker.clone(),
            attempted_chunks: chunks.len(),
        });
    }

    info!(
        component = "intraday_bars",
        event = "fetch.finish",
        ticker = %cfg.ticker,
        bars = bars.len(),
        skipped_chunks,
        duplicate_bars_removed
    );

    Ok(FetchOutcome {
        ticker: cfg.ticker.clone(),
        bars,
        chunks: reports,
        skipped_chunks,
        duplicate_bars_removed,
    })
}

fn sort_and_dedupe(mut bars: Vec<PriceBar>) -> (Vec<PriceBar>, u64) {
    bars.sort_by_key(|bar| bar.ts_ms_utc);

    let mut deduped: Vec<PriceBar> = Vec::with_capacity(bars.len());
    let mut duplicates_removed = 0u64;
    for bar in bars {
        if deduped
            .last()
            .map(|existing| existing.ts_ms_utc == bar.ts_ms_utc)
            .unwrap_or(false)
        {
            duplicates_removed += 1;
        } else {
            deduped.push(bar);
        }
    }

    (deduped, duplicates_removed)
}

fn validate_request(cfg: &IntradayFetchConfig) -> Result<(), DataAccessError> {
    if cfg.ticker.is_empty() {
        return Err(DataAccessError::InvalidRequest(
            "ticker must not be empty".to_string(),
        ));
    }
    if cfg.weeks_back == 0 {
        return Err(DataAccessError::InvalidRequest(
            "weeks_back must be > 0".to_string(),
        ));
    }
    if cfg.resolution_ladder.is_empty() {
        return Err(DataAccessError::InvalidRequest(
            "resolution ladder must contain at least one interval".to_string(),
        ));
    }
    Ok(())
}

#[derive(Debug, Serialize, Deserialize)]
struct RawBarRow {
    timestamp_utc: String,
    ts_ms_utc: i64,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

pub fn write_raw_bars(path: &Path, bars: &[PriceBar]) -> Result<(), DataAccessError> {
    let rows = bars
        .iter()
        .map(|bar| {
            let timestamp = Utc
                .timestamp_millis_opt(bar.ts_ms_utc)
                .single()
                .ok_or(DataAccessError::InvalidTimestamp(bar.ts_ms_utc))?;
            Ok(RawBarRow {
                timestamp_utc: timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
                ts_ms_utc: bar.ts_ms_utc,
                open: bar.open,
                high: bar.high,
                low: bar.low,
                close: bar.close,
                volume: bar.volume,
            })
        })
        .collect::<Result<Vec<_>, DataAccessError>>()?;
    write_atomic(path, &csv_bytes(rows)?)?;

    info!(
        component = "intraday_bars",
        event = "raw.write",
        path = %path.display(),
        bars = bars.len()
    );
    Ok(())
}

pub fn read_raw_bars(path: &Path) -> Result<Vec<PriceBar>, DataAccessError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut bars = Vec::new();
    for row in reader.deserialize() {
        let row: RawBarRow = row?;
        bars.push(PriceBar {
            ts_ms_utc: row.ts_ms_utc,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume,
        });
    }
    Ok(bars)
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteData {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

pub struct YahooChartFetcher {
    client: reqwest::blocking::Client,
}

impl YahooChartFetcher {
    pub fn new(timeout_ms: u64) -> Result<Self, ChunkFetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_millis(timeout_ms))
            .user_agent("Mozilla/5.0 (X11; Linux x86_64) intraday-bridge/0.1")
            .build()
            .map_err(|err| ChunkFetchError::HttpClientBuild(err.to_string()))?;
        Ok(Self { client })
    }
}

impl BarFetcher for YahooChartFetcher {
    fn fetch_bars(
        &self,
        ticker: &str,
        chunk: &FetchChunk,
        interval: &str,
    ) -> Result<Vec<PriceBar>, ChunkFetchError> {
        let url = chart_url(ticker)?;
        let url_text = url.to_string();
        let response = self
            .client
            .get(url)
            .query(&chart_query(chunk, interval))
            .send()
            .map_err(|err| ChunkFetchError::HttpRequest {
                url: url_text.clone(),
                message: err.to_string(),
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ChunkFetchError::SymbolNotFound {
                symbol: ticker.to_string(),
            });
        }
        if !status.is_success() {
            return Err(ChunkFetchError::HttpRequest {
                url: url_text,
                message: format!("unexpected HTTP status {status} for interval {interval}"),
            });
        }

        let payload = response
            .bytes()
            .map_err(|err| ChunkFetchError::HttpRequest {
                url: url_text.clone(),
                message: err.to_string(),
            })?;
        parse_chart_payload(ticker, &url_text, &payload)
    }
}

fn chart_url(ticker: &str) -> Result<Url, ChunkFetchError> {
    let invalid = |message: String| ChunkFetchError::InvalidUrl {
        symbol: ticker.to_string(),
        message,
    };
    let mut url = Url::parse(YAHOO_CHART_BASE_URL).map_err(|err| invalid(err.to_string()))?;
    url.path_segments_mut()
        .map_err(|()| invalid("base URL cannot carry path segments".to_string()))?
        .push(ticker);
    Ok(url)
}

/// Chart window in epoch seconds; pre/post-market bars are excluded upstream.
fn chart_query(chunk: &FetchChunk, interval: &str) -> [(&'static str, String); 4] {
    [
        ("period1", chunk.start_ts_ms_utc.div_euclid(1_000).to_string()),
        (
            "period2",
            chunk.end_ts_ms_utc_exclusive.div_euclid(1_000).to_string(),
        ),
        ("interval", interval.to_string()),
        ("includePrePost", "false".to_string()),
    ]
}

fn parse_chart_payload(
    ticker: &str,
    url: &str,
    payload: &[u8],
) -> Result<Vec<PriceBar>, ChunkFetchError> {
    let response: ChartResponse =
        serde_json::from_slice(payload).map_err(|err| ChunkFetchError::ResponseFormat {
            url: url.to_string(),
            message: err.to_string(),
        })?;

    let result = match (response.chart.result, response.chart.error) {
        (Some(result), _) => result,
        (None, Some(err)) if err.code == "Not Found" => {
            return Err(ChunkFetchError::SymbolNotFound {
                symbol: ticker.to_string(),
            })
        }
        (None, Some(err)) => {
            return Err(ChunkFetchError::ResponseFormat {
                url: url.to_string(),
                message: format!("{}: {}", err.code, err.description),
            })
        }
        (None, None) => {
            return Err(ChunkFetchError::ResponseFormat {
                url: url.to_string(),
                message: "empty result with no error".to_string(),
            })
        }
    };

    let Some(data) = result.into_iter().next() else {
        return Err(ChunkFetchError::ResponseFormat {
            url: url.to_string(),
            message: "result array is empty".to_string(),
        });
    };

    // A window with no trading (holiday week) carries no timestamp array.
    let Some(timestamps) = data.timestamp else {
        return Ok(Vec::new());
    };
    let quote = data.indicators.quote.into_iter().next().unwrap_or_default();

    let mut bars = Vec::with_capacity(timestamps.len());
    for (idx, ts_s) in timestamps.iter().enumerate() {
        let Some(close) = quote.close.get(idx).copied().flatten() else {
            continue;
        };
        bars.push(PriceBar {
            ts_ms_utc: ts_s.saturating_mul(1_000),
            open: quote.open.get(idx).copied().flatten().unwrap_or(close),
            high: quote.high.get(idx).copied().flatten().unwrap_or(close),
            low: quote.low.get(idx).copied().flatten().unwrap_or(close),
            close,
            volume: quote.volume.get(idx).copied().flatten().unwrap_or(0.0),
        });
    }

    Ok(bars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::tempdir;

    const NOW_MS: i64 = 1_735_689_600_000; // 2025-01-01T00:00:00Z
    const MINUTE_MS: i64 = 60_000;

    #[derive(Default)]
    struct MockFetcher {
        responses: HashMap<(u32, String), Vec<PriceBar>>,
    }

    impl MockFetcher {
        fn with(mut self, chunk: u32, interval: &str, bars: Vec<PriceBar>) -> Self {
            self.responses.insert((chunk, interval.to_string()), bars);
            self
        }
    }

    impl BarFetcher for MockFetcher {
        fn fetch_bars(
            &self,
            _ticker: &str,
            chunk: &FetchChunk,
            interval: &str,
        ) -> Result<Vec<PriceBar>, ChunkFetchError> {
            self.responses
                .get(&(chunk.index, interval.to_string()))
                .cloned()
                .ok_or_else(|| ChunkFetchError::HttpRequest {
                    url: format!("mock://{}/{interval}", chunk.index),
                    message: "missing mock response".to_string(),
                })
        }
    }

    fn bar(ts_ms_utc: i64, close: f64) -> PriceBar {
        PriceBar {
            ts_ms_utc,
            open: close,
            high: close,
            low: close,
            close,
            volume: 100.0,
        }
    }

    fn cfg(weeks_back: u32, ladder: &[&str]) -> IntradayFetchConfig {
        IntradayFetchConfig {
            ticker: "SPY".to_string(),
            weeks_back,
            resolution_ladder: ladder.iter().map(|s| s.to_string()).collect(),
            http_timeout_ms: 1_000,
        }
    }

    #[test]
    fn weekly_chunks_are_contiguous_and_most_recent_first() {
        let chunks = plan_weekly_chunks(NOW_MS, 3);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].end_ts_ms_utc_exclusive, NOW_MS);
        for pair in chunks.windows(2) {
            assert_eq!(pair[1].end_ts_ms_utc_exclusive, pair[0].start_ts_ms_utc);
        }
        for chunk in &chunks {
            assert_eq!(chunk.end_ts_ms_utc_exclusive - chunk.start_ts_ms_utc, CHUNK_MS);
        }
    }

    #[test]
    fn failed_chunk_is_skipped_and_counted() {
        let recent = NOW_MS - 2 * MINUTE_MS;
        let fetcher = MockFetcher::default().with(0, "1m", vec![bar(recent, 100.0)]);

        let outcome = fetch_intraday_bars(&cfg(2, &["1m"]), &fetcher, NOW_MS).unwrap();
        assert_eq!(outcome.bars.len(), 1);
        assert_eq!(outcome.skipped_chunks, 1);
        assert!(matches!(
            outcome.chunks[1].status,
            ChunkStatus::Skipped { ref failures } if failures.len() == 1
        ));
    }

    #[test]
    fn all_chunks_failing_is_no_data() {
        let err = fetch_intraday_bars(&cfg(3, &["1m"]), &MockFetcher::default(), NOW_MS)
            .unwrap_err();
        assert!(matches!(
            err,
            DataAccessError::NoData {
                attempted_chunks: 3,
                ..
            }
        ));
    }

    #[test]
    fn empty_successful_chunks_are_no_data_but_not_skipped() {
        let fetcher = MockFetcher::default().with(0, "1m", Vec::new());
        let err = fetch_intraday_bars(&cfg(1, &["1m"]), &fetcher, NOW_MS).unwrap_err();
        assert!(matches!(err, DataAccessError::NoData { .. }));
    }

    #[test]
    fn degraded_interval_is_used_when_primary_fails() {
        let ts = NOW_MS - 10 * MINUTE_MS;
        let fetcher = MockFetcher::default().with(0, "5m", vec![bar(ts, 101.0)]);

        let outcome = fetch_intraday_bars(&cfg(1, &["1m", "5m"]), &fetcher, NOW_MS).unwrap();
        assert_eq!(outcome.skipped_chunks, 0);
        assert_eq!(
            outcome.chunks[0].status,
            ChunkStatus::Loaded {
                interval: "5m".to_string(),
                bars: 1,
                degraded: true,
            }
        );
    }

    #[test]
    fn overlapping_chunk_bars_are_sorted_and_deduplicated() {
        let chunks = plan_weekly_chunks(NOW_MS, 2);
        let boundary = chunks[0].start_ts_ms_utc;
        let fetcher = MockFetcher::default()
            .with(
                0,
                "1m",
                vec![bar(boundary + MINUTE_MS, 2.0), bar(boundary, 1.0)],
            )
            .with(
                1,
                "1m",
                vec![
                    bar(boundary - MINUTE_MS, 0.5),
                    bar(boundary, 1.0),
                    bar(boundary - MINUTE_MS, 0.5),
                ],
            );

        let outcome = fetch_intraday_bars(&cfg(2, &["1m"]), &fetcher, NOW_MS).unwrap();
        let times: Vec<i64> = outcome.bars.iter().map(|b| b.ts_ms_utc).collect();
        assert_eq!(
            times,
            vec![boundary - MINUTE_MS, boundary, boundary + MINUTE_MS]
        );
        // the bar at `boundary` belongs to chunk 0 only; chunk 1 repeats an earlier bar
        assert_eq!(outcome.duplicate_bars_removed, 1);
    }

    #[test]
    fn chart_payload_skips_null_closes_and_converts_seconds() {
        let payload = br#"{"chart":{"result":[{"meta":{"symbol":"SPY"},"timestamp":[1735741800,1735741860,1735741920],"indicators":{"quote":[{"open":[590.1,null,590.3],"high":[590.5,null,590.9],"low":[589.9,null,590.0],"close":[590.2,null,590.8],"volume":[1000,null,1200]}]}}],"error":null}}"#;

        let bars = parse_chart_payload("SPY", "mock://chart", payload).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].ts_ms_utc, 1_735_741_800_000);
        assert_eq!(bars[1].close, 590.8);
        assert_eq!(bars[1].volume, 1200.0);
    }

    #[test]
    fn chart_payload_without_timestamps_is_empty() {
        let payload = br#"{"chart":{"result":[{"meta":{},"indicators":{"quote":[{}]}}],"error":null}}"#;
        let bars = parse_chart_payload("SPY", "mock://chart", payload).unwrap();
        assert!(bars.is_empty());
    }

    #[test]
    fn chart_payload_error_maps_to_symbol_not_found() {
        let payload = br#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        let err = parse_chart_payload("NOPE", "mock://chart", payload).unwrap_err();
        assert!(matches!(err, ChunkFetchError::SymbolNotFound { .. }));
    }

    #[test]
    fn chart_url_pushes_symbol_as_one_path_segment() {
        let url = chart_url("BRK/B").unwrap();
        assert_eq!(url.host_str(), Some("query2.finance.yahoo.com"));
        assert_eq!(url.path(), "/v8/finance/chart/BRK%2FB");
        assert_eq!(url.query(), None);

        let index = chart_url("^GSPC").unwrap();
        assert_eq!(
            index.path_segments().and_then(|mut segments| segments.next_back()),
            Some("^GSPC")
        );
    }

    #[test]
    fn chart_query_uses_epoch_seconds() {
        let chunk = FetchChunk {
            index: 0,
            start_ts_ms_utc: 1_000_999,
            end_ts_ms_utc_exclusive: 2_000_000,
        };
        let query = chart_query(&chunk, "5m");
        assert_eq!(query[0], ("period1", "1000".to_string()));
        assert_eq!(query[1], ("period2", "2000".to_string()));
        assert_eq!(query[2], ("interval", "5m".to_string()));
        assert_eq!(query[3], ("includePrePost", "false".to_string()));
    }

    #[test]
    fn raw_bars_survive_csv_persistence() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("raw/spy_intraday_full.csv");
        let bars = vec![bar(NOW_MS, 590.25), bar(NOW_MS + MINUTE_MS, 590.5)];

        write_raw_bars(&path, &bars).unwrap();
        let header = fs::read_to_string(&path).unwrap();
        assert!(header.starts_with("timestamp_utc,ts_ms_utc,open,high,low,close,volume\n"));
        assert!(header.contains("2025-01-01T00:00:00Z"));

        assert_eq!(read_raw_bars(&path).unwrap(), bars);
    }
}
