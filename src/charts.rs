//! Static SVG charts for the return samples and the fitted bridge.
//!
//! Charts are written by hand into SVG text. They only read samples and fit
//! results; nothing here feeds back into the computation.

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::bridge::{BridgeFit, BridgePath, ReversionStrength};
use crate::output::write_atomic;
use crate::returns::{ReturnSample, SampleWindow};
use crate::stats::mean;

pub const DISTRIBUTIONS_FILE: &str = "distributions.svg";
pub const BRIDGE_EVOLUTION_FILE: &str = "bridge_evolution.svg";
pub const SUMMARY_FILE: &str = "summary.svg";

const HISTOGRAM_BINS: usize = 25;
const STRONG_REVERSION_THRESHOLD: f64 = 0.02;
const AXIS_TICKS: usize = 5;

const OPEN_COLOR: &str = "#1f4fd1";
const CLOSE_COLOR: &str = "#f08c1a";
const PATH_COLOR: &str = "#1f4fd1";
const VOL_COLOR: &str = "#7b2d9b";
const ZERO_COLOR: &str = "#d62728";
const MEAN_VOL_COLOR: &str = "#2ca02c";
const GRID_COLOR: &str = "#e3e6ea";
const INK: &str = "#182026";
const MUTED: &str = "#5f6a73";

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot chart an empty {0} sample")]
    EmptySample(SampleWindow),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartArtifacts {
    pub distributions: PathBuf,
    pub bridge_evolution: PathBuf,
    pub summary: PathBuf,
}

pub fn render_all(
    dir: &Path,
    open: &ReturnSample,
    close: &ReturnSample,
    fit: &BridgeFit,
) -> Result<ChartArtifacts, ChartError> {
    Ok(ChartArtifacts {
        distributions: render_distributions(dir, open, close)?,
        bridge_evolution: render_bridge_evolution(dir, fit)?,
        summary: render_summary(dir, open, close, fit)?,
    })
}

pub fn render_distributions(
    dir: &Path,
    open: &ReturnSample,
    close: &ReturnSample,
) -> Result<PathBuf, ChartError> {
    ensure_non_empty(open)?;
    ensure_non_empty(close)?;
    write_chart(dir, DISTRIBUTIONS_FILE, &distributions_svg(open, close))
}

pub fn render_bridge_evolution(dir: &Path, fit: &BridgeFit) -> Result<PathBuf, ChartError> {
    write_chart(dir, BRIDGE_EVOLUTION_FILE, &bridge_evolution_svg(fit))
}

pub fn render_summary(
    dir: &Path,
    open: &ReturnSample,
    close: &ReturnSample,
    fit: &BridgeFit,
) -> Result<PathBuf, ChartError> {
    ensure_non_empty(open)?;
    ensure_non_empty(close)?;
    write_chart(dir, SUMMARY_FILE, &summary_svg(open, close, fit))
}

fn ensure_non_empty(sample: &ReturnSample) -> Result<(), ChartError> {
    if sample.is_empty() {
        return Err(ChartError::EmptySample(sample.window()));
    }
    Ok(())
}

fn write_chart(dir: &Path, file_name: &str, svg: &str) -> Result<PathBuf, ChartError> {
    let out = dir.join(file_name);
    write_atomic(&out, svg.as_bytes())?;
    info!(
        component = "charts",
        event = "charts.render",
        chart = file_name,
        path = %out.display(),
        bytes = svg.len()
    );
    Ok(out)
}

fn distributions_svg(open: &ReturnSample, close: &ReturnSample) -> String {
    let mut canvas = Canvas::new(1600.0, 520.0);
    canvas.title(800.0, 34.0, "Return Distributions: Open vs Close");

    draw_histograms(
        &mut canvas,
        Rect::new(70.0, 80.0, 420.0, 370.0),
        open,
        close,
        true,
    );
    draw_box_plots(&mut canvas, Rect::new(600.0, 80.0, 420.0, 370.0), open, close);
    draw_ecdfs(&mut canvas, Rect::new(1130.0, 80.0, 420.0, 370.0), open, close);

    canvas.finish()
}

fn bridge_evolution_svg(fit: &BridgeFit) -> String {
    let mut canvas = Canvas::new(1200.0, 860.0);
    canvas.title(600.0, 34.0, "Bridge Evolution (Open → Close)");

    draw_mean_path(
        &mut canvas,
        Rect::new(90.0, 80.0, 1040.0, 320.0),
        &fit.path,
        "Mean Evolution",
    );
    draw_volatility_path(
        &mut canvas,
        Rect::new(90.0, 480.0, 1040.0, 300.0),
        &fit.path,
        fit.summary.volatility,
        "Volatility Evolution During Trading Day",
    );
    canvas.text(
        610.0,
        835.0,
        13.0,
        "middle",
        INK,
        "Normalized Time (0 = Open, 1 = Close)",
    );

    canvas.finish()
}

fn summary_svg(open: &ReturnSample, close: &ReturnSample, fit: &BridgeFit) -> String {
    let mut canvas = Canvas::new(1600.0, 1060.0);
    canvas.title(800.0, 36.0, "Bridge Analysis: Complete Summary");

    draw_histograms(
        &mut canvas,
        Rect::new(80.0, 80.0, 940.0, 240.0),
        open,
        close,
        false,
    );
    canvas.text_block(1110.0, 100.0, &statistics_lines(fit));

    draw_mean_path(
        &mut canvas,
        Rect::new(80.0, 400.0, 1460.0, 250.0),
        &fit.path,
        "Bridge Evolution",
    );

    draw_volatility_path(
        &mut canvas,
        Rect::new(80.0, 730.0, 940.0, 260.0),
        &fit.path,
        fit.summary.volatility,
        "Volatility Evolution",
    );
    canvas.text_block(1110.0, 740.0, &interpretation_lines(fit));

    canvas.finish()
}

fn statistics_lines(fit: &BridgeFit) -> Vec<String> {
    vec![
        "STATISTICS".to_string(),
        "════════════════".to_string(),
        "Open:".to_string(),
        format!("  N = {}", fit.open.observations),
        format!("  μ = {:.6}", fit.open.mean),
        format!("  σ = {:.6}", fit.open.std_dev),
        String::new(),
        "Close:".to_string(),
        format!("  N = {}", fit.close.observations),
        format!("  μ = {:.6}", fit.close.mean),
        format!("  σ = {:.6}", fit.close.std_dev),
        String::new(),
        "Bridge:".to_string(),
        format!("  Drift = {:.6}", fit.summary.drift),
        format!("  Vol = {:.6}", fit.summary.volatility),
        format!("  Reversion = {}", fit.summary.reversion_strength),
    ]
}

fn interpretation_lines(fit: &BridgeFit) -> Vec<String> {
    let reverts = fit.close.mean.abs() < fit.open.mean.abs();
    let vol_change = if fit.open.std_dev > 0.0 {
        format!(
            "{:.1}%",
            (fit.close.std_dev - fit.open.std_dev) / fit.open.std_dev * 100.0
        )
    } else {
        "n/a".to_string()
    };
    let drift_label = if fit.summary.drift < 0.0 {
        "Negative drift"
    } else {
        "Positive drift"
    };
    let strength_label = match fit.summary.reversion_strength {
        ReversionStrength::Value(v) if v > STRONG_REVERSION_THRESHOLD => "(Strong)",
        ReversionStrength::Value(_) => "(Moderate)",
        ReversionStrength::Undefined => "(zero volatility)",
    };

    vec![
        "INTERPRETATION".to_string(),
        "════════════════".to_string(),
        "✓ Mean reversion:".to_string(),
        format!("    {}", if reverts { "YES" } else { "NO" }),
        "✓ Volatility change:".to_string(),
        format!("    {vol_change}"),
        "✓ Bridge reveals:".to_string(),
        format!("    {drift_label}"),
        "✓ Reversion strength:".to_string(),
        format!("    {} {}", fit.summary.reversion_strength, strength_label),
    ]
}

fn draw_histograms(
    canvas: &mut Canvas,
    rect: Rect,
    open: &ReturnSample,
    close: &ReturnSample,
    show_means: bool,
) {
    let (lo, hi) = padded_range(open.values().iter().chain(close.values()).copied(), 0.0);
    let edges = bin_edges(lo, hi, HISTOGRAM_BINS);
    let open_density = histogram_density(open.values(), &edges);
    let close_density = histogram_density(close.values(), &edges);
    let y_max = open_density
        .iter()
        .chain(&close_density)
        .copied()
        .fold(0.0_f64, f64::max);

    let panel = Panel::new(rect, (lo, hi), (0.0, if y_max > 0.0 { y_max * 1.1 } else { 1.0 }));
    panel.draw_axes(canvas, "Return Distributions", "Log Returns", "Density");

    for (density, color) in [(&open_density, OPEN_COLOR), (&close_density, CLOSE_COLOR)] {
        for (idx, value) in density.iter().enumerate() {
            if *value <= 0.0 {
                continue;
            }
            let x0 = panel.x(edges[idx]);
            let x1 = panel.x(edges[idx + 1]);
            let y = panel.y(*value);
            canvas.rect(x0, y, x1 - x0, panel.y(0.0) - y, color, 0.55, Some("#000000"));
        }
    }

    panel.vertical_marker(canvas, 0.0, ZERO_COLOR, Some("3,4"));

    let mut legend = vec![
        (OPEN_COLOR, "Open".to_string()),
        (CLOSE_COLOR, "Close".to_string()),
    ];
    if show_means {
        let open_mean = mean(open.values()).unwrap_or(0.0);
        let close_mean = mean(close.values()).unwrap_or(0.0);
        panel.vertical_marker(canvas, open_mean, OPEN_COLOR, Some("8,5"));
        panel.vertical_marker(canvas, close_mean, CLOSE_COLOR, Some("8,5"));
        legend.push((OPEN_COLOR, format!("Open μ={open_mean:.5}")));
        legend.push((CLOSE_COLOR, format!("Close μ={close_mean:.5}")));
    }
    canvas.legend(rect.right() - 150.0, rect.top + 16.0, &legend);
}

fn draw_box_plots(canvas: &mut Canvas, rect: Rect, open: &ReturnSample, close: &ReturnSample) {
    let (lo, hi) = padded_range(open.values().iter().chain(close.values()).copied(), 0.05);
    let panel = Panel::new(rect, (0.0, 2.0), (lo, hi));
    panel.draw_y_axis(canvas, "Dispersion Comparison", "Log Returns");

    for (slot, sample, label) in [(0.5, open, "Open"), (1.5, close, "Close")] {
        let Some(stats) = BoxStats::from_values(sample.values()) else {
            continue;
        };
        let cx = panel.x(slot);
        let half = rect.width * 0.12;

        canvas.line(cx, panel.y(stats.whisker_low), cx, panel.y(stats.q1), INK, 1.2, None);
        canvas.line(cx, panel.y(stats.q3), cx, panel.y(stats.whisker_high), INK, 1.2, None);
        for whisker in [stats.whisker_low, stats.whisker_high] {
            let y = panel.y(whisker);
            canvas.line(cx - half / 2.0, y, cx + half / 2.0, y, INK, 1.2, None);
        }

        let top = panel.y(stats.q3);
        canvas.rect(
            cx - half,
            top,
            half * 2.0,
            panel.y(stats.q1) - top,
            "#add8e6",
            0.7,
            Some(INK),
        );
        let median = panel.y(stats.median);
        canvas.line(cx - half, median, cx + half, median, ZERO_COLOR, 2.0, None);

        for outlier in &stats.outliers {
            canvas.circle(cx, panel.y(*outlier), 3.0, "none", INK);
        }
        canvas.text(cx, rect.bottom() + 20.0, 12.0, "middle", INK, label);
    }

    panel.horizontal_marker(canvas, 0.0, ZERO_COLOR, Some("3,4"));
}

fn draw_ecdfs(canvas: &mut Canvas, rect: Rect, open: &ReturnSample, close: &ReturnSample) {
    let (lo, hi) = padded_range(open.values().iter().chain(close.values()).copied(), 0.05);
    let panel = Panel::new(rect, (lo, hi), (0.0, 1.0));
    panel.draw_axes(
        canvas,
        "Cumulative Distribution Functions",
        "Log Returns",
        "Cumulative Probability",
    );

    for (sample, color) in [(open, OPEN_COLOR), (close, CLOSE_COLOR)] {
        let points: Vec<(f64, f64)> = ecdf(sample.values())
            .into_iter()
            .map(|(x, p)| (panel.x(x), panel.y(p)))
            .collect();
        canvas.polyline(&points, color, 2.0);
    }

    panel.vertical_marker(canvas, 0.0, ZERO_COLOR, Some("3,4"));
    canvas.legend(
        rect.left + 16.0,
        rect.top + 16.0,
        &[
            (OPEN_COLOR, "Open".to_string()),
            (CLOSE_COLOR, "Close".to_string()),
        ],
    );
}

fn draw_mean_path(canvas: &mut Canvas, rect: Rect, path: &BridgePath, title: &str) {
    let lower: Vec<f64> = path.points.iter().map(|p| p.mean - p.std_dev).collect();
    let upper: Vec<f64> = path.points.iter().map(|p| p.mean + p.std_dev).collect();
    let (lo, hi) = padded_range(lower.iter().chain(&upper).copied(), 0.0);

    let panel = Panel::new(rect, (0.0, 1.0), (lo, hi));
    panel.draw_axes(canvas, title, "Normalized Time", "Mean Return");

    let mut band: Vec<(f64, f64)> = path
        .points
        .iter()
        .zip(&upper)
        .map(|(p, u)| (panel.x(p.t), panel.y(*u)))
        .collect();
    band.extend(
        path.points
            .iter()
            .zip(&lower)
            .rev()
            .map(|(p, l)| (panel.x(p.t), panel.y(*l))),
    );
    canvas.polygon(&band, PATH_COLOR, 0.2);

    panel.horizontal_marker(canvas, 0.0, ZERO_COLOR, Some("8,5"));

    let line: Vec<(f64, f64)> = path
        .points
        .iter()
        .map(|p| (panel.x(p.t), panel.y(p.mean)))
        .collect();
    canvas.polyline(&line, PATH_COLOR, 3.0);

    if let (Some(first), Some(last)) = (path.points.first(), path.points.last()) {
        canvas.circle(panel.x(first.t), panel.y(first.mean), 7.0, ZERO_COLOR, INK);
        canvas.circle(panel.x(last.t), panel.y(last.mean), 7.0, ZERO_COLOR, INK);
    }

    canvas.legend(
        rect.right() - 230.0,
        rect.top + 16.0,
        &[
            (PATH_COLOR, "Bridge path μ(t)".to_string()),
            (PATH_COLOR, "±1σ band".to_string()),
            (ZERO_COLOR, "Observed endpoints".to_string()),
        ],
    );
}

fn draw_volatility_path(
    canvas: &mut Canvas,
    rect: Rect,
    path: &BridgePath,
    mean_volatility: f64,
    title: &str,
) {
    let (lo, hi) = padded_range(
        path.points
            .iter()
            .map(|p| p.std_dev)
            .chain(std::iter::once(mean_volatility)),
        0.0,
    );
    let panel = Panel::new(rect, (0.0, 1.0), (lo, hi));
    panel.draw_axes(canvas, title, "Normalized Time", "Volatility");

    panel.horizontal_marker(canvas, mean_volatility, MEAN_VOL_COLOR, Some("8,5"));

    let line: Vec<(f64, f64)> = path
        .points
        .iter()
        .map(|p| (panel.x(p.t), panel.y(p.std_dev)))
        .collect();
    canvas.polyline(&line, VOL_COLOR, 3.0);

    if let (Some(first), Some(last)) = (path.points.first(), path.points.last()) {
        canvas.circle(panel.x(first.t), panel.y(first.std_dev), 7.0, ZERO_COLOR, INK);
        canvas.circle(panel.x(last.t), panel.y(last.std_dev), 7.0, ZERO_COLOR, INK);
    }

    canvas.legend(
        rect.right() - 260.0,
        rect.top + 16.0,
        &[
            (VOL_COLOR, "Bridge volatility σ(t)".to_string()),
            (
                MEAN_VOL_COLOR,
                format!("Mean volatility: {mean_volatility:.5}"),
            ),
        ],
    );
}

#[derive(Debug, Clone, Copy)]
struct Rect {
    left: f64,
    top: f64,
    width: f64,
    height: f64,
}

impl Rect {
    fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    fn right(&self) -> f64 {
        self.left + self.width
    }

    fn bottom(&self) -> f64 {
        self.top + self.height
    }
}

struct Panel {
    rect: Rect,
    x_range: (f64, f64),
    y_range: (f64, f64),
}

impl Panel {
    fn new(rect: Rect, x_range: (f64, f64), y_range: (f64, f64)) -> Self {
        Self {
            rect,
            x_range,
            y_range,
        }
    }

    fn x(&self, value: f64) -> f64 {
        let (lo, hi) = self.x_range;
        self.rect.left + (value - lo) / (hi - lo) * self.rect.width
    }

    fn y(&self, value: f64) -> f64 {
        let (lo, hi) = self.y_range;
        self.rect.bottom() - (value - lo) / (hi - lo) * self.rect.height
    }

    fn contains_x(&self, value: f64) -> bool {
        value >= self.x_range.0 && value <= self.x_range.1
    }

    fn contains_y(&self, value: f64) -> bool {
        value >= self.y_range.0 && value <= self.y_range.1
    }

    fn draw_axes(&self, canvas: &mut Canvas, title: &str, x_label: &str, y_label: &str) {
        self.draw_y_axis(canvas, title, y_label);

        let rect = self.rect;
        for tick in ticks(self.x_range) {
            let x = self.x(tick);
            canvas.line(x, rect.top, x, rect.bottom(), GRID_COLOR, 1.0, None);
            canvas.text(x, rect.bottom() + 18.0, 11.0, "middle", MUTED, &format_tick(tick));
        }
        canvas.text(
            rect.left + rect.width / 2.0,
            rect.bottom() + 40.0,
            13.0,
            "middle",
            INK,
            x_label,
        );
    }

    fn draw_y_axis(&self, canvas: &mut Canvas, title: &str, y_label: &str) {
        let rect = self.rect;
        for tick in ticks(self.y_range) {
            let y = self.y(tick);
            canvas.line(rect.left, y, rect.right(), y, GRID_COLOR, 1.0, None);
            canvas.text(rect.left - 8.0, y + 4.0, 11.0, "end", MUTED, &format_tick(tick));
        }
        canvas.frame(rect);
        canvas.text(
            rect.left + rect.width / 2.0,
            rect.top - 14.0,
            15.0,
            "middle",
            INK,
            title,
        );
        canvas.vertical_text(rect.left - 62.0, rect.top + rect.height / 2.0, 13.0, y_label);
    }

    fn vertical_marker(&self, canvas: &mut Canvas, value: f64, color: &str, dash: Option<&str>) {
        if !self.contains_x(value) {
            return;
        }
        let x = self.x(value);
        canvas.line(x, self.rect.top, x, self.rect.bottom(), color, 1.8, dash);
    }

    fn horizontal_marker(&self, canvas: &mut Canvas, value: f64, color: &str, dash: Option<&str>) {
        if !self.contains_y(value) {
            return;
        }
        let y = self.y(value);
        canvas.line(self.rect.left, y, self.rect.right(), y, color, 1.8, dash);
    }
}

struct Canvas {
    out: String,
}

impl Canvas {
    fn new(width: f64, height: f64) -> Self {
        let mut out = String::new();
        out.push_str(&format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\" font-family=\"Helvetica, Arial, sans-serif\">\n"
        ));
        out.push_str(&format!(
            "<rect x=\"0\" y=\"0\" width=\"{width}\" height=\"{height}\" fill=\"#ffffff\"/>\n"
        ));
        Self { out }
    }

    fn finish(mut self) -> String {
        self.out.push_str("</svg>\n");
        self.out
    }

    fn title(&mut self, x: f64, y: f64, body: &str) {
        self.out.push_str(&format!(
            "<text x=\"{x:.1}\" y=\"{y:.1}\" font-size=\"20\" font-weight=\"bold\" text-anchor=\"middle\" fill=\"{INK}\">{}</text>\n",
            escape_xml(body)
        ));
    }

    fn text(&mut self, x: f64, y: f64, size: f64, anchor: &str, color: &str, body: &str) {
        self.out.push_str(&format!(
            "<text x=\"{x:.1}\" y=\"{y:.1}\" font-size=\"{size}\" text-anchor=\"{anchor}\" fill=\"{color}\">{}</text>\n",
            escape_xml(body)
        ));
    }

    fn vertical_text(&mut self, x: f64, y: f64, size: f64, body: &str) {
        self.out.push_str(&format!(
            "<text x=\"{x:.1}\" y=\"{y:.1}\" font-size=\"{size}\" text-anchor=\"middle\" fill=\"{INK}\" transform=\"rotate(-90 {x:.1} {y:.1})\">{}</text>\n",
            escape_xml(body)
        ));
    }

    fn text_block(&mut self, x: f64, y: f64, lines: &[String]) {
        self.out.push_str(&format!(
            "<text x=\"{x:.1}\" y=\"{y:.1}\" font-size=\"14\" font-family=\"Menlo, Consolas, monospace\" fill=\"{INK}\">"
        ));
        for (idx, line) in lines.iter().enumerate() {
            let dy = if idx == 0 { 0.0 } else { 18.0 };
            self.out.push_str(&format!(
                "<tspan x=\"{x:.1}\" dy=\"{dy}\" xml:space=\"preserve\">{}</tspan>",
                escape_xml(line)
            ));
        }
        self.out.push_str("</text>\n");
    }

    #[allow(clippy::too_many_arguments)]
    fn line(
        &mut self,
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        stroke: &str,
        width: f64,
        dash: Option<&str>,
    ) {
        let dash = dash
            .map(|pattern| format!(" stroke-dasharray=\"{pattern}\""))
            .unwrap_or_default();
        self.out.push_str(&format!(
            "<line x1=\"{x1:.2}\" y1=\"{y1:.2}\" x2=\"{x2:.2}\" y2=\"{y2:.2}\" stroke=\"{stroke}\" stroke-width=\"{width}\"{dash}/>\n"
        ));
    }

    #[allow(clippy::too_many_arguments)]
    fn rect(
        &mut self,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        fill: &str,
        opacity: f64,
        stroke: Option<&str>,
    ) {
        let stroke = stroke
            .map(|color| format!(" stroke=\"{color}\" stroke-width=\"0.6\""))
            .unwrap_or_default();
        self.out.push_str(&format!(
            "<rect x=\"{x:.2}\" y=\"{y:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"{fill}\" fill-opacity=\"{opacity}\"{stroke}/>\n",
            width.max(0.0),
            height.max(0.0)
        ));
    }

    fn frame(&mut self, rect: Rect) {
        self.out.push_str(&format!(
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"none\" stroke=\"{MUTED}\" stroke-width=\"1\"/>\n",
            rect.left, rect.top, rect.width, rect.height
        ));
    }

    fn circle(&mut self, cx: f64, cy: f64, r: f64, fill: &str, stroke: &str) {
        self.out.push_str(&format!(
            "<circle cx=\"{cx:.2}\" cy=\"{cy:.2}\" r=\"{r}\" fill=\"{fill}\" stroke=\"{stroke}\" stroke-width=\"1.5\"/>\n"
        ));
    }

    fn polyline(&mut self, points: &[(f64, f64)], stroke: &str, width: f64) {
        if points.is_empty() {
            return;
        }
        self.out.push_str(&format!(
            "<polyline points=\"{}\" fill=\"none\" stroke=\"{stroke}\" stroke-width=\"{width}\" stroke-linejoin=\"round\"/>\n",
            format_points(points)
        ));
    }

    fn polygon(&mut self, points: &[(f64, f64)], fill: &str, opacity: f64) {
        if points.is_empty() {
            return;
        }
        self.out.push_str(&format!(
            "<polygon points=\"{}\" fill=\"{fill}\" fill-opacity=\"{opacity}\" stroke=\"none\"/>\n",
            format_points(points)
        ));
    }

    fn legend(&mut self, x: f64, y: f64, entries: &[(&str, String)]) {
        for (idx, (color, label)) in entries.iter().enumerate() {
            let row_y = y + idx as f64 * 18.0;
            self.rect(x, row_y - 9.0, 14.0, 10.0, color, 0.8, None);
            self.text(x + 20.0, row_y, 11.0, "start", INK, label);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct BoxStats {
    q1: f64,
    median: f64,
    q3: f64,
    whisker_low: f64,
    whisker_high: f64,
    outliers: Vec<f64>,
}

impl BoxStats {
    /// Quartiles by linear interpolation; whiskers reach the most extreme
    /// observations within 1.5 IQR of the box.
    fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let q1 = quantile(&sorted, 0.25);
        let median = quantile(&sorted, 0.5);
        let q3 = quantile(&sorted, 0.75);
        let iqr = q3 - q1;
        let low_fence = q1 - 1.5 * iqr;
        let high_fence = q3 + 1.5 * iqr;

        let whisker_low = sorted
            .iter()
            .copied()
            .find(|v| *v >= low_fence)
            .unwrap_or(q1);
        let whisker_high = sorted
            .iter()
            .rev()
            .copied()
            .find(|v| *v <= high_fence)
            .unwrap_or(q3);
        let outliers = sorted
            .iter()
            .copied()
            .filter(|v| *v < low_fence || *v > high_fence)
            .collect();

        Some(Self {
            q1,
            median,
            q3,
            whisker_low,
            whisker_high,
            outliers,
        })
    }
}

fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}

fn ecdf(values: &[f64]) -> Vec<(f64, f64)> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len();
    sorted
        .into_iter()
        .enumerate()
        .map(|(idx, x)| {
            let p = if n > 1 {
                idx as f64 / (n - 1) as f64
            } else {
                1.0
            };
            (x, p)
        })
        .collect()
}

fn bin_edges(lo: f64, hi: f64, bins: usize) -> Vec<f64> {
    let width = (hi - lo) / bins as f64;
    (0..=bins)
        .map(|idx| {
            if idx == bins {
                hi
            } else {
                lo + idx as f64 * width
            }
        })
        .collect()
}

/// Counts normalised so the bars integrate to one.
fn histogram_density(values: &[f64], edges: &[f64]) -> Vec<f64> {
    let bins = edges.len().saturating_sub(1);
    let mut counts = vec![0u64; bins];
    if bins == 0 || values.is_empty() {
        return vec![0.0; bins];
    }
    let lo = edges[0];
    let hi = edges[bins];
    let width = (hi - lo) / bins as f64;

    for value in values {
        if *value < lo || *value > hi {
            continue;
        }
        let idx = (((*value - lo) / width).floor() as usize).min(bins - 1);
        counts[idx] += 1;
    }

    let n = values.len() as f64;
    counts
        .into_iter()
        .map(|count| count as f64 / (n * width))
        .collect()
}

fn padded_range(values: impl Iterator<Item = f64>, pad_fraction: f64) -> (f64, f64) {
    let (mut lo, mut hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if !lo.is_finite() || !hi.is_finite() {
        return (-1.0, 1.0);
    }
    if hi - lo <= 0.0 {
        let half = (lo.abs() * 0.1).max(1e-6);
        lo -= half;
        hi += half;
    }
    let pad = (hi - lo) * pad_fraction;
    (lo - pad, hi + pad)
}

fn ticks(range: (f64, f64)) -> Vec<f64> {
    let (lo, hi) = range;
    let step = (hi - lo) / (AXIS_TICKS - 1) as f64;
    (0..AXIS_TICKS).map(|idx| lo + idx as f64 * step).collect()
}

fn format_tick(value: f64) -> String {
    let magnitude = value.abs();
    if magnitude < 1e-12 {
        "0".to_string()
    } else if !(1e-2..1e4).contains(&magnitude) {
        format!("{value:.2e}")
    } else {
        format!("{value:.3}")
    }
}

fn format_points(points: &[(f64, f64)]) -> String {
    points
        .iter()
        .map(|(x, y)| format!("{x:.2},{y:.2}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::fit;

    fn samples() -> (ReturnSample, ReturnSample) {
        (
            ReturnSample::new(SampleWindow::Open, [0.001, -0.002, 0.0015, -0.0005]),
            ReturnSample::new(SampleWindow::Close, [-0.0003, 0.0002, -0.0001, 0.0004]),
        )
    }

    #[test]
    fn histogram_density_integrates_to_one() {
        let values = [0.0, 0.1, 0.2, 0.3, 0.4, 1.0];
        let edges = bin_edges(0.0, 1.0, 4);
        let density = histogram_density(&values, &edges);
        let area: f64 = density.iter().map(|d| d * 0.25).sum();
        assert!((area - 1.0).abs() < 1e-12);
        // right edge lands in the last bin
        assert!(density[3] > 0.0);
    }

    #[test]
    fn box_stats_match_linear_quartiles() {
        let stats = BoxStats::from_values(&[1.0, 2.0, 3.0, 4.0, 100.0]).unwrap();
        assert_eq!(stats.q1, 2.0);
        assert_eq!(stats.median, 3.0);
        assert_eq!(stats.q3, 4.0);
        assert_eq!(stats.whisker_high, 4.0);
        assert_eq!(stats.outliers, vec![100.0]);
    }

    #[test]
    fn ecdf_spans_zero_to_one() {
        let curve = ecdf(&[0.3, -0.1, 0.2]);
        assert_eq!(curve.first(), Some(&(-0.1, 0.0)));
        assert_eq!(curve.last(), Some(&(0.3, 1.0)));
    }

    #[test]
    fn degenerate_range_is_widened() {
        let (lo, hi) = padded_range([0.0, 0.0].into_iter(), 0.0);
        assert!(lo < 0.0 && hi > 0.0);
    }

    #[test]
    fn summary_chart_carries_statistics_and_interpretation() {
        let (open, close) = samples();
        let fit = fit(&open, &close, 5).unwrap();
        let svg = summary_svg(&open, &close, &fit);
        assert!(svg.starts_with("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert!(svg.contains("STATISTICS"));
        assert!(svg.contains("N = 4"));
        assert!(svg.contains("Mean reversion:"));
    }

    #[test]
    fn text_is_escaped() {
        assert_eq!(escape_xml("a<b & \"c\""), "a&lt;b &amp; &quot;c&quot;");
    }
}
