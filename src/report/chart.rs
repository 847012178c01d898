//! SVG chart of the traffic series with flagged points

use crate::anomaly::AnomalyReport;
use crate::error::{AnomalyError, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

const SERIES_COLOR: &str = "#1f77b4";
const ANOMALY_COLOR: &str = "#d62728";
const AVERAGE_COLOR: &str = "#ff7f0e";
const TICKS: usize = 5;

/// Chart layout options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    pub width: f64,
    pub height: f64,
    /// Rolling mean window; 0 disables the overlay
    pub moving_average_window: usize,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            width: 1500.0,
            height: 600.0,
            moving_average_window: 50,
        }
    }
}

impl ChartConfig {
    pub fn with_moving_average_window(mut self, window: usize) -> Self {
        self.moving_average_window = window;
        self
    }

    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = width;
        self.height = height;
        self
    }
}

/// Trailing rolling mean; `None` until the window is full
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }
    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    for (i, &v) in values.iter().enumerate() {
        sum += v;
        if i >= window {
            sum -= values[i - window];
        }
        out.push(if i + 1 >= window { Some(sum / window as f64) } else { None });
    }
    out
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Linear map from a data range onto a pixel range
#[derive(Debug, Clone, Copy)]
struct Axis {
    min: f64,
    max: f64,
    start: f64,
    end: f64,
}

impl Axis {
    fn new(min: f64, max: f64, start: f64, end: f64) -> Self {
        // Flat data still needs a non-empty range
        let (min, max) = if max > min { (min, max) } else { (min - 1.0, max + 1.0) };
        Self { min, max, start, end }
    }

    fn map(&self, v: f64) -> f64 {
        self.start + (v - self.min) / (self.max - self.min) * (self.end - self.start)
    }

    fn value_at(&self, fraction: f64) -> f64 {
        self.min + fraction * (self.max - self.min)
    }
}

/// Renders an [`AnomalyReport`] as an SVG line chart
#[derive(Debug, Clone, Default)]
pub struct ChartRenderer {
    config: ChartConfig,
}

impl ChartRenderer {
    pub fn new(config: ChartConfig) -> Self {
        Self { config }
    }

    pub fn render(&self, report: &AnomalyReport, title: &str) -> Result<String> {
        let mut svg = String::new();
        self.write_svg(&mut svg, report, title)
            .map_err(|e| AnomalyError::Report(format!("failed to render chart: {}", e)))?;
        Ok(svg)
    }

    fn write_svg(&self, svg: &mut String, report: &AnomalyReport, title: &str) -> std::fmt::Result {
        let (w, h) = (self.config.width, self.config.height);
        let (left, right, top, bottom) = (90.0, w - 30.0, 60.0, h - 60.0);

        // Timestamps drive the x axis unless they are all equal
        let times: Vec<f64> = report
            .records
            .iter()
            .map(|r| r.record.timestamp.and_utc().timestamp_millis() as f64)
            .collect();
        let t_min = times.iter().copied().fold(f64::INFINITY, f64::min);
        let t_max = times.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let xs: Vec<f64> = if t_max > t_min {
            times
        } else {
            (0..report.len()).map(|i| i as f64).collect()
        };
        let x_min = xs.iter().copied().fold(f64::INFINITY, f64::min);
        let x_max = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let values: Vec<f64> = report.records.iter().map(|r| r.record.value).collect();
        let v_min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let v_max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let x_axis = Axis::new(x_min, x_max, left, right);
        let y_axis = Axis::new(v_min, v_max, bottom, top);

        writeln!(svg, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>")?;
        writeln!(
            svg,
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">"
        )?;
        writeln!(svg, "  <style>")?;
        writeln!(svg, "    .label {{ font-family: sans-serif; font-size: 12px; fill: #333; }}")?;
        writeln!(svg, "    .title {{ font-family: sans-serif; font-size: 18px; font-weight: bold; }}")?;
        writeln!(svg, "  </style>")?;
        writeln!(svg, "  <rect width=\"100%\" height=\"100%\" fill=\"#ffffff\"/>")?;
        writeln!(
            svg,
            "  <text x=\"{:.1}\" y=\"32\" text-anchor=\"middle\" class=\"title\">{}</text>",
            w / 2.0,
            escape_xml(title)
        )?;

        // Axes
        writeln!(
            svg,
            "  <line x1=\"{left}\" y1=\"{bottom}\" x2=\"{right}\" y2=\"{bottom}\" stroke=\"#333\"/>"
        )?;
        writeln!(
            svg,
            "  <line x1=\"{left}\" y1=\"{top}\" x2=\"{left}\" y2=\"{bottom}\" stroke=\"#333\"/>"
        )?;
        for i in 0..TICKS {
            let fraction = i as f64 / (TICKS - 1) as f64;
            let value = y_axis.value_at(fraction);
            let y = y_axis.map(value);
            writeln!(
                svg,
                "  <line x1=\"{left}\" y1=\"{y:.1}\" x2=\"{right}\" y2=\"{y:.1}\" stroke=\"#eee\"/>"
            )?;
            writeln!(
                svg,
                "  <text x=\"{:.1}\" y=\"{:.1}\" text-anchor=\"end\" class=\"label\">{:.2}</text>",
                left - 8.0,
                y + 4.0,
                value
            )?;
        }
        self.write_time_labels(svg, report, &xs, &x_axis, bottom)?;

        // Full series
        write!(
            svg,
            "  <polyline fill=\"none\" stroke=\"{SERIES_COLOR}\" stroke-opacity=\"0.6\" stroke-width=\"1\" points=\""
        )?;
        for (x, v) in xs.iter().zip(&values) {
            write!(svg, "{:.1},{:.1} ", x_axis.map(*x), y_axis.map(*v))?;
        }
        writeln!(svg, "\"/>")?;

        let window = self.config.moving_average_window;
        let averages = rolling_mean(&values, window);
        let has_average = averages.iter().any(Option::is_some);
        if has_average {
            write!(
                svg,
                "  <polyline fill=\"none\" stroke=\"{AVERAGE_COLOR}\" stroke-width=\"1.5\" points=\""
            )?;
            for (x, avg) in xs.iter().zip(&averages) {
                if let Some(avg) = avg {
                    write!(svg, "{:.1},{:.1} ", x_axis.map(*x), y_axis.map(*avg))?;
                }
            }
            writeln!(svg, "\"/>")?;
        }

        // Flagged points
        for (i, entry) in report.records.iter().enumerate() {
            if entry.is_anomaly {
                writeln!(
                    svg,
                    "  <circle cx=\"{:.1}\" cy=\"{:.1}\" r=\"4\" fill=\"{ANOMALY_COLOR}\"><title>score {:.4}</title></circle>",
                    x_axis.map(xs[i]),
                    y_axis.map(entry.record.value),
                    entry.anomaly_score
                )?;
            }
        }

        // Legend
        let mut entries: Vec<(Option<&str>, String)> = vec![
            (Some(SERIES_COLOR), "Normal Traffic".to_string()),
            (Some(ANOMALY_COLOR), format!("Anomaly ({})", report.anomaly_count())),
        ];
        if has_average {
            entries.push((Some(AVERAGE_COLOR), format!("Moving average ({})", window)));
        }
        entries.push((None, format!("Contamination: {}", report.contamination)));

        let legend_x = right - 200.0;
        let mut legend_y = top + 10.0;
        writeln!(
            svg,
            "  <rect x=\"{:.1}\" y=\"{:.1}\" width=\"190\" height=\"{:.1}\" fill=\"#fff\" fill-opacity=\"0.85\" stroke=\"#ccc\"/>",
            legend_x,
            top,
            entries.len() as f64 * 20.0 + 10.0
        )?;
        for (color, label) in &entries {
            if let Some(color) = color {
                writeln!(
                    svg,
                    "  <rect x=\"{:.1}\" y=\"{:.1}\" width=\"14\" height=\"10\" fill=\"{}\"/>",
                    legend_x + 10.0,
                    legend_y,
                    color
                )?;
            }
            writeln!(
                svg,
                "  <text x=\"{:.1}\" y=\"{:.1}\" class=\"label\">{}</text>",
                legend_x + 32.0,
                legend_y + 10.0,
                escape_xml(label)
            )?;
            legend_y += 20.0;
        }

        writeln!(svg, "</svg>")
    }

    fn write_time_labels(
        &self,
        svg: &mut String,
        report: &AnomalyReport,
        xs: &[f64],
        x_axis: &Axis,
        bottom: f64,
    ) -> std::fmt::Result {
        let n = report.len();
        if n == 0 {
            return Ok(());
        }
        let mut picks = vec![0, n / 2, n - 1];
        picks.dedup();
        for i in picks {
            writeln!(
                svg,
                "  <text x=\"{:.1}\" y=\"{:.1}\" text-anchor=\"middle\" class=\"label\">{}</text>",
                x_axis.map(xs[i]),
                bottom + 20.0,
                report.records[i].record.timestamp.format("%Y-%m-%d %H:%M")
            )?;
        }
        Ok(())
    }
}
