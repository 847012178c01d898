//! Report artifacts: the chart and the anomaly table
//!
//! Both artifacts are rendered in memory first. Files are only touched once
//! everything rendered, and a failed write removes whatever this run already
//! wrote.

mod chart;
mod table;

pub use chart::{rolling_mean, ChartConfig, ChartRenderer};
pub use table::{anomaly_table, to_csv_bytes, SCORE_COLUMN};

use crate::anomaly::AnomalyReport;
use crate::error::{AnomalyError, Result};
use crate::utils::TrafficData;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Output file locations for one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputPaths {
    pub chart: PathBuf,
    pub table: PathBuf,
}

impl OutputPaths {
    /// `{dir}/{name}_graph_{contamination}.svg` and
    /// `{dir}/{name}_anomaly_{contamination}.csv`
    pub fn derive(output_dir: &Path, output_name: &str, contamination: f64) -> Self {
        Self {
            chart: output_dir.join(format!("{}_graph_{}.svg", output_name, contamination)),
            table: output_dir.join(format!("{}_anomaly_{}.csv", output_name, contamination)),
        }
    }
}

/// Fully rendered outputs, not yet on disk
#[derive(Debug, Clone)]
pub struct ReportArtifacts {
    pub chart_svg: String,
    pub table_csv: Vec<u8>,
    pub anomaly_rows: usize,
}

impl ReportArtifacts {
    pub fn render(
        data: &TrafficData,
        report: &AnomalyReport,
        chart: &ChartRenderer,
        title: &str,
    ) -> Result<Self> {
        let chart_svg = chart.render(report, title)?;
        let mut table = anomaly_table(data, report)?;
        let table_csv = to_csv_bytes(&mut table)?;
        Ok(Self {
            chart_svg,
            table_csv,
            anomaly_rows: table.height(),
        })
    }
}

/// Writes artifacts to their derived paths
#[derive(Debug, Clone, Default)]
pub struct ReportWriter;

impl ReportWriter {
    pub fn new() -> Self {
        Self
    }

    /// Write both artifacts, overwriting existing files.
    ///
    /// Creates the output directory when missing.
    pub fn write(&self, artifacts: &ReportArtifacts, paths: &OutputPaths) -> Result<()> {
        for path in [&paths.chart, &paths.table] {
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                fs::create_dir_all(dir).map_err(|e| {
                    AnomalyError::Report(format!("cannot create {}: {}", dir.display(), e))
                })?;
            }
        }

        write_atomic(&paths.chart, artifacts.chart_svg.as_bytes())?;
        if let Err(err) = write_atomic(&paths.table, &artifacts.table_csv) {
            if let Err(cleanup) = fs::remove_file(&paths.chart) {
                warn!(path = %paths.chart.display(), error = %cleanup, "failed to remove chart after table write failed");
            }
            return Err(err);
        }

        debug!(chart = %paths.chart.display(), table = %paths.table.display(), "report written");
        Ok(())
    }
}

/// Write through a sibling temp file so readers never see a half-written file
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    fs::write(&tmp, bytes)
        .and_then(|_| fs::rename(&tmp, path))
        .map_err(|e| {
            let _ = fs::remove_file(&tmp);
            AnomalyError::Report(format!("cannot write {}: {}", path.display(), e))
        })
}
