//! Tabular list of flagged records

use crate::anomaly::AnomalyReport;
use crate::error::{AnomalyError, Result};
use crate::utils::TrafficData;
use polars::prelude::*;

/// Column appended to the flagged rows
pub const SCORE_COLUMN: &str = "anomaly_score";

/// Flagged rows of the source frame, every input column kept, plus
/// `anomaly_score`
pub fn anomaly_table(data: &TrafficData, report: &AnomalyReport) -> Result<DataFrame> {
    if data.len() != report.len() {
        return Err(AnomalyError::ShapeMismatch {
            expected: data.len(),
            actual: report.len(),
        });
    }

    let flags = report.mask();
    let mask = BooleanChunked::from_slice("anomaly_mask".into(), flags.as_slice());
    let mut table = data
        .frame()
        .filter(&mask)
        .map_err(|e| AnomalyError::Report(e.to_string()))?;

    let scores: Vec<f64> = report.anomalies.iter().map(|a| a.anomaly_score).collect();
    table
        .with_column(Series::new(SCORE_COLUMN.into(), scores))
        .map_err(|e| AnomalyError::Report(e.to_string()))?;

    Ok(table)
}

/// Serialize a frame as CSV with a header row
pub fn to_csv_bytes(table: &mut DataFrame) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    CsvWriter::new(&mut buf)
        .include_header(true)
        .finish(table)
        .map_err(|e| AnomalyError::Report(e.to_string()))?;
    Ok(buf)
}
