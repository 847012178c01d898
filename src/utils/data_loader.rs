//! Traffic CSV loading

use crate::error::{AnomalyError, Result};
use crate::record::Record;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use ndarray::Array1;
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Required timestamp column
pub const TIMESTAMP_COLUMN: &str = "timestamp";
/// Required value column
pub const VALUE_COLUMN: &str = "value";

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse an ISO-8601 timestamp.
///
/// Offsets are normalized to UTC and dropped; date-only values map to
/// midnight.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// A loaded traffic series.
///
/// Keeps the source frame so that output tables carry every input column.
#[derive(Debug, Clone)]
pub struct TrafficData {
    frame: DataFrame,
    records: Vec<Record>,
}

impl TrafficData {
    /// Build from an in-memory frame holding `timestamp` and `value` columns
    pub fn from_frame(frame: DataFrame) -> Result<Self> {
        let timestamps = frame
            .column(TIMESTAMP_COLUMN)
            .map_err(|_| missing_column(TIMESTAMP_COLUMN))?
            .as_materialized_series()
            .cast(&DataType::String)?;
        let values = frame
            .column(VALUE_COLUMN)
            .map_err(|_| missing_column(VALUE_COLUMN))?
            .as_materialized_series()
            .cast(&DataType::Float64)?;

        let timestamps = timestamps.str()?;
        let values = values.f64()?;

        let mut records = Vec::with_capacity(frame.height());
        for (row, (ts, value)) in timestamps.into_iter().zip(values.into_iter()).enumerate() {
            let raw_ts = ts.ok_or_else(|| {
                AnomalyError::DataLoad(format!("row {}: timestamp is missing", row + 1))
            })?;
            let timestamp = parse_timestamp(raw_ts).ok_or_else(|| {
                AnomalyError::DataLoad(format!("row {}: cannot parse timestamp '{}'", row + 1, raw_ts))
            })?;
            let value = value.ok_or_else(|| {
                AnomalyError::DataLoad(format!("row {}: value is missing or not numeric", row + 1))
            })?;
            if !value.is_finite() {
                return Err(AnomalyError::DataLoad(format!("row {}: value is not finite", row + 1)));
            }
            records.push(Record::new(row, timestamp, value));
        }

        Ok(Self { frame, records })
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn values(&self) -> Array1<f64> {
        self.records.iter().map(|r| r.value).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn missing_column(name: &str) -> AnomalyError {
    AnomalyError::DataLoad(format!("required column '{}' not found", name))
}

/// Loader for traffic CSV files
#[derive(Debug, Clone)]
pub struct DataLoader {
    /// Rows used for schema inference
    infer_schema_length: usize,
    delimiter: u8,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    /// Create a new data loader
    pub fn new() -> Self {
        Self {
            infer_schema_length: 100,
            delimiter: b',',
        }
    }

    /// Set field delimiter
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_infer_schema_length(mut self, rows: usize) -> Self {
        self.infer_schema_length = rows.max(1);
        self
    }

    /// Load a CSV file into a frame.
    ///
    /// `value` is always read as `Float64`, so integer and decimal readings
    /// can be mixed anywhere in the file.
    pub fn load_csv(&self, path: &Path) -> Result<DataFrame> {
        let file = File::open(path)
            .map_err(|e| AnomalyError::DataLoad(format!("{}: {}", path.display(), e)))?;

        let parse_opts = CsvParseOptions::default().with_separator(self.delimiter);

        let mut value_schema = Schema::with_capacity(1);
        value_schema.with_column(VALUE_COLUMN.into(), DataType::Float64);

        CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(self.infer_schema_length))
            .with_schema_overwrite(Some(Arc::new(value_schema)))
            .with_parse_options(parse_opts)
            .into_reader_with_file_handle(file)
            .finish()
            .map_err(|e| AnomalyError::DataLoad(format!("{}: {}", path.display(), e)))
    }

    /// Load and validate a traffic series
    pub fn load_traffic(&self, path: &Path) -> Result<TrafficData> {
        let frame = self.load_csv(path)?;
        let data = TrafficData::from_frame(frame)?;
        if data.is_empty() {
            return Err(AnomalyError::InsufficientData(format!(
                "{} contains no records",
                path.display()
            )));
        }
        debug!(path = %path.display(), rows = data.len(), "traffic data loaded");
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(lines: &[&str]) -> NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".csv")
            .tempfile()
            .unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        file
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(12, 30, 0)
            .unwrap();

        assert_eq!(parse_timestamp("2024-03-01 12:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01T12:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01T12:30"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01T14:30:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp(" 2024-03-01T12:30:00Z "), Some(expected));

        let with_fraction = parse_timestamp("2024-03-01 12:30:00.250").unwrap();
        assert_eq!(with_fraction.and_utc().timestamp_subsec_millis(), 250);

        let midnight = parse_timestamp("2024-03-01").unwrap();
        assert_eq!(midnight.date(), expected.date());

        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp("2024-13-01"), None);
    }

    #[test]
    fn test_load_traffic() {
        let file = write_csv(&[
            "timestamp,value,host",
            "2024-01-01 00:00:00,10.5,a",
            "2024-01-01 00:01:00,11,b",
            "2024-01-01 00:02:00,250.0,c",
        ]);

        let data = DataLoader::new().load_traffic(file.path()).unwrap();

        assert_eq!(data.len(), 3);
        assert_eq!(data.frame().width(), 3);
        assert_eq!(data.values().to_vec(), vec![10.5, 11.0, 250.0]);
        assert_eq!(data.records()[2].row, 2);
    }

    #[test]
    fn test_missing_file() {
        let result = DataLoader::new().load_traffic(Path::new("/nonexistent/traffic.csv"));
        assert!(matches!(result, Err(AnomalyError::DataLoad(_))));
    }

    #[test]
    fn test_missing_column() {
        let file = write_csv(&["time,value", "2024-01-01,1.0"]);
        let err = DataLoader::new().load_traffic(file.path()).unwrap_err();
        assert!(err.to_string().contains("timestamp"));
    }

    #[test]
    fn test_unparsable_timestamp() {
        let file = write_csv(&["timestamp,value", "2024-01-01,1.0", "not a date,2.0"]);
        let err = DataLoader::new().load_traffic(file.path()).unwrap_err();
        assert!(matches!(err, AnomalyError::DataLoad(_)));
        assert!(err.to_string().contains("row 2"));
    }

    #[test]
    fn test_non_numeric_value() {
        let file = write_csv(&["timestamp,value", "2024-01-01,1.0", "2024-01-02,lots"]);
        let err = DataLoader::new().load_traffic(file.path()).unwrap_err();
        assert!(matches!(err, AnomalyError::DataLoad(_)));
    }

    #[test]
    fn test_integers_then_decimal_past_inference_window() {
        let mut lines = vec!["timestamp,value".to_string()];
        for i in 0..150 {
            lines.push(format!("2024-01-01 00:{:02}:{:02},{}", i / 60, i % 60, 10 + i % 3));
        }
        lines.push("2024-01-01 01:00:00,12.5".to_string());
        let lines: Vec<&str> = lines.iter().map(String::as_str).collect();
        let file = write_csv(&lines);

        let data = DataLoader::new().load_traffic(file.path()).unwrap();

        assert_eq!(data.len(), 151);
        assert_eq!(data.records()[0].value, 10.0);
        assert_eq!(data.records()[150].value, 12.5);
    }

    #[test]
    fn test_non_finite_values_rejected() {
        for bad in ["NaN", "inf", "-inf"] {
            let row = format!("2024-01-01 00:01:00,{}", bad);
            let file = write_csv(&["timestamp,value", "2024-01-01 00:00:00,1.0", &row]);

            let err = DataLoader::new().load_traffic(file.path()).unwrap_err();
            assert!(matches!(err, AnomalyError::DataLoad(_)), "{} gave {:?}", bad, err);
            assert!(err.to_string().contains("row 2"), "{}", err);
        }
    }

    #[test]
    fn test_non_finite_in_frame_rejected() {
        let frame = df!(
            "timestamp" => &["2024-01-01T00:00:00", "2024-01-01T00:05:00"],
            "value" => &[1.0, f64::INFINITY]
        )
        .unwrap();

        let err = TrafficData::from_frame(frame).unwrap_err();
        assert!(err.to_string().contains("not finite"));
    }

    #[test]
    fn test_header_only_is_insufficient() {
        let file = write_csv(&["timestamp,value"]);
        let result = DataLoader::new().load_traffic(file.path());
        assert!(matches!(
            result,
            Err(AnomalyError::InsufficientData(_)) | Err(AnomalyError::DataLoad(_))
        ));
    }

    #[test]
    fn test_from_frame() {
        let frame = df!(
            "timestamp" => &["2024-01-01T00:00:00", "2024-01-01T00:05:00"],
            "value" => &[1i64, 2i64]
        )
        .unwrap();

        let data = TrafficData::from_frame(frame).unwrap();
        assert_eq!(data.values().to_vec(), vec![1.0, 2.0]);
    }
}
