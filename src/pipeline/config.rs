//! Pipeline configuration

use crate::anomaly::{validate_contamination, EnsembleConfig};
use crate::error::{AnomalyError, Result};
use crate::report::{ChartConfig, OutputPaths};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Input CSV with `timestamp` and `value` columns
    pub input_path: PathBuf,
    /// Base name of the output files; the input file stem when unset
    pub output_name: Option<String>,
    /// Directory receiving the chart and the anomaly table
    pub output_dir: PathBuf,
    /// Expected fraction of anomalous records, in (0, 0.5]
    pub contamination: f64,
    pub ensemble: EnsembleConfig,
    pub chart: ChartConfig,
    /// Abort the run when it takes longer than this many milliseconds
    pub timeout_ms: Option<u64>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::new(),
            output_name: None,
            output_dir: PathBuf::from("output"),
            contamination: 0.01,
            ensemble: EnsembleConfig::default(),
            chart: ChartConfig::default(),
            timeout_ms: None,
        }
    }
}

impl AnalysisConfig {
    pub fn new(input_path: impl Into<PathBuf>) -> Self {
        Self {
            input_path: input_path.into(),
            ..Self::default()
        }
    }

    /// Load a JSON configuration file; missing fields take their defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            AnomalyError::invalid_config("config", path.display(), e.to_string())
        })?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn with_input_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.input_path = path.into();
        self
    }

    pub fn with_output_name(mut self, name: impl Into<String>) -> Self {
        self.output_name = Some(name.into());
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Set contamination ratio
    pub fn with_contamination(mut self, contamination: f64) -> Self {
        self.contamination = contamination;
        self
    }

    pub fn with_ensemble(mut self, ensemble: EnsembleConfig) -> Self {
        self.ensemble = ensemble;
        self
    }

    pub fn with_chart(mut self, chart: ChartConfig) -> Self {
        self.chart = chart;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Checked before any data is read
    pub fn validate(&self) -> Result<()> {
        if self.input_path.as_os_str().is_empty() {
            return Err(AnomalyError::invalid_config("input_path", "", "is required"));
        }
        validate_contamination(self.contamination)?;
        self.ensemble.validate()?;
        if let Some(name) = &self.output_name {
            if name.trim().is_empty() || name.contains(['/', '\\']) {
                return Err(AnomalyError::invalid_config(
                    "output_name",
                    name,
                    "must be a non-empty file name",
                ));
            }
        }
        if self.timeout_ms == Some(0) {
            return Err(AnomalyError::invalid_config("timeout_ms", 0, "must be positive"));
        }
        Ok(())
    }

    /// Output base name, falling back to the input file stem
    pub fn resolved_output_name(&self) -> String {
        self.output_name.clone().unwrap_or_else(|| {
            self.input_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "traffic".to_string())
        })
    }

    /// Input file name used in the chart title
    pub fn input_file_name(&self) -> String {
        self.input_path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn output_paths(&self) -> OutputPaths {
        OutputPaths::derive(&self.output_dir, &self.resolved_output_name(), self.contamination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AnalysisConfig::new("data/network_traffic.csv");
        assert_eq!(config.contamination, 0.01);
        assert_eq!(config.ensemble.n_trees, 100);
        assert_eq!(config.ensemble.sample_size, 256);
        assert_eq!(config.ensemble.seed, 42);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_output_name_from_stem() {
        let config = AnalysisConfig::new("data/network_traffic.csv");
        assert_eq!(config.resolved_output_name(), "network_traffic");
        assert_eq!(config.input_file_name(), "network_traffic.csv");

        let paths = config.output_paths();
        assert_eq!(paths.chart, PathBuf::from("output/network_traffic_graph_0.01.svg"));
        assert_eq!(paths.table, PathBuf::from("output/network_traffic_anomaly_0.01.csv"));

        let named = config.with_output_name("weekly");
        assert_eq!(named.resolved_output_name(), "weekly");
    }

    #[test]
    fn test_validation() {
        let base = AnalysisConfig::new("traffic.csv");

        assert!(base.clone().with_contamination(0.6).validate().is_err());
        assert!(base.clone().with_contamination(0.0).validate().is_err());
        assert!(base.clone().with_contamination(0.5).validate().is_ok());
        assert!(base
            .clone()
            .with_ensemble(EnsembleConfig::new().with_sample_size(0))
            .validate()
            .is_err());
        assert!(base.clone().with_output_name("../x").validate().is_err());
        assert!(AnalysisConfig::default().validate().is_err());
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{ "contamination": 0.05, "ensemble": { "n_trees": 25 }, "output_dir": "reports" }"#,
        )
        .unwrap();

        let config = AnalysisConfig::from_json_file(&path).unwrap();
        assert_eq!(config.contamination, 0.05);
        assert_eq!(config.ensemble.n_trees, 25);
        assert_eq!(config.ensemble.sample_size, 256);
        assert_eq!(config.output_dir, PathBuf::from("reports"));
    }

    #[test]
    fn test_timeout_keeps_sub_second_precision() {
        let config = AnalysisConfig::new("traffic.csv").with_timeout(Duration::from_millis(1500));
        assert_eq!(config.timeout(), Some(Duration::from_millis(1500)));

        let short = AnalysisConfig::new("traffic.csv").with_timeout(Duration::from_millis(250));
        assert_eq!(short.timeout(), Some(Duration::from_millis(250)));
        assert!(short.validate().is_ok());

        let zero = AnalysisConfig::new("traffic.csv").with_timeout(Duration::ZERO);
        assert!(zero.validate().is_err());
    }

    #[test]
    fn test_from_json_file_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let result = AnalysisConfig::from_json_file(&path);
        assert!(matches!(result, Err(AnomalyError::Serialization(_))));
    }
}
