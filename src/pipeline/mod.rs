//! End-to-end traffic analysis
//!
//! load → fit → score → threshold → label → report. Every stage either
//! succeeds or aborts the run; files are written only after the last
//! in-memory stage succeeded.

mod config;

pub use config::AnalysisConfig;

use crate::anomaly::{AnomalyLabeler, AnomalyReport, IsolationEnsemble, ThresholdSelector};
use crate::error::{AnomalyError, Result};
use crate::report::{ChartRenderer, OutputPaths, ReportArtifacts, ReportWriter};
use crate::utils::{DataLoader, TrafficData};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::info;

/// Summary of a finished run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub records: usize,
    pub anomalies: usize,
    pub contamination: f64,
    pub realized_contamination: f64,
    pub threshold: f64,
    pub min_score: f64,
    pub mean_score: f64,
    pub max_score: f64,
}

impl AnalysisSummary {
    pub fn from_report(report: &AnomalyReport) -> Self {
        let scores = || report.records.iter().map(|r| r.anomaly_score);
        let n = report.len();
        let mean_score = if n == 0 { 0.0 } else { scores().sum::<f64>() / n as f64 };
        Self {
            records: n,
            anomalies: report.anomaly_count(),
            contamination: report.contamination,
            realized_contamination: report.realized_contamination(),
            threshold: report.threshold,
            min_score: scores().fold(f64::INFINITY, f64::min),
            mean_score,
            max_score: scores().fold(f64::NEG_INFINITY, f64::max),
        }
    }
}

/// Result of a successful run
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub report: AnomalyReport,
    pub summary: AnalysisSummary,
    pub paths: OutputPaths,
    pub elapsed: Duration,
}

/// Run deadline, checked between stages
#[derive(Debug, Clone, Copy)]
struct Deadline {
    start: Instant,
    limit: Option<Duration>,
}

impl Deadline {
    fn new(limit: Option<Duration>) -> Self {
        Self {
            start: Instant::now(),
            limit,
        }
    }

    fn check(&self, stage: &str) -> Result<()> {
        match self.limit {
            Some(limit) if self.start.elapsed() > limit => {
                info!(stage, "run exceeded its timeout");
                Err(AnomalyError::Timeout(limit))
            }
            _ => Ok(()),
        }
    }
}

/// Orchestrates one detection run
#[derive(Debug, Clone)]
pub struct TrafficAnalysisPipeline {
    config: AnalysisConfig,
    loader: DataLoader,
    chart: ChartRenderer,
    writer: ReportWriter,
}

impl TrafficAnalysisPipeline {
    /// Validates the configuration up-front; nothing is read on failure
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        let chart = ChartRenderer::new(config.chart.clone());
        Ok(Self {
            config,
            loader: DataLoader::new(),
            chart,
            writer: ReportWriter::new(),
        })
    }

    pub fn with_loader(mut self, loader: DataLoader) -> Self {
        self.loader = loader;
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Fit the ensemble on `data`, score every record and label it
    pub fn analyze(&self, data: &TrafficData) -> Result<AnomalyReport> {
        self.analyze_until(data, &Deadline::new(self.config.timeout()))
    }

    fn analyze_until(&self, data: &TrafficData, deadline: &Deadline) -> Result<AnomalyReport> {
        let selector = ThresholdSelector::new(self.config.contamination)?;
        if data.is_empty() {
            return Err(AnomalyError::InsufficientData("no records to analyze".to_string()));
        }

        let values = data.values();
        let ensemble = IsolationEnsemble::fit(&self.config.ensemble, values.view())?;
        info!(
            trees = ensemble.tree_count(),
            sample_size = ensemble.sample_size(),
            max_depth = ensemble.max_depth(),
            "ensemble fitted"
        );
        deadline.check("fit")?;

        let scores = ensemble.score_samples(values.view());
        drop(ensemble);
        deadline.check("score")?;

        let threshold = selector.select(scores.iter())?;
        let report = AnomalyLabeler::new().label(
            data.records(),
            &scores,
            &threshold,
            selector.contamination(),
        )?;
        info!(
            threshold = threshold.cutoff,
            anomalies = report.anomaly_count(),
            "records labeled"
        );
        Ok(report)
    }

    /// Run the whole pipeline and write the chart and anomaly table
    pub fn run(&self) -> Result<AnalysisOutcome> {
        let deadline = Deadline::new(self.config.timeout());
        let input = &self.config.input_path;

        info!(path = %input.display(), "loading traffic data");
        let data = self.loader.load_traffic(input)?;
        info!(records = data.len(), "traffic data loaded");
        deadline.check("load")?;

        let report = self.analyze_until(&data, &deadline)?;

        let title = format!("Anomaly Detection Result - {}", self.config.input_file_name());
        let artifacts = ReportArtifacts::render(&data, &report, &self.chart, &title)?;
        deadline.check("render")?;

        let paths = self.config.output_paths();
        self.writer.write(&artifacts, &paths)?;
        info!(
            chart = %paths.chart.display(),
            table = %paths.table.display(),
            anomalies = artifacts.anomaly_rows,
            "report written"
        );

        let summary = AnalysisSummary::from_report(&report);
        Ok(AnalysisOutcome {
            report,
            summary,
            paths,
            elapsed: deadline.start.elapsed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anomaly::EnsembleConfig;
    use polars::prelude::*;

    fn data(values: &[f64]) -> TrafficData {
        let timestamps: Vec<String> = (0..values.len())
            .map(|i| format!("2024-01-01 00:{:02}:{:02}", i / 60 % 60, i % 60))
            .collect();
        let frame = df!("timestamp" => timestamps, "value" => values).unwrap();
        TrafficData::from_frame(frame).unwrap()
    }

    #[test]
    fn test_single_outlier_flagged() {
        let pipeline = TrafficAnalysisPipeline::new(
            AnalysisConfig::new("traffic.csv").with_contamination(0.2),
        )
        .unwrap();
        let report = pipeline.analyze(&data(&[1.0, 1.0, 1.0, 1.0, 1.0, 100.0])).unwrap();

        assert_eq!(report.anomaly_rows(), vec![5]);
        let outlier = report.records[5].anomaly_score;
        assert!(report.records[..5].iter().all(|r| r.anomaly_score < outlier));
    }

    #[test]
    fn test_invalid_contamination_rejected_up_front() {
        let result = TrafficAnalysisPipeline::new(
            AnalysisConfig::new("traffic.csv").with_contamination(0.6),
        );
        assert!(matches!(result, Err(AnomalyError::InvalidConfiguration { .. })));
    }

    #[test]
    fn test_summary() {
        let pipeline = TrafficAnalysisPipeline::new(
            AnalysisConfig::new("traffic.csv")
                .with_contamination(0.1)
                .with_ensemble(EnsembleConfig::new().with_n_trees(20)),
        )
        .unwrap();
        let mut values: Vec<f64> = (0..50).map(|i| 100.0 + (i % 5) as f64).collect();
        values.push(5_000.0);
        let report = pipeline.analyze(&data(&values)).unwrap();
        let summary = AnalysisSummary::from_report(&report);

        assert_eq!(summary.records, 51);
        assert!(summary.anomalies >= 1);
        assert!(summary.min_score <= summary.mean_score);
        assert!(summary.mean_score <= summary.max_score);
        assert_eq!(summary.max_score, report.records[50].anomaly_score);
    }

    #[test]
    fn test_deadline_expires() {
        let deadline = Deadline::new(Some(Duration::ZERO));
        std::thread::sleep(Duration::from_millis(2));
        assert!(matches!(deadline.check("fit"), Err(AnomalyError::Timeout(_))));

        assert!(Deadline::new(None).check("fit").is_ok());
    }
}
