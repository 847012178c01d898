//! traffic-anomaly - Isolation Forest anomaly detection for network traffic
//!
//! This crate flags anomalous points in a univariate traffic time series and
//! produces a chart plus a machine-readable anomaly list.
//!
//! # Modules
//!
//! ## Model
//! - [`anomaly`] - Partition trees, the isolation ensemble, thresholding and labelling
//!
//! ## Data and output
//! - [`utils`] - CSV loading and timestamp parsing
//! - [`report`] - SVG chart and anomaly table
//!
//! ## Orchestration
//! - [`pipeline`] - End-to-end run with failure boundaries
//! - [`cli`] - Command-line interface
//!
//! # Example
//!
//! ```no_run
//! use traffic_anomaly::prelude::*;
//!
//! let config = AnalysisConfig::new("data/network_traffic.csv").with_contamination(0.01);
//! let outcome = TrafficAnalysisPipeline::new(config)?.run()?;
//! println!("{} anomalies found.", outcome.summary.anomalies);
//! # Ok::<(), traffic_anomaly::AnomalyError>(())
//! ```

// Core error handling
pub mod error;

pub mod record;

pub mod anomaly;

pub mod utils;
pub mod report;

pub mod pipeline;
pub mod cli;

pub use error::{AnomalyError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{AnomalyError, Result};

    pub use crate::record::Record;

    // Anomaly detection
    pub use crate::anomaly::{
        AnomalyLabeler, AnomalyReport, EnsembleConfig, IsolationEnsemble, LabeledRecord,
        RandomPartitionTree, ScoreTable, Threshold, ThresholdSelector,
    };

    // Data loading
    pub use crate::utils::{DataLoader, TrafficData};

    // Reports
    pub use crate::report::{ChartConfig, ChartRenderer, OutputPaths, ReportWriter};

    // Pipeline
    pub use crate::pipeline::{AnalysisConfig, AnalysisOutcome, AnalysisSummary, TrafficAnalysisPipeline};
}
