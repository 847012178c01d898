//! Anomaly scoring model
//!
//! - [`RandomPartitionTree`]: one randomized partitioning tree
//! - [`IsolationEnsemble`]: the forest and its path-length score
//! - [`ThresholdSelector`]: contamination to score cutoff
//! - [`AnomalyLabeler`]: cutoff to per-record labels

mod isolation_forest;
mod labeler;
mod threshold;
mod tree;

pub use isolation_forest::{EnsembleConfig, IsolationEnsemble, ScoreTable};
pub use labeler::{AnomalyLabeler, AnomalyReport, LabeledRecord};
pub use threshold::{Threshold, ThresholdSelector, MAX_CONTAMINATION};
pub use tree::{average_path_length, default_max_depth, PartitionNode, RandomPartitionTree};

pub(crate) use threshold::validate_contamination;
