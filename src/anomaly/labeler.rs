//! Binary labelling of scored records

use crate::anomaly::isolation_forest::ScoreTable;
use crate::anomaly::threshold::Threshold;
use crate::error::{AnomalyError, Result};
use crate::record::Record;
use serde::{Deserialize, Serialize};

/// A record annotated with its score and label
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabeledRecord {
    pub record: Record,
    pub anomaly_score: f64,
    pub is_anomaly: bool,
}

/// Final output of a detection run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyReport {
    /// Every input record, in input order
    pub records: Vec<LabeledRecord>,
    /// Flagged records only, in input order
    pub anomalies: Vec<LabeledRecord>,
    pub threshold: f64,
    pub contamination: f64,
}

impl AnomalyReport {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn anomaly_count(&self) -> usize {
        self.anomalies.len()
    }

    /// Fraction of records actually flagged
    pub fn realized_contamination(&self) -> f64 {
        if self.records.is_empty() {
            0.0
        } else {
            self.anomalies.len() as f64 / self.records.len() as f64
        }
    }

    /// Row positions of flagged records
    pub fn anomaly_rows(&self) -> Vec<usize> {
        self.anomalies.iter().map(|a| a.record.row).collect()
    }

    /// Per-row flags, aligned with `records`
    pub fn mask(&self) -> Vec<bool> {
        self.records.iter().map(|r| r.is_anomaly).collect()
    }
}

/// Applies a cutoff to a score table
#[derive(Debug, Clone, Copy, Default)]
pub struct AnomalyLabeler;

impl AnomalyLabeler {
    pub fn new() -> Self {
        Self
    }

    pub fn label(
        &self,
        records: &[Record],
        scores: &ScoreTable,
        threshold: &Threshold,
        contamination: f64,
    ) -> Result<AnomalyReport> {
        if records.len() != scores.len() {
            return Err(AnomalyError::ShapeMismatch {
                expected: records.len(),
                actual: scores.len(),
            });
        }

        let mut labeled = Vec::with_capacity(records.len());
        let mut anomalies = Vec::new();

        for (record, score) in records.iter().zip(scores.iter()) {
            let entry = LabeledRecord {
                record: *record,
                anomaly_score: score,
                is_anomaly: threshold.admits(score, anomalies.len()),
            };
            if entry.is_anomaly {
                anomalies.push(entry);
            }
            labeled.push(entry);
        }

        Ok(AnomalyReport {
            records: labeled,
            anomalies,
            threshold: threshold.cutoff,
            contamination,
        })
    }
}
