//! Traffic observations

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One observation of the traffic series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Row position in the source file (0-based, header excluded)
    pub row: usize,
    pub timestamp: NaiveDateTime,
    pub value: f64,
}

impl Record {
    pub fn new(row: usize, timestamp: NaiveDateTime, value: f64) -> Self {
        Self { row, timestamp, value }
    }
}
