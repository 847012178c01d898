//! Utility functions and types

pub mod data_loader;

pub use data_loader::{parse_timestamp, DataLoader, TrafficData, TIMESTAMP_COLUMN, VALUE_COLUMN};
