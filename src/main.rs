//! traffic-anomaly - Main Entry Point
//!
//! Flags anomalous points in a network traffic series and writes a chart and
//! an anomaly list.

use clap::Parser;
use std::process::ExitCode;
use traffic_anomaly::cli::{cmd_analyze, report_error, Cli};

fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "traffic_anomaly=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cmd_analyze(&cli) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "run aborted");
            report_error(&err);
            ExitCode::FAILURE
        }
    }
}
