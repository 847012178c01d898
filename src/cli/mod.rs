//! Traffic anomaly CLI
//!
//! Command-line front end over [`TrafficAnalysisPipeline`].

use clap::Parser;
use colored::*;
use std::path::PathBuf;
use std::time::Duration;

use crate::anomaly::MAX_CONTAMINATION;
use crate::pipeline::{AnalysisConfig, AnalysisOutcome, TrafficAnalysisPipeline};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_run(msg: &str) {
    println!("  {} {}...", accent("›"), msg);
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn kv(key: &str, val: &str) {
    println!("  {:<22} {}", muted(key), val.white());
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "traffic-anomaly")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Detect anomalies in a network traffic file")]
#[command(long_about = None)]
pub struct Cli {
    /// Path to the input CSV file (columns: timestamp, value); required
    /// unless the config file names one
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Base name of the output files (default: input file stem)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Contamination rate, in (0, 0.5] (default: 0.01)
    #[arg(short = 'c', long = "contamination", alias = "c")]
    pub contamination: Option<f64>,

    /// Directory receiving the chart and the anomaly list (default: output)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// JSON configuration file; flags override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Number of trees in the ensemble (default: 100)
    #[arg(long)]
    pub trees: Option<usize>,

    /// Points sampled per tree (default: 256)
    #[arg(long)]
    pub sample_size: Option<usize>,

    /// Maximum tree depth (default: ceil(log2(sample size)))
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Random seed (default: 42)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Rolling mean window drawn on the chart, 0 to disable (default: 50)
    #[arg(long)]
    pub moving_average: Option<usize>,

    /// Build trees on a single thread
    #[arg(long)]
    pub sequential: bool,

    /// Abort the run after this many seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}

impl Cli {
    /// Merge the optional config file with the flags given on the command line
    pub fn to_config(&self) -> anyhow::Result<AnalysisConfig> {
        let mut config = match &self.config {
            Some(path) => AnalysisConfig::from_json_file(path)?,
            None => AnalysisConfig::default(),
        };

        if let Some(input) = &self.input {
            config = config.with_input_path(input);
        }
        if let Some(name) = &self.output {
            config = config.with_output_name(name);
        }
        if let Some(c) = self.contamination {
            config = config.with_contamination(c);
        }
        if let Some(dir) = &self.output_dir {
            config = config.with_output_dir(dir);
        }
        if let Some(trees) = self.trees {
            config.ensemble.n_trees = trees;
        }
        if let Some(size) = self.sample_size {
            config.ensemble.sample_size = size;
        }
        if let Some(depth) = self.max_depth {
            config.ensemble.max_depth = Some(depth);
        }
        if let Some(seed) = self.seed {
            config.ensemble.seed = seed;
        }
        if let Some(window) = self.moving_average {
            config.chart.moving_average_window = window;
        }
        if self.sequential {
            config.ensemble.parallel = false;
        }
        if let Some(secs) = self.timeout_secs {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        Ok(config)
    }
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_analyze(cli: &Cli) -> anyhow::Result<AnalysisOutcome> {
    section("Analyze");

    let config = cli.to_config()?;
    let pipeline = TrafficAnalysisPipeline::new(config)?;
    let config = pipeline.config();

    kv("Input", &config.input_path.display().to_string());
    kv("Contamination", &format!("{} (max {})", config.contamination, MAX_CONTAMINATION));
    kv("Trees", &config.ensemble.n_trees.to_string());
    kv("Seed", &config.ensemble.seed.to_string());
    println!();

    step_run(&format!("Loading data from {}", config.input_path.display()));
    let outcome = pipeline.run()?;

    step_ok(&format!("{} anomalies found.", outcome.summary.anomalies));
    step_ok(&format!("Graph saved to {}", outcome.paths.chart.display()));
    step_ok(&format!("Anomaly list saved to {}", outcome.paths.table.display()));

    print_summary(&outcome);
    Ok(outcome)
}

fn print_summary(outcome: &AnalysisOutcome) {
    let s = &outcome.summary;
    section("Summary");
    kv("Records", &s.records.to_string());
    kv("Anomalies", &format!("{} ({:.2}%)", s.anomalies, s.realized_contamination * 100.0));
    kv("Threshold", &format!("{:.4}", s.threshold));
    kv(
        "Score min/mean/max",
        &format!("{:.4} / {:.4} / {:.4}", s.min_score, s.mean_score, s.max_score),
    );
    kv("Time", &format!("{:.3}s", outcome.elapsed.as_secs_f64()));
    println!();
}

/// Print an error without a backtrace
pub fn report_error(err: &anyhow::Error) {
    eprintln!();
    eprintln!("  {} {}", "✗".red().bold(), err.to_string().red());
    for cause in err.chain().skip(1) {
        eprintln!("    {}", dim(&cause.to_string()));
    }
    eprintln!();
}
