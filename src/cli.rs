//! CLI argument parsing for regla

use crate::config::RunConfig;
use crate::error::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for trial results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One summary per statistical model (default)
    Text,
    /// JSON document for machine parsing
    Json,
    /// CSV table, one row per measurement
    Csv,
}

/// Base configuration when no config file is given
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Preset {
    Quick,
    Default,
    Thorough,
}

impl Preset {
    pub fn config(self) -> RunConfig {
        match self {
            Preset::Quick => RunConfig::quick(),
            Preset::Default => RunConfig::default(),
            Preset::Thorough => RunConfig::thorough(),
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "regla")]
#[command(version)]
#[command(about = "Statistically validated micro and macro benchmarks", long_about = None)]
pub struct Cli {
    /// Benchmark suites to run (see --list)
    #[arg(value_name = "SUITE")]
    pub suites: Vec<String>,

    /// Validate wiring without invoking workloads or hooks
    #[arg(short = 'n', long = "dry-run")]
    pub dry_run: bool,

    /// Minimum number of trials per statistical model
    #[arg(short = 't', long = "trials", value_name = "N")]
    pub trials: Option<usize>,

    /// Per-trial time limit in milliseconds (0 disables)
    #[arg(short = 'l', long = "time-limit", value_name = "MS")]
    pub time_limit: Option<u64>,

    /// Only run benchmark methods whose name matches this regex
    #[arg(short = 'b', long = "benchmark", value_name = "REGEX")]
    pub benchmark: Option<String>,

    /// Override a parameter's candidates (e.g., -D number=1,2,3)
    #[arg(short = 'D', value_name = "NAME=V1,V2")]
    pub defines: Vec<String>,

    /// Load configuration from a TOML file
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Base configuration when no file is given
    #[arg(long = "preset", value_enum, default_value = "default")]
    pub preset: Preset,

    /// Confidence level for the statistical tests
    #[arg(long = "confidence", value_name = "P")]
    pub confidence: Option<f64>,

    /// Acceptance tolerance in standard deviations
    #[arg(long = "tolerance", value_name = "SIGMA")]
    pub tolerance: Option<f64>,

    /// Label attached to the output
    #[arg(short = 'r', long = "run-name", value_name = "NAME")]
    pub run_name: Option<String>,

    /// Print the effective configuration as TOML and exit
    #[arg(short = 'p', long = "print-config")]
    pub print_config: bool,

    /// Output format
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Write results to FILE instead of stdout
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// List available suites and exit
    #[arg(long = "list")]
    pub list: bool,

    /// Enable debug tracing output to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}

impl Cli {
    /// Effective configuration: file or preset, then flags on top
    pub fn run_config(&self) -> Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::from_toml_file(path)?,
            None => self.preset.config(),
        };

        if self.dry_run {
            config.dry_run = true;
        }
        if let Some(trials) = self.trials {
            config.trials = trials;
        }
        if let Some(ms) = self.time_limit {
            config.time_limit_ms = Some(ms);
        }
        if let Some(regex) = &self.benchmark {
            config.method_filter = Some(regex.clone());
        }
        if let Some(confidence) = self.confidence {
            config.confidence = confidence;
        }
        if let Some(tolerance) = self.tolerance {
            config.tolerance = tolerance;
        }
        if let Some(name) = &self.run_name {
            config.run_name = Some(name.clone());
        }
        for define in &self.defines {
            config.add_define(define)?;
        }

        config.validate()?;
        Ok(config)
    }
}
