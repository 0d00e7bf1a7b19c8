// Run configuration for the trial engine
//
// Plain structured configuration: defaults, two presets, validation, and
// TOML loading. Command-line flags are applied on top by the binary.

use crate::error::{BenchError, Result};
use crate::stats::{chi_squared, MIN_N_BEFORE_VALID_VARIANCE};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Configuration for a benchmark run
///
/// # Example
/// ```
/// use regla::config::RunConfig;
///
/// let config = RunConfig::default();
/// assert_eq!(config.confidence, 0.95);
/// assert_eq!(config.min_trials().unwrap(), 81);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// User floor on the number of trials per statistical model
    pub trials: usize,

    /// Per-trial wall-clock limit in milliseconds
    ///
    /// Checked between repetitions only; a running call is never
    /// interrupted. `None` or 0 disables the limit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_limit_ms: Option<u64>,

    /// Confidence level for both the Student's t and chi-squared tests
    pub confidence: f64,

    /// Acceptance tolerance in standard deviations
    ///
    /// Together with `confidence` this sets the chi-squared minimum sample
    /// size (81 trials at the defaults).
    pub tolerance: f64,

    /// Hard cap on trials per model, as a multiple of the minimum
    pub max_trials_multiplier: usize,

    /// Skip invoking workloads and hooks; trials record zero elapsed time
    pub dry_run: bool,

    /// Repetitions run once before probing for a stable count
    pub warmup_reps: u64,

    /// Exclusive upper bound on probed repetition counts
    pub max_reps: u64,

    /// Wall-clock budget for a single repetition probe in milliseconds
    pub safe_probe_budget_ms: u64,

    /// Only benchmark methods whose name matches this regex
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method_filter: Option<String>,

    /// Label attached to output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_name: Option<String>,

    /// Candidate overrides: field name to candidate strings
    pub parameters: BTreeMap<String, Vec<String>>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            trials: 1,
            time_limit_ms: Some(30_000),
            confidence: 0.95,
            tolerance: 0.2,
            max_trials_multiplier: 30,
            dry_run: false,
            warmup_reps: 10_000,
            max_reps: 1_000_000_000,
            safe_probe_budget_ms: 10_000,
            method_filter: None,
            run_name: None,
            parameters: BTreeMap::new(),
        }
    }
}

impl RunConfig {
    /// Fast, low-confidence configuration for smoke runs
    pub fn quick() -> Self {
        Self {
            time_limit_ms: Some(5_000),
            confidence: 0.5,
            max_trials_multiplier: 10,
            warmup_reps: 1_000,
            max_reps: 10_000_000,
            safe_probe_budget_ms: 1_000,
            ..Self::default()
        }
    }

    /// High-confidence configuration for publishable numbers
    pub fn thorough() -> Self {
        Self {
            time_limit_ms: Some(120_000),
            confidence: 0.99,
            tolerance: 0.15,
            max_trials_multiplier: 50,
            warmup_reps: 100_000,
            ..Self::default()
        }
    }

    /// Render as TOML, the same format [`RunConfig::from_toml_file`] reads
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| BenchError::InvalidConfig(e.to_string()))
    }

    /// Load and validate a TOML file; missing keys take default values
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: RunConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Add a `name=v1,v2,...` candidate override
    pub fn add_define(&mut self, define: &str) -> Result<()> {
        let (name, values) = define.split_once('=').ok_or_else(|| {
            BenchError::InvalidConfig(format!("expected name=v1,v2,... but got '{}'", define))
        })?;
        let name = name.trim();
        if name.is_empty() {
            return Err(BenchError::InvalidConfig(format!(
                "missing parameter name in '{}'",
                define
            )));
        }
        let candidates: Vec<String> = values.split(',').map(str::to_string).collect();
        self.parameters.insert(name.to_string(), candidates);
        Ok(())
    }

    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit_ms
            .filter(|&ms| ms > 0)
            .map(Duration::from_millis)
    }

    pub fn safe_probe_budget(&self) -> Duration {
        Duration::from_millis(self.safe_probe_budget_ms)
    }

    /// Compiled method filter, if any
    pub fn method_regex(&self) -> Result<Option<Regex>> {
        Ok(self.method_filter.as_deref().map(Regex::new).transpose()?)
    }

    /// Trials needed before the model is tested
    ///
    /// The largest of the user floor, the chi-squared minimum sample size and
    /// the minimum needed for a variance.
    pub fn min_trials(&self) -> Result<usize> {
        let required = chi_squared::min_samples(self.tolerance, self.confidence)?;
        Ok(self
            .trials
            .max(required)
            .max(MIN_N_BEFORE_VALID_VARIANCE))
    }

    /// Trials after which an unvalidated model is given up
    pub fn max_trials(&self) -> Result<usize> {
        Ok(self.min_trials()?.saturating_mul(self.max_trials_multiplier))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !(self.confidence > 0.0 && self.confidence < 1.0) {
            return Err(BenchError::InvalidConfig(format!(
                "confidence must be in (0, 1), got {}",
                self.confidence
            )));
        }

        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(BenchError::InvalidConfig(format!(
                "tolerance must be positive, got {}",
                self.tolerance
            )));
        }

        if self.trials == 0 {
            return Err(BenchError::InvalidConfig(
                "trials must be at least 1".to_string(),
            ));
        }

        if self.max_trials_multiplier == 0 {
            return Err(BenchError::InvalidConfig(
                "max_trials_multiplier must be at least 1".to_string(),
            ));
        }

        if self.max_reps == 0 {
            return Err(BenchError::InvalidConfig(
                "max_reps must be at least 1".to_string(),
            ));
        }

        if let Some((field, _)) = self.parameters.iter().find(|(_, v)| v.is_empty()) {
            return Err(BenchError::EmptyParameterField {
                field: field.clone(),
            });
        }

        self.method_regex()?;
        Ok(())
    }
}
