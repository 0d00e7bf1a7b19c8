//! Trial execution engine
//!
//! For every unit × parameter row × method the engine:
//!
//! 1. picks a repetition count (micro methods probe adaptively, macro
//!    methods use one call per sample)
//! 2. runs timed samples until the running mean is stable under a Student's
//!    t test or the per-trial time limit passes (macro: one sample)
//! 3. records the trial and hands it to the sink
//! 4. once enough trials exist, fits a Normal to the trial means and runs a
//!    chi-squared goodness-of-fit test; acceptance ends the model
//! 5. after `max_trials` without acceptance, emits a warning trial instead
//!
//! Everything runs sequentially on the caller's thread.

use crate::benchmark::{check_uniform, BenchmarkUnit, HookKind, MethodKind, MethodSignature};
use crate::clock::{Clock, MonotonicClock};
use crate::config::RunConfig;
use crate::error::{BenchError, Result, StatsError, WorkloadError};
use crate::params::{ParameterRow, ParameterSpace};
use crate::reps::RepetitionSelector;
use crate::sink::ResultSink;
use crate::stats::{
    chi_squared, students_t, Histogram, Normal, OfflineStatistics, OnlineStatistics, Statistics,
    MIN_N_BEFORE_VALID_VARIANCE,
};
use crate::trial::{self, Trial, TrialId};
use crate::value::Value;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Text of the warning trial emitted for an unvalidated model
pub const MODEL_WARNING: &str = "failed to validate statistical model";

/// A parameter row skipped at a workload's request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRow {
    pub unit: String,
    pub row: String,
    pub reason: String,
}

/// What happened during [`Engine::run`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Models whose trial means passed the goodness-of-fit test
    pub completed: usize,
    /// Models that hit `max_trials` and got a warning trial
    pub exhausted: usize,
    /// Trials handed to the sink, warnings included
    pub trials: usize,
    pub skipped_rows: Vec<SkippedRow>,
}

enum Outcome {
    Validated,
    Exhausted,
}

/// Why a row stopped early
enum RowFailure {
    Workload { stage: String, error: WorkloadError },
    Bench(BenchError),
}

impl RowFailure {
    fn at(stage: &str) -> impl FnOnce(WorkloadError) -> RowFailure + '_ {
        move |error| RowFailure::Workload {
            stage: stage.to_string(),
            error,
        }
    }
}

impl From<BenchError> for RowFailure {
    fn from(e: BenchError) -> Self {
        RowFailure::Bench(e)
    }
}

impl From<StatsError> for RowFailure {
    fn from(e: StatsError) -> Self {
        RowFailure::Bench(e.into())
    }
}

/// Sequential trial engine
pub struct Engine<'a> {
    config: RunConfig,
    clock: Arc<dyn Clock>,
    sink: &'a mut dyn ResultSink,
    min_trials: usize,
    max_trials: usize,
    summary: RunSummary,
}

impl<'a> Engine<'a> {
    /// Engine on the real clock; fails on invalid configuration
    pub fn new(config: RunConfig, sink: &'a mut dyn ResultSink) -> Result<Self> {
        config.validate()?;
        let min_trials = config.min_trials()?;
        let max_trials = config.max_trials()?;
        Ok(Self {
            config,
            clock: Arc::new(MonotonicClock::new()),
            sink,
            min_trials,
            max_trials,
            summary: RunSummary::default(),
        })
    }

    /// Replace the time source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn min_trials(&self) -> usize {
        self.min_trials
    }

    pub fn max_trials(&self) -> usize {
        self.max_trials
    }

    /// Benchmark every unit, then close the sink
    ///
    /// Configuration problems (non-uniform units, bad parameter values,
    /// unknown overrides) fail before anything is measured. A fatal workload
    /// error aborts the run; the sink is still closed.
    pub fn run(&mut self, units: &mut [Box<dyn BenchmarkUnit>]) -> Result<RunSummary> {
        let outcome = self.run_units(units);
        let closed = self.sink.close();
        outcome?;
        closed?;
        Ok(std::mem::take(&mut self.summary))
    }

    fn run_units(&mut self, units: &mut [Box<dyn BenchmarkUnit>]) -> Result<()> {
        check_uniform(units)?;
        let filter = self.config.method_regex()?;
        let spaces = units
            .iter()
            .map(|u| ParameterSpace::with_overrides(u.fields().to_vec(), &self.config.parameters))
            .collect::<Result<Vec<_>>>()?;

        info!(
            units = units.len(),
            min_trials = self.min_trials,
            max_trials = self.max_trials,
            dry_run = self.config.dry_run,
            "starting benchmark run"
        );

        for (unit, space) in units.iter_mut().zip(&spaces) {
            let methods: Vec<MethodSignature> = unit
                .methods()
                .into_iter()
                .filter(|m| filter.as_ref().map_or(true, |re| re.is_match(&m.name)))
                .collect();
            if methods.is_empty() {
                debug!(unit = unit.name(), "no methods selected");
                continue;
            }

            for row in space.rows() {
                match self.run_row(unit.as_mut(), row, &methods) {
                    Ok(()) => {}
                    Err(RowFailure::Workload {
                        stage,
                        error: WorkloadError::Skip(reason),
                    }) => {
                        warn!(unit = unit.name(), row = %row, stage = %stage, "skipping row: {}", reason);
                        self.summary.skipped_rows.push(SkippedRow {
                            unit: unit.name().to_string(),
                            row: row.to_string(),
                            reason,
                        });
                    }
                    Err(RowFailure::Workload {
                        stage,
                        error: WorkloadError::Fatal(reason),
                    }) => {
                        return Err(BenchError::WorkloadFailed {
                            unit: unit.name().to_string(),
                            method: stage,
                            reason,
                        });
                    }
                    Err(RowFailure::Bench(e)) => return Err(e),
                }
            }
        }
        Ok(())
    }

    fn run_row(
        &mut self,
        unit: &mut dyn BenchmarkUnit,
        row: &ParameterRow,
        methods: &[MethodSignature],
    ) -> std::result::Result<(), RowFailure> {
        let dry_run = self.config.dry_run;
        if !dry_run {
            unit.bind(row).map_err(RowFailure::at("bind"))?;
            unit.run_hooks(HookKind::BeforeExperiment)
                .map_err(RowFailure::at("before-experiment"))?;
        }

        let mut result = Ok(());
        for method in methods {
            result = self.run_method(unit, row, method);
            if result.is_err() {
                break;
            }
        }

        if !dry_run {
            let teardown = unit
                .run_hooks(HookKind::AfterExperiment)
                .map_err(RowFailure::at("after-experiment"));
            if result.is_ok() {
                result = teardown;
            } else if let Err(RowFailure::Workload { error, .. }) = teardown {
                warn!(unit = unit.name(), row = %row, "after-experiment hook failed: {}", error);
            }
        }
        result
    }

    fn run_method(
        &mut self,
        unit: &mut dyn BenchmarkUnit,
        row: &ParameterRow,
        method: &MethodSignature,
    ) -> std::result::Result<(), RowFailure> {
        let reps = self.select_reps(unit, method)?;
        let id = TrialId::random();
        let mut means: Vec<f64> = Vec::new();
        let mut name = String::new();

        let outcome = loop {
            let (trial, mean) = self.run_trial(unit, row, method, id, reps)?;
            name = trial.name();
            debug!(trial = %name, n = means.len() + 1, mean_ns = mean, "trial recorded");
            self.emit(&trial)?;
            means.push(mean);

            if means.len() >= self.min_trials && self.model_fits(&means) {
                break Outcome::Validated;
            }
            if means.len() >= self.max_trials {
                break Outcome::Exhausted;
            }
        };

        match outcome {
            Outcome::Validated => {
                info!(trial = %name, trials = means.len(), reps, "statistical model validated");
                self.summary.completed += 1;
            }
            Outcome::Exhausted => {
                warn!(trial = %name, trials = means.len(), "{}", MODEL_WARNING);
                let mut warning = Trial::new(id, unit.name(), method, row);
                warning.push(trial::WARNING, MODEL_WARNING);
                self.emit(&warning)?;
                self.summary.exhausted += 1;
            }
        }
        Ok(())
    }

    fn select_reps(
        &self,
        unit: &mut dyn BenchmarkUnit,
        method: &MethodSignature,
    ) -> std::result::Result<u64, RowFailure> {
        if method.kind == MethodKind::Macro || self.config.dry_run {
            return Ok(1);
        }
        let budget_ns = u64::try_from(self.config.safe_probe_budget().as_nanos()).unwrap_or(u64::MAX);
        let selector = RepetitionSelector::new(
            self.clock.as_ref(),
            self.config.warmup_reps,
            self.config.max_reps,
            budget_ns,
        );
        let choice = selector
            .choose(|reps| unit.invoke(&method.name, reps).map(|_| ()))
            .map_err(RowFailure::at(&method.name))?;
        debug!(
            method = %method.name,
            reps = choice.reps,
            reason = ?choice.reason,
            probes = choice.probes.len(),
            "repetition count selected"
        );
        Ok(choice.reps)
    }

    /// One trial: timed samples until the mean is stable
    fn run_trial(
        &mut self,
        unit: &mut dyn BenchmarkUnit,
        row: &ParameterRow,
        method: &MethodSignature,
        id: TrialId,
        reps: u64,
    ) -> std::result::Result<(Trial, f64), RowFailure> {
        let dry_run = self.config.dry_run;
        let start_ms = self.clock.wall_ms();
        let start_ns = self.clock.now_ns();
        let deadline = self.config.time_limit().map(|limit| {
            start_ns.saturating_add(u64::try_from(limit.as_nanos()).unwrap_or(u64::MAX))
        });

        let mut stats = OnlineStatistics::new();
        let mut dummy: Option<Value> = None;

        loop {
            let sample = if dry_run {
                0.0
            } else {
                let stage = method.name.as_str();
                unit.run_hooks(HookKind::BeforeRep)
                    .map_err(RowFailure::at("before-rep"))?;
                let t0 = self.clock.now_ns();
                let value = unit.invoke(stage, reps).map_err(RowFailure::at(stage))?;
                let t1 = self.clock.now_ns();
                unit.run_hooks(HookKind::AfterRep)
                    .map_err(RowFailure::at("after-rep"))?;
                dummy = Some(value);
                t1.saturating_sub(t0) as f64 / reps as f64
            };

            let previous_mean = stats.mean();
            stats.update(sample);

            if dry_run || method.kind == MethodKind::Macro {
                break;
            }
            if stats.size() >= 2 * MIN_N_BEFORE_VALID_VARIANCE
                && students_t::test_hypothesis(
                    stats.size(),
                    self.config.confidence,
                    stats.mean(),
                    stats.standard_deviation(),
                    previous_mean,
                )?
            {
                break;
            }
            if let Some(deadline) = deadline {
                if self.clock.now_ns() >= deadline {
                    warn!(
                        method = %method.name,
                        samples = stats.size(),
                        "trial time limit exceeded before the mean stabilized"
                    );
                    break;
                }
            }
        }

        let end_ns = self.clock.now_ns();
        let mean = stats.mean();

        let mut trial = Trial::new(id, unit.name(), method, row);
        trial.push(trial::ELAPSED_TIME_NS, mean);
        trial.push(trial::VARIANCE_NS, stats.variance());
        trial.push(trial::REPS, i64::try_from(reps).unwrap_or(i64::MAX));
        trial.push(trial::TRIAL_START_MS, to_i64(start_ms));
        trial.push(trial::TRIAL_START_NS, to_i64(start_ns));
        trial.push(trial::TRIAL_END_NS, to_i64(end_ns));
        match dummy {
            Some(value) if !value.is_null() => trial.push(trial::DUMMY, value),
            _ => trial.push(trial::DUMMY, trial::NULL_DUMMY),
        }
        Ok((trial, mean))
    }

    /// Goodness-of-fit of the trial means against a fitted Normal
    fn model_fits(&self, means: &[f64]) -> bool {
        let stats = match OfflineStatistics::new(means.to_vec()) {
            Ok(stats) => stats,
            Err(_) => return false,
        };
        if stats.standard_deviation() == 0.0 {
            return true;
        }
        let observed = Histogram::new(&stats);
        let expected = Normal::fit(&stats).histogram(&observed);
        match chi_squared::test_histograms(self.config.confidence, &expected, &observed) {
            Ok(accepted) => accepted,
            Err(e) => {
                debug!(bins = observed.len(), "goodness-of-fit test not applicable: {}", e);
                false
            }
        }
    }

    fn emit(&mut self, trial: &Trial) -> Result<()> {
        self.sink.process_trial(trial)?;
        self.summary.trials += 1;
        Ok(())
    }
}

fn to_i64(v: u64) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}
