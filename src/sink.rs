//! Result sinks
//!
//! The engine calls [`ResultSink::process_trial`] exactly once per finished
//! trial (warning trials included) and [`ResultSink::close`] exactly once at
//! the end of the run.

use crate::benchmark::MethodKind;
use crate::error::Result;
use crate::stats::OnlineStatistics;
use crate::trial::{Trial, TrialId};
use crate::value::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::warn;

/// Consumer of completed trials
pub trait ResultSink {
    fn process_trial(&mut self, trial: &Trial) -> Result<()>;

    /// Flush buffered output
    fn close(&mut self) -> Result<()>;
}

impl<T: ResultSink + ?Sized> ResultSink for Box<T> {
    fn process_trial(&mut self, trial: &Trial) -> Result<()> {
        (**self).process_trial(trial)
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

/// Group of trials sharing one id, as summarized on the console
struct Group {
    id: TrialId,
    name: String,
    reps: Option<i64>,
    stats: OnlineStatistics,
}

impl Group {
    fn render(&self) -> String {
        match self.reps {
            Some(reps) => format!("{}\nreps: {}, {}", self.name, reps, self.stats),
            None => format!("{}\n{}", self.name, self.stats),
        }
    }
}

/// Prints one summary per statistical model
///
/// Summaries go to `out` when the trial id changes and on close. Warnings
/// print the pending summary, then the warning text to `err`.
pub struct ConsoleSink<W: Write, E: Write> {
    out: W,
    err: E,
    group: Option<Group>,
}

impl ConsoleSink<std::io::Stdout, std::io::Stderr> {
    pub fn stdio() -> Self {
        Self::new(std::io::stdout(), std::io::stderr())
    }
}

impl<W: Write, E: Write> ConsoleSink<W, E> {
    pub fn new(out: W, err: E) -> Self {
        Self {
            out,
            err,
            group: None,
        }
    }

    fn flush_group(&mut self) -> Result<()> {
        if let Some(group) = self.group.take() {
            writeln!(self.out, "{}", group.render())?;
            self.out.flush()?;
        }
        Ok(())
    }

    /// Consume the sink and return its writers
    pub fn into_inner(self) -> (W, E) {
        (self.out, self.err)
    }
}

impl<W: Write, E: Write> ResultSink for ConsoleSink<W, E> {
    fn process_trial(&mut self, trial: &Trial) -> Result<()> {
        if self.group.as_ref().map(|g| g.id) != Some(trial.id()) {
            self.flush_group()?;
            self.group = Some(Group {
                id: trial.id(),
                name: trial.name(),
                reps: None,
                stats: OnlineStatistics::new(),
            });
        }

        if let Some(text) = trial.warning() {
            self.flush_group()?;
            writeln!(self.err, "{}: {}", trial.name(), text)?;
            self.err.flush()?;
            return Ok(());
        }

        if let Some(group) = self.group.as_mut() {
            if group.reps.is_none() {
                group.reps = trial.reps();
            }
            if let Some(elapsed) = trial.elapsed_time_ns() {
                group.stats.update(elapsed);
            }
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.flush_group()
    }
}

/// Ordered map from model id to its trials
pub type TrialMap = BTreeMap<TrialId, Vec<Trial>>;

/// Thread-safe, shareable trial map
///
/// Clones share the same underlying map, so a caller can keep a handle while
/// the engine appends through an [`InMemorySink`].
#[derive(Debug, Clone, Default)]
pub struct TrialSet {
    inner: Arc<Mutex<TrialMap>>,
}

impl TrialSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, trial: Trial) {
        let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        map.entry(trial.id()).or_default().push(trial);
    }

    /// Copy of the current contents
    pub fn snapshot(&self) -> TrialMap {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of distinct model ids
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Stores every trial in a shared [`TrialSet`]
#[derive(Debug, Clone, Default)]
pub struct InMemorySink {
    set: TrialSet,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink appending to an existing set
    pub fn with_set(set: TrialSet) -> Self {
        Self { set }
    }

    pub fn trial_set(&self) -> TrialSet {
        self.set.clone()
    }
}

impl ResultSink for InMemorySink {
    fn process_trial(&mut self, trial: &Trial) -> Result<()> {
        if let Some(text) = trial.warning() {
            warn!(trial = %trial.name(), "{}", text);
        }
        self.set.insert(trial.clone());
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Sub-map queries over a [`TrialMap`]
///
/// Each entry is classified by its first trial, which carries the unit,
/// method and parameter row shared by the whole model.
pub mod filter {
    use super::*;

    fn retain_by<F>(map: &TrialMap, pred: F) -> TrialMap
    where
        F: Fn(&Trial) -> bool,
    {
        map.iter()
            .filter(|(_, trials)| trials.first().is_some_and(&pred))
            .map(|(id, trials)| (*id, trials.clone()))
            .collect()
    }

    pub fn by_ids(map: &TrialMap, ids: &BTreeSet<TrialId>) -> TrialMap {
        map.iter()
            .filter(|(id, _)| ids.contains(id))
            .map(|(id, trials)| (*id, trials.clone()))
            .collect()
    }

    pub fn by_unit(map: &TrialMap, units: &[&str]) -> TrialMap {
        retain_by(map, |t| units.contains(&t.unit()))
    }

    pub fn by_method(map: &TrialMap, methods: &[&str]) -> TrialMap {
        retain_by(map, |t| methods.contains(&t.method()))
    }

    /// Models whose parameter row declares any of `fields`
    pub fn by_field(map: &TrialMap, fields: &[&str]) -> TrialMap {
        retain_by(map, |t| t.row().values().any(|(name, _)| fields.contains(&name)))
    }

    /// Models whose `field` equals `value`
    pub fn by_param_value(map: &TrialMap, field: &str, value: &Value) -> TrialMap {
        retain_by(map, |t| t.row().get(field) == Some(value))
    }

    /// Models matching every `(field, value)` pair
    pub fn by_param_values(map: &TrialMap, pairs: &[(&str, Value)]) -> TrialMap {
        retain_by(map, |t| {
            pairs
                .iter()
                .all(|(field, value)| t.row().get(field) == Some(value))
        })
    }

    /// Models whose `field` renders as one of `values`
    pub fn by_param_string(map: &TrialMap, field: &str, values: &[&str]) -> TrialMap {
        retain_by(map, |t| {
            t.row()
                .get(field)
                .is_some_and(|v| values.contains(&v.to_string().as_str()))
        })
    }

    pub fn by_kind(map: &TrialMap, kind: MethodKind) -> TrialMap {
        retain_by(map, |t| t.kind() == kind)
    }
}
