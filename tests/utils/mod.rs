// Integration test utilities
//
// Units whose cost is charged to a SimulatedClock, so repetition selection,
// time limits and model validation behave the same on every machine.

#![allow(dead_code)]

use regla::benchmark::{BenchmarkUnit, UnitBuilder};
use regla::clock::SimulatedClock;
use regla::config::RunConfig;
use regla::engine::{Engine, RunSummary};
use regla::error::{Result, WorkloadError};
use regla::params::ParameterField;
use regla::sink::{InMemorySink, TrialMap};
use regla::value::{TypeTag, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Quick preset without warm-up, probing at most reps 1, 10 and 100
pub fn test_config() -> RunConfig {
    RunConfig {
        warmup_reps: 0,
        max_reps: 1_000,
        ..RunConfig::quick()
    }
}

/// Shared call counter
#[derive(Debug, Clone, Default)]
pub struct Calls(Arc<AtomicUsize>);

impl Calls {
    pub fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Shared event log
#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().unwrap().push(event.into());
    }

    pub fn count(&self, event: &str) -> usize {
        self.0.lock().unwrap().iter().filter(|e| *e == event).count()
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// Unit with one Int field `number` and a micro method `spin` costing
/// `cost_per_rep` simulated nanoseconds per repetition
pub fn spin_unit(
    name: &str,
    clock: Arc<SimulatedClock>,
    cost_per_rep: u64,
    numbers: &[&str],
    calls: Calls,
) -> Box<dyn BenchmarkUnit> {
    UnitBuilder::new(name, 0i64)
        .field(ParameterField::new(
            "number",
            TypeTag::Int,
            numbers.iter().copied(),
        ))
        .bind(|number, row| {
            *number = row.get("number").and_then(Value::as_i64).unwrap_or(0);
            Ok(())
        })
        .micro_benchmark("spin", move |number, reps| {
            calls.bump();
            clock.advance(cost_per_rep * reps);
            Ok(Value::Long(*number))
        })
        .boxed()
}

/// Same shape as [`spin_unit`], but the workload skips rows whose number
/// equals `skip`
pub fn skipping_unit(clock: Arc<SimulatedClock>, skip: i64) -> Box<dyn BenchmarkUnit> {
    UnitBuilder::new("skipping", 0i64)
        .field(ParameterField::new("number", TypeTag::Int, ["1", "2", "3"]))
        .bind(|number, row| {
            *number = row.get("number").and_then(Value::as_i64).unwrap_or(0);
            Ok(())
        })
        .micro_benchmark("spin", move |number, reps| {
            if *number == skip {
                return Err(WorkloadError::skip(format!("{} is not supported", skip)));
            }
            clock.advance(25 * reps);
            Ok(Value::Long(*number))
        })
        .boxed()
}

/// Run `units` into an in-memory sink on `clock`
pub fn run_in_memory(
    units: &mut [Box<dyn BenchmarkUnit>],
    config: RunConfig,
    clock: Arc<SimulatedClock>,
) -> Result<(RunSummary, TrialMap)> {
    let mut sink = InMemorySink::new();
    let set = sink.trial_set();
    let summary = Engine::new(config, &mut sink)?
        .with_clock(clock)
        .run(units)?;
    Ok((summary, set.snapshot()))
}
