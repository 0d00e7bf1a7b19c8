//! End-to-end tests of the trial engine on a simulated clock

mod utils;

use regla::benchmark::{BenchmarkUnit, UnitBuilder};
use regla::clock::SimulatedClock;
use regla::config::RunConfig;
use regla::demos;
use regla::engine::{Engine, MODEL_WARNING};
use regla::error::{BenchError, WorkloadError};
use regla::json_output::JsonSink;
use regla::params::ParameterField;
use regla::sink::{filter, ConsoleSink, InMemorySink};
use regla::trial::{self, Trial};
use regla::value::{TypeTag, Value};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;
use std::sync::Arc;
use utils::{run_in_memory, skipping_unit, spin_unit, test_config, Calls, EventLog};

fn all_trials(map: &regla::sink::TrialMap) -> Vec<&Trial> {
    map.values().flatten().collect()
}

#[test]
fn test_three_candidates_yield_three_sequences() {
    let clock = Arc::new(SimulatedClock::new());
    let mut units = vec![spin_unit(
        "spin",
        clock.clone(),
        25,
        &["1", "2", "3"],
        Calls::default(),
    )];

    let (summary, map) = run_in_memory(&mut units, test_config(), clock).unwrap();

    assert_eq!(map.len(), 3);
    assert_eq!(summary.completed, 3);
    assert_eq!(summary.exhausted, 0);
    assert!(summary.skipped_rows.is_empty());

    let numbers: BTreeSet<i64> = map
        .values()
        .map(|trials| trials[0].row().get("number").and_then(Value::as_i64).unwrap())
        .collect();
    assert_eq!(numbers, BTreeSet::from([1, 2, 3]));

    for trials in map.values() {
        assert_eq!(trials.len(), 14);
        for t in trials {
            assert_eq!(t.elapsed_time_ns(), Some(25.0));
            // constant cost settles at the first probe
            assert_eq!(t.reps(), Some(1));
            for name in [
                trial::VARIANCE_NS,
                trial::TRIAL_START_MS,
                trial::TRIAL_START_NS,
                trial::TRIAL_END_NS,
            ] {
                assert!(t.get(name).is_some(), "missing {name}");
            }
            let start = t.get(trial::TRIAL_START_NS).and_then(Value::as_i64).unwrap();
            let end = t.get(trial::TRIAL_END_NS).and_then(Value::as_i64).unwrap();
            assert!(end >= start);
            let number = t.row().get("number").cloned().unwrap();
            assert_eq!(t.get(trial::DUMMY), Some(&Value::Long(number.as_i64().unwrap())));
        }
    }
}

#[test]
fn test_one_id_per_unit_row_method() {
    let clock = Arc::new(SimulatedClock::new());
    let mut units = demos::suite("operations").unwrap();
    let config = RunConfig {
        dry_run: true,
        ..test_config()
    };

    let (summary, map) = run_in_memory(&mut units, config, clock).unwrap();

    // 2 units x 3 numbers x 5 methods
    assert_eq!(map.len(), 30);
    assert_eq!(summary.completed, 30);
    assert_eq!(summary.trials, 30 * 14);
    assert_eq!(filter::by_unit(&map, &["sum"]).len(), 15);
    assert_eq!(filter::by_method(&map, &["macro_recursive"]).len(), 6);
}

#[test]
fn test_dry_run_never_calls_workload() {
    let clock = Arc::new(SimulatedClock::new());
    let calls = Calls::default();
    let mut units = vec![spin_unit(
        "spin",
        clock.clone(),
        25,
        &["1", "2"],
        calls.clone(),
    )];
    let config = RunConfig {
        dry_run: true,
        ..test_config()
    };

    let (summary, map) = run_in_memory(&mut units, config, clock).unwrap();

    assert_eq!(calls.get(), 0);
    assert_eq!(summary.completed, 2);
    for t in all_trials(&map) {
        assert_eq!(t.elapsed_time_ns(), Some(0.0));
        assert_eq!(t.reps(), Some(1));
        assert_eq!(t.get(trial::DUMMY), Some(&Value::from(trial::NULL_DUMMY)));
    }
}

#[test]
fn test_skipped_row_does_not_abort_run() {
    let clock = Arc::new(SimulatedClock::new());
    let mut units = vec![skipping_unit(clock.clone(), 2)];

    let (summary, map) = run_in_memory(&mut units, test_config(), clock).unwrap();

    assert_eq!(summary.skipped_rows.len(), 1);
    assert_eq!(summary.skipped_rows[0].unit, "skipping");
    assert_eq!(summary.skipped_rows[0].row, "number:2");
    assert!(summary.skipped_rows[0].reason.contains("not supported"));
    assert_eq!(summary.completed, 2);
    assert_eq!(map.len(), 2);
    assert!(filter::by_param_value(&map, "number", &Value::Int(2)).is_empty());
}

#[test]
fn test_fatal_workload_aborts_and_closes_sink() {
    let mut units = vec![UnitBuilder::new("broken", ())
        .micro_benchmark("explode", |_, _| Err(WorkloadError::fatal("boom")))
        .boxed()];

    let mut sink = JsonSink::new(Vec::new(), None);
    let result = Engine::new(test_config(), &mut sink)
        .unwrap()
        .with_clock(Arc::new(SimulatedClock::new()))
        .run(&mut units);

    match result {
        Err(BenchError::WorkloadFailed {
            unit,
            method,
            reason,
        }) => {
            assert_eq!(unit, "broken");
            assert_eq!(method, "explode");
            assert_eq!(reason, "boom");
        }
        other => panic!("expected WorkloadFailed, got {other:?}"),
    }

    let doc: serde_json::Value = serde_json::from_slice(&sink.into_inner()).unwrap();
    assert_eq!(doc["summary"]["total_trials"], 0);
}

#[test]
fn test_time_limit_stops_unstable_trial() {
    let clock = Arc::new(SimulatedClock::new());
    let calls = Calls::default();
    let cost = clock.clone();
    let counter = calls.clone();
    // Fixed 2ms per call regardless of reps, above the 1ms trial limit
    let mut units = vec![UnitBuilder::new("slow", ())
        .micro_benchmark("sleep", move |_, _| {
            counter.bump();
            cost.advance(2_000_000);
            Ok(Value::Int(0))
        })
        .boxed()];
    let config = RunConfig {
        time_limit_ms: Some(1),
        max_reps: 100,
        ..test_config()
    };

    let (summary, map) = run_in_memory(&mut units, config, clock).unwrap();

    // probes at reps 1 and 10, then one sample per trial
    assert_eq!(summary.trials, 14);
    assert_eq!(calls.get(), 2 + 14);
    let trials = map.values().next().unwrap();
    assert!(trials.iter().all(|t| t.reps() == Some(10)));
    assert!(trials.iter().all(|t| t.elapsed_time_ns() == Some(200_000.0)));
    assert!(trials
        .iter()
        .all(|t| t.get(trial::VARIANCE_NS) == Some(&Value::Double(0.0))));
}

#[test]
fn test_hooks_wrap_each_timed_sample() {
    let clock = Arc::new(SimulatedClock::new());
    let log = EventLog::default();
    let (a, b, c, d) = (log.clone(), log.clone(), log.clone(), log.clone());
    let cost = clock.clone();
    let mut units = vec![UnitBuilder::new("hooked", ())
        .before_experiment("setup", move |_| {
            a.push("setup");
            Ok(())
        })
        .after_experiment("teardown", move |_| {
            b.push("teardown");
            Ok(())
        })
        .before_rep("before", move |_| {
            c.push("before");
            Ok(())
        })
        .after_rep("after", move |_| {
            d.push("after");
            Ok(())
        })
        .macro_benchmark("once", move |_| {
            cost.advance(1_000);
            Ok(Value::Null(TypeTag::Long))
        })
        .boxed()];

    let (summary, _) = run_in_memory(&mut units, test_config(), clock).unwrap();

    assert_eq!(summary.trials, 14);
    assert_eq!(log.count("setup"), 1);
    assert_eq!(log.count("teardown"), 1);
    assert_eq!(log.count("before"), 14);
    assert_eq!(log.count("after"), 14);
    let events = log.events();
    assert_eq!(events.first().map(String::as_str), Some("setup"));
    assert_eq!(events.last().map(String::as_str), Some("teardown"));
}

#[test]
fn test_exhausted_model_reports_warning() {
    let clock = Arc::new(SimulatedClock::new());
    let cost = clock.clone();
    let mut units = vec![UnitBuilder::new("noisy", 0u64)
        .macro_benchmark("flip", move |calls| {
            *calls += 1;
            cost.advance(if *calls % 2 == 0 { 1_000 } else { 2_000 });
            Ok(Value::Int(1))
        })
        .boxed()];

    let mut sink = ConsoleSink::new(Vec::new(), Vec::new());
    let summary = Engine::new(test_config(), &mut sink)
        .unwrap()
        .with_clock(clock)
        .run(&mut units)
        .unwrap();

    assert_eq!(summary.exhausted, 1);
    assert_eq!(summary.completed, 0);
    let (out, err) = sink.into_inner();
    let out = String::from_utf8(out).unwrap();
    let err = String::from_utf8(err).unwrap();
    assert!(out.starts_with("noisy.flip\nreps: 1, n: 140"));
    assert_eq!(err.trim(), format!("noisy.flip: {}", MODEL_WARNING));
}

#[test]
fn test_method_filter_selects_methods() {
    let clock = Arc::new(SimulatedClock::new());
    let mut units = demos::suite("sum").unwrap();
    let config = RunConfig {
        dry_run: true,
        method_filter: Some("^macro_".to_string()),
        ..test_config()
    };

    let (_, map) = run_in_memory(&mut units, config, clock).unwrap();

    assert_eq!(map.len(), 6);
    assert_eq!(
        filter::by_kind(&map, regla::benchmark::MethodKind::Macro).len(),
        6
    );
}

#[test]
fn test_overrides_replace_candidates() {
    let clock = Arc::new(SimulatedClock::new());
    let mut units = demos::suite("factorial").unwrap();
    let mut config = RunConfig {
        dry_run: true,
        method_filter: Some("^iterative$".to_string()),
        ..test_config()
    };
    config.add_define("number=7,8").unwrap();

    let (_, map) = run_in_memory(&mut units, config, clock).unwrap();

    assert_eq!(map.len(), 2);
    assert_eq!(filter::by_param_string(&map, "number", &["7", "8"]).len(), 2);
}

#[test]
fn test_configuration_errors_fail_before_measurement() {
    let clock = Arc::new(SimulatedClock::new());
    let calls = Calls::default();

    let mut config = test_config();
    config.add_define("missing=1").unwrap();
    let mut units = vec![spin_unit("a", clock.clone(), 25, &["1"], calls.clone())];
    assert!(matches!(
        run_in_memory(&mut units, config, clock.clone()),
        Err(BenchError::UnknownParameter { .. })
    ));

    let mut config = test_config();
    config.add_define("number=abc").unwrap();
    assert!(matches!(
        run_in_memory(&mut units, config, clock.clone()),
        Err(BenchError::InvalidParameterValue { .. })
    ));

    let mut mismatched: Vec<Box<dyn BenchmarkUnit>> = vec![
        spin_unit("a", clock.clone(), 25, &["1"], calls.clone()),
        UnitBuilder::new("b", ())
            .field(ParameterField::new("number", TypeTag::Int, ["1"]))
            .boxed(),
    ];
    assert!(matches!(
        run_in_memory(&mut mismatched, test_config(), clock),
        Err(BenchError::NonUniformBenchmarkUnits { .. })
    ));

    assert_eq!(calls.get(), 0);
}

#[test]
fn test_engine_rejects_empty_unit_list() {
    let mut sink = InMemorySink::new();
    let mut units: Vec<Box<dyn BenchmarkUnit>> = Vec::new();
    let result = Engine::new(test_config(), &mut sink).unwrap().run(&mut units);
    assert!(matches!(result, Err(BenchError::NoBenchmarkUnits)));
}

/// Standard normal deviate (Box-Muller)
fn gaussian(rng: &mut StdRng) -> f64 {
    let u1 = 1.0 - rng.gen::<f64>();
    let u2 = rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

#[test]
fn test_normal_noise_macro_validates_through_goodness_of_fit() {
    let clock = Arc::new(SimulatedClock::new());
    let cost = clock.clone();
    let mut units = vec![UnitBuilder::new("noise", StdRng::seed_from_u64(7))
        .macro_benchmark("gauss", move |rng| {
            let ns = 100_000.0 + 50.0 * gaussian(rng);
            cost.advance(ns.round() as u64);
            Ok(Value::Int(0))
        })
        .boxed()];

    let config = RunConfig {
        warmup_reps: 0,
        ..RunConfig::default()
    };
    let mut sink = InMemorySink::new();
    let set = sink.trial_set();
    let mut engine = Engine::new(config, &mut sink)
        .unwrap()
        .with_clock(clock);
    let (min, max) = (engine.min_trials(), engine.max_trials());
    let summary = engine.run(&mut units).unwrap();

    assert_eq!(min, 81);
    assert_eq!(summary.completed, 1);
    assert_eq!(summary.exhausted, 0);
    assert!(summary.trials >= min && summary.trials < max);

    let map = set.snapshot();
    let trials = map.values().next().unwrap();
    assert_eq!(trials.len(), summary.trials);
    assert!(trials.iter().all(|t| t.warning().is_none()));
    let means: Vec<f64> = trials.iter().filter_map(Trial::elapsed_time_ns).collect();
    let lowest = means.iter().copied().fold(f64::INFINITY, f64::min);
    let highest = means.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    // spread is real, so the model was accepted by the histogram test
    assert!(highest - lowest > 50.0);
    assert!(lowest > 99_000.0 && highest < 101_000.0);
}

#[test]
fn test_micro_trial_keeps_sampling_until_mean_is_stable() {
    // One probe call, then every trial sees 100, 100, 100, 400, 175. The
    // mean after three samples (100) lies outside the interval at n = 4;
    // the mean after four (175) lies inside it at n = 5.
    const PATTERN: [u64; 5] = [100, 100, 100, 400, 175];
    let clock = Arc::new(SimulatedClock::new());
    let cost = clock.clone();
    let calls = Calls::default();
    let counter = calls.clone();
    let mut units = vec![UnitBuilder::new("steady", 0usize)
        .micro_benchmark("settle", move |call, reps| {
            counter.bump();
            let ns = if *call == 0 {
                100
            } else {
                PATTERN[(*call - 1) % PATTERN.len()]
            };
            *call += 1;
            cost.advance(ns * reps);
            Ok(Value::Int(0))
        })
        .boxed()];
    let config = RunConfig {
        max_reps: 1,
        ..test_config()
    };

    let (summary, map) = run_in_memory(&mut units, config, clock).unwrap();

    assert_eq!(summary.completed, 1);
    assert_eq!(summary.trials, 14);
    // one probe, then five samples per trial
    assert_eq!(calls.get(), 1 + 5 * 14);
    for t in map.values().next().unwrap() {
        assert_eq!(t.reps(), Some(1));
        assert_eq!(t.elapsed_time_ns(), Some(175.0));
        let variance = t.get(trial::VARIANCE_NS).and_then(Value::as_f64).unwrap();
        assert!((variance - 16_875.0).abs() < 1e-6);
    }
}
