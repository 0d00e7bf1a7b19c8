//! Regla - statistically validated micro and macro benchmarks
//!
//! This library sweeps benchmark units over the cartesian product of their
//! parameter candidates, picks a stable repetition count per method, and
//! keeps collecting trials until the per-trial means pass a chi-squared
//! goodness-of-fit test against a fitted Normal distribution.
//!
//! ```
//! use regla::benchmark::UnitBuilder;
//! use regla::config::RunConfig;
//! use regla::engine::Engine;
//! use regla::sink::InMemorySink;
//! use regla::value::Value;
//!
//! let mut units = vec![UnitBuilder::new("noop", ())
//!     .micro_benchmark("spin", |_, reps| Ok(Value::Long(reps as i64)))
//!     .boxed()];
//! let config = RunConfig { dry_run: true, ..RunConfig::quick() };
//! let mut sink = InMemorySink::new();
//! let summary = Engine::new(config, &mut sink).unwrap().run(&mut units).unwrap();
//! assert_eq!(summary.completed, 1);
//! ```

pub mod benchmark;
pub mod cli;
pub mod clock;
pub mod config;
pub mod csv_output;
pub mod demos;
pub mod engine;
pub mod error;
pub mod json_output;
pub mod params;
pub mod reps;
pub mod sink;
pub mod stats;
pub mod trial;
pub mod value;
