//! Benchmark unit registration
//!
//! A [`BenchmarkUnit`] exposes its parameter fields, its micro and macro
//! methods, and its lifecycle hooks through typed accessors. Most units are
//! built with [`UnitBuilder`], which wraps a user state `S` and a set of
//! closures over it:
//!
//! ```
//! use regla::benchmark::{BenchmarkUnit, UnitBuilder};
//! use regla::params::ParameterField;
//! use regla::value::{TypeTag, Value};
//!
//! let unit = UnitBuilder::new("sum", 0i64)
//!     .field(ParameterField::new("number", TypeTag::Int, ["10", "100"]))
//!     .bind(|state, row| {
//!         *state = row.get("number").and_then(Value::as_i64).unwrap_or(0);
//!         Ok(())
//!     })
//!     .micro_benchmark("iterative", |state, reps| {
//!         let mut total = 0i64;
//!         for _ in 0..reps {
//!             total = (1..=*state).sum();
//!         }
//!         Ok(Value::Long(total))
//!     })
//!     .build();
//!
//! assert_eq!(unit.name(), "sum");
//! assert_eq!(unit.methods().len(), 1);
//! ```

use crate::error::{BenchError, Result, WorkloadError};
use crate::params::{ParameterField, ParameterRow};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a benchmark method is timed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MethodKind {
    /// Takes a repetition count; timed over many calls per sample
    Micro,
    /// One call is one full iteration
    Macro,
}

impl fmt::Display for MethodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodKind::Micro => f.write_str("micro"),
            MethodKind::Macro => f.write_str("macro"),
        }
    }
}

/// Lifecycle points at which hooks run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HookKind {
    BeforeExperiment,
    AfterExperiment,
    BeforeRep,
    AfterRep,
}

impl HookKind {
    pub const ALL: [HookKind; 4] = [
        HookKind::BeforeExperiment,
        HookKind::AfterExperiment,
        HookKind::BeforeRep,
        HookKind::AfterRep,
    ];
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HookKind::BeforeExperiment => "before-experiment",
            HookKind::AfterExperiment => "after-experiment",
            HookKind::BeforeRep => "before-rep",
            HookKind::AfterRep => "after-rep",
        };
        f.write_str(name)
    }
}

/// Name and kind of a benchmark method
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MethodSignature {
    pub name: String,
    pub kind: MethodKind,
}

/// A set of benchmark methods sharing parameters and hooks
pub trait BenchmarkUnit {
    fn name(&self) -> &str;

    /// Declared parameter fields, in sweep order
    fn fields(&self) -> &[ParameterField];

    fn methods(&self) -> Vec<MethodSignature>;

    /// Names of the hooks registered for `kind`, in run order
    fn hook_names(&self, kind: HookKind) -> Vec<String>;

    /// Install a parameter row before an experiment
    fn bind(&mut self, row: &ParameterRow) -> std::result::Result<(), WorkloadError>;

    /// Run every hook registered for `kind`
    fn run_hooks(&mut self, kind: HookKind) -> std::result::Result<(), WorkloadError>;

    /// Call a method; macro methods ignore `reps`
    fn invoke(&mut self, method: &str, reps: u64) -> std::result::Result<Value, WorkloadError>;
}

type Binder<S> = Box<dyn FnMut(&mut S, &ParameterRow) -> std::result::Result<(), WorkloadError>>;
type HookFn<S> = Box<dyn FnMut(&mut S) -> std::result::Result<(), WorkloadError>>;
type MicroFn<S> = Box<dyn FnMut(&mut S, u64) -> std::result::Result<Value, WorkloadError>>;
type MacroFn<S> = Box<dyn FnMut(&mut S) -> std::result::Result<Value, WorkloadError>>;

enum Body<S> {
    Micro(MicroFn<S>),
    Macro(MacroFn<S>),
}

struct Method<S> {
    name: String,
    body: Body<S>,
}

struct Hook<S> {
    kind: HookKind,
    name: String,
    body: HookFn<S>,
}

/// Closure-backed [`BenchmarkUnit`] over a user state `S`
pub struct Unit<S> {
    name: String,
    state: S,
    fields: Vec<ParameterField>,
    binder: Option<Binder<S>>,
    methods: Vec<Method<S>>,
    hooks: Vec<Hook<S>>,
}

impl<S> Unit<S> {
    pub fn state(&self) -> &S {
        &self.state
    }
}

impl<S> BenchmarkUnit for Unit<S> {
    fn name(&self) -> &str {
        &self.name
    }

    fn fields(&self) -> &[ParameterField] {
        &self.fields
    }

    fn methods(&self) -> Vec<MethodSignature> {
        self.methods
            .iter()
            .map(|m| MethodSignature {
                name: m.name.clone(),
                kind: match m.body {
                    Body::Micro(_) => MethodKind::Micro,
                    Body::Macro(_) => MethodKind::Macro,
                },
            })
            .collect()
    }

    fn hook_names(&self, kind: HookKind) -> Vec<String> {
        self.hooks
            .iter()
            .filter(|h| h.kind == kind)
            .map(|h| h.name.clone())
            .collect()
    }

    fn bind(&mut self, row: &ParameterRow) -> std::result::Result<(), WorkloadError> {
        match self.binder.as_mut() {
            Some(binder) => binder(&mut self.state, row),
            None => Ok(()),
        }
    }

    fn run_hooks(&mut self, kind: HookKind) -> std::result::Result<(), WorkloadError> {
        for hook in self.hooks.iter_mut().filter(|h| h.kind == kind) {
            (hook.body)(&mut self.state)?;
        }
        Ok(())
    }

    fn invoke(&mut self, method: &str, reps: u64) -> std::result::Result<Value, WorkloadError> {
        let target = self
            .methods
            .iter_mut()
            .find(|m| m.name == method)
            .ok_or_else(|| {
                WorkloadError::fatal(format!("unit '{}' has no method '{}'", self.name, method))
            })?;
        match &mut target.body {
            Body::Micro(f) => f(&mut self.state, reps),
            Body::Macro(f) => f(&mut self.state),
        }
    }
}

/// Builder for [`Unit`]
pub struct UnitBuilder<S> {
    unit: Unit<S>,
}

impl<S: 'static> UnitBuilder<S> {
    pub fn new(name: impl Into<String>, state: S) -> Self {
        Self {
            unit: Unit {
                name: name.into(),
                state,
                fields: Vec::new(),
                binder: None,
                methods: Vec::new(),
                hooks: Vec::new(),
            },
        }
    }

    pub fn field(mut self, field: ParameterField) -> Self {
        self.unit.fields.push(field);
        self
    }

    /// Called with each parameter row before its experiment starts
    pub fn bind<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut S, &ParameterRow) -> std::result::Result<(), WorkloadError> + 'static,
    {
        self.unit.binder = Some(Box::new(f));
        self
    }

    pub fn micro_benchmark<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: FnMut(&mut S, u64) -> std::result::Result<Value, WorkloadError> + 'static,
    {
        self.unit.methods.push(Method {
            name: name.into(),
            body: Body::Micro(Box::new(f)),
        });
        self
    }

    pub fn macro_benchmark<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: FnMut(&mut S) -> std::result::Result<Value, WorkloadError> + 'static,
    {
        self.unit.methods.push(Method {
            name: name.into(),
            body: Body::Macro(Box::new(f)),
        });
        self
    }

    pub fn hook<F>(mut self, kind: HookKind, name: impl Into<String>, f: F) -> Self
    where
        F: FnMut(&mut S) -> std::result::Result<(), WorkloadError> + 'static,
    {
        self.unit.hooks.push(Hook {
            kind,
            name: name.into(),
            body: Box::new(f),
        });
        self
    }

    pub fn before_experiment<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: FnMut(&mut S) -> std::result::Result<(), WorkloadError> + 'static,
    {
        self.hook(HookKind::BeforeExperiment, name, f)
    }

    pub fn after_experiment<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: FnMut(&mut S) -> std::result::Result<(), WorkloadError> + 'static,
    {
        self.hook(HookKind::AfterExperiment, name, f)
    }

    pub fn before_rep<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: FnMut(&mut S) -> std::result::Result<(), WorkloadError> + 'static,
    {
        self.hook(HookKind::BeforeRep, name, f)
    }

    pub fn after_rep<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: FnMut(&mut S) -> std::result::Result<(), WorkloadError> + 'static,
    {
        self.hook(HookKind::AfterRep, name, f)
    }

    pub fn build(self) -> Unit<S> {
        self.unit
    }

    /// Build and box for use with the engine
    pub fn boxed(self) -> Box<dyn BenchmarkUnit> {
        Box::new(self.unit)
    }
}

/// Check that all units declare the same fields, methods and hooks
///
/// Runs before any measurement. Fields must match name, type and candidate
/// count in order; methods and hooks must match as sets.
pub fn check_uniform(units: &[Box<dyn BenchmarkUnit>]) -> Result<()> {
    let (first, rest) = units.split_first().ok_or(BenchError::NoBenchmarkUnits)?;

    let shape = |u: &dyn BenchmarkUnit| {
        let fields: Vec<_> = u
            .fields()
            .iter()
            .map(|f| (f.name.clone(), f.tag, f.candidates.len()))
            .collect();
        let mut methods = u.methods();
        methods.sort();
        let hooks: Vec<Vec<String>> = HookKind::ALL
            .iter()
            .map(|&kind| {
                let mut names = u.hook_names(kind);
                names.sort();
                names
            })
            .collect();
        (fields, methods, hooks)
    };

    let (fields, methods, hooks) = shape(first.as_ref());
    for unit in rest {
        let (other_fields, other_methods, other_hooks) = shape(unit.as_ref());
        let reason = if other_fields != fields {
            Some("declares different parameter fields")
        } else if other_methods != methods {
            Some("declares different benchmark methods")
        } else if other_hooks != hooks {
            Some("declares different hooks")
        } else {
            None
        };
        if let Some(reason) = reason {
            return Err(BenchError::NonUniformBenchmarkUnits {
                unit: unit.name().to_string(),
                reason: format!("{} than '{}'", reason, first.name()),
            });
        }
    }
    Ok(())
}
