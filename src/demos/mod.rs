//! Built-in benchmark suites
//!
//! Each suite is a list of uniform benchmark units the binary can run by
//! name. The operation units share one parameter field and one method set,
//! so `operations` runs factorial and sum side by side.

pub mod operations;

use crate::benchmark::{BenchmarkUnit, UnitBuilder};
use crate::error::WorkloadError;
use crate::params::ParameterField;
use crate::value::{TypeTag, Value};
use operations::{check_number, Factorial, Operation, Sum};
use std::hint::black_box;

/// Calls per macro-benchmark invocation
pub const MACRO_CALLS: u64 = 10_000;

/// Names accepted by [`suite`]
pub const SUITES: &[&str] = &["factorial", "sum", "operations"];

/// Candidates for the `number` field
pub const DEFAULT_NUMBERS: [&str; 3] = ["5", "10", "20"];

struct OperationState {
    op: Box<dyn Operation>,
    number: i64,
}

fn micro(state: &mut OperationState, reps: u64, f: fn(&dyn Operation, i64) -> i64) -> Value {
    let op = state.op.as_ref();
    let number = black_box(state.number);
    let mut dummy = 0i64;
    for _ in 0..reps {
        dummy |= f(op, black_box(number));
    }
    Value::Long(black_box(dummy))
}

fn macro_run(state: &mut OperationState, f: fn(&dyn Operation, i64) -> i64) -> Value {
    let op = state.op.as_ref();
    let number = black_box(state.number);
    let mut dummy = 0i64;
    for _ in 0..MACRO_CALLS {
        dummy = dummy.wrapping_add(f(op, black_box(number)));
    }
    Value::Long(black_box(dummy))
}

/// Benchmark unit timing the three styles of `op`
///
/// Micro methods: `iterative`, `recursive`, `tail_recursive`. Macro methods
/// run [`MACRO_CALLS`] calls each. Numbers outside the supported range skip
/// their row.
pub fn operation_unit(op: Box<dyn Operation>) -> Box<dyn BenchmarkUnit> {
    let name = op.name();
    UnitBuilder::new(name, OperationState { op, number: 0 })
        .field(ParameterField::new("number", TypeTag::Int, DEFAULT_NUMBERS))
        .bind(|state, row| {
            let number = row
                .get("number")
                .and_then(Value::as_i64)
                .ok_or_else(|| WorkloadError::skip("number is null"))?;
            state.number = check_number(number)?;
            Ok(())
        })
        .micro_benchmark("iterative", |state, reps| {
            Ok(micro(state, reps, |op, n| op.iterative(n)))
        })
        .micro_benchmark("recursive", |state, reps| {
            Ok(micro(state, reps, |op, n| op.recursive(n)))
        })
        .micro_benchmark("tail_recursive", |state, reps| {
            Ok(micro(state, reps, |op, n| op.tail_recursive(n)))
        })
        .macro_benchmark("macro_iterative", |state| {
            Ok(macro_run(state, |op, n| op.iterative(n)))
        })
        .macro_benchmark("macro_recursive", |state| {
            Ok(macro_run(state, |op, n| op.recursive(n)))
        })
        .boxed()
}

/// Units of a named suite, `None` for unknown names
pub fn suite(name: &str) -> Option<Vec<Box<dyn BenchmarkUnit>>> {
    match name {
        "factorial" => Some(vec![operation_unit(Box::new(Factorial))]),
        "sum" => Some(vec![operation_unit(Box::new(Sum))]),
        "operations" => Some(vec![
            operation_unit(Box::new(Factorial)),
            operation_unit(Box::new(Sum)),
        ]),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::benchmark::{check_uniform, MethodKind};
    use crate::params::ParameterSpace;

    #[test]
    fn test_every_suite_resolves_and_is_uniform() {
        for name in SUITES {
            let units = suite(name).unwrap();
            assert!(!units.is_empty());
            assert!(check_uniform(&units).is_ok(), "{name}");
        }
        assert!(suite("missing").is_none());
    }

    #[test]
    fn test_operation_unit_shape() {
        let unit = operation_unit(Box::new(Sum));
        let methods = unit.methods();
        assert_eq!(methods.len(), 5);
        assert_eq!(
            methods
                .iter()
                .filter(|m| m.kind == MethodKind::Macro)
                .count(),
            2
        );
        assert_eq!(unit.fields()[0].candidates.len(), 3);
    }

    #[test]
    fn test_bound_number_drives_workload() {
        let mut unit = operation_unit(Box::new(Factorial));
        let space = ParameterSpace::new(unit.fields().to_vec()).unwrap();
        unit.bind(&space.rows()[0]).unwrap();
        assert_eq!(unit.invoke("iterative", 3).unwrap(), Value::Long(120));
        assert_eq!(unit.invoke("tail_recursive", 1).unwrap(), Value::Long(120));
        assert_eq!(
            unit.invoke("macro_iterative", 0).unwrap(),
            Value::Long(120 * MACRO_CALLS as i64)
        );
    }

    #[test]
    fn test_negative_number_skips_row() {
        let mut unit = operation_unit(Box::new(Sum));
        let space = ParameterSpace::new(vec![ParameterField::new(
            "number",
            TypeTag::Int,
            ["-1"],
        )])
        .unwrap();
        assert!(matches!(
            unit.bind(&space.rows()[0]),
            Err(WorkloadError::Skip(_))
        ));
    }
}
