//! Arithmetic operations benchmarked by the demo suites

use crate::error::WorkloadError;

/// Deepest recursion the demo workloads accept
pub const MAX_RECURSION_DEPTH: i64 = 10_000;

/// An operation over a non-negative integer, in three styles
pub trait Operation: Send + Sync {
    fn name(&self) -> &'static str;

    fn iterative(&self, number: i64) -> i64;

    fn recursive(&self, number: i64) -> i64;

    fn tail_recursive(&self, number: i64) -> i64;
}

/// Reject inputs the recursive variants cannot handle
pub fn check_number(number: i64) -> Result<i64, WorkloadError> {
    if number < 0 {
        return Err(WorkloadError::skip(format!(
            "number must be non-negative, got {}",
            number
        )));
    }
    if number > MAX_RECURSION_DEPTH {
        return Err(WorkloadError::skip(format!(
            "number {} exceeds the recursion limit of {}",
            number, MAX_RECURSION_DEPTH
        )));
    }
    Ok(number)
}

/// `n!`, wrapping on overflow
#[derive(Debug, Clone, Copy, Default)]
pub struct Factorial;

impl Operation for Factorial {
    fn name(&self) -> &'static str {
        "factorial"
    }

    fn iterative(&self, number: i64) -> i64 {
        (1..=number).fold(1i64, |acc, i| acc.wrapping_mul(i))
    }

    fn recursive(&self, number: i64) -> i64 {
        if number <= 0 {
            1
        } else {
            self.recursive(number - 1).wrapping_mul(number)
        }
    }

    fn tail_recursive(&self, number: i64) -> i64 {
        fn go(number: i64, acc: i64) -> i64 {
            if number <= 0 {
                acc
            } else {
                go(number - 1, acc.wrapping_mul(number))
            }
        }
        go(number, 1)
    }
}

/// `1 + 2 + ... + n`
#[derive(Debug, Clone, Copy, Default)]
pub struct Sum;

impl Operation for Sum {
    fn name(&self) -> &'static str {
        "sum"
    }

    fn iterative(&self, number: i64) -> i64 {
        let mut result = 0i64;
        for i in (1..=number).rev() {
            result = result.wrapping_add(i);
        }
        result
    }

    fn recursive(&self, number: i64) -> i64 {
        if number <= 0 {
            0
        } else {
            self.recursive(number - 1).wrapping_add(number)
        }
    }

    fn tail_recursive(&self, number: i64) -> i64 {
        fn go(number: i64, acc: i64) -> i64 {
            if number <= 0 {
                acc
            } else {
                go(number - 1, acc.wrapping_add(number))
            }
        }
        go(number, 0)
    }
}
