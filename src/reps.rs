//! Adaptive repetition selection for micro-benchmarks
//!
//! A micro-benchmark is timed over `reps` calls at once to amortize clock
//! overhead. The selector probes `reps = 1, 10, 100, ...`, records the
//! integer average time per repetition, and stops at the first probe count
//! where that average has settled:
//!
//! - root: a finite-difference slope of the averages is exactly zero. The
//!   slope is one-sided at both ends (`avg[1] - avg[0]`, `avg[n-1] - avg[n-2]`)
//!   and central in between; a zero slope at `i` selects probe `i`
//! - local minimum: `avg[i-1] >= avg[i] <= avg[i+1]` at an interior point
//!
//! A probe whose raw elapsed time reaches the safety budget ends the search
//! at that probe; otherwise the largest probe wins.

use crate::clock::Clock;
use crate::error::WorkloadError;
use tracing::debug;

/// Why a repetition count was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChoiceReason {
    Root,
    LocalMinimum,
    BudgetExceeded,
    ProbesExhausted,
}

/// Outcome of a repetition search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepetitionChoice {
    /// Selected repetition count, always at least 1
    pub reps: u64,
    pub reason: ChoiceReason,
    /// `(reps, avg_ns)` for every probe taken
    pub probes: Vec<(u64, u64)>,
}

/// Index of the first settled probe, if any
///
/// Root test first, then the local-minimum test. Two probes are enough for
/// the root test; the local minimum needs an interior point.
///
/// # Example
/// ```
/// use regla::reps::quick_choose_reps;
///
/// assert_eq!(quick_choose_reps(&[40, 40]), Some(0));
/// assert_eq!(quick_choose_reps(&[90, 40, 40]), Some(1));
/// assert_eq!(quick_choose_reps(&[90, 40, 35]), None);
/// ```
pub fn quick_choose_reps(avg_ns: &[u64]) -> Option<usize> {
    settle(avg_ns).map(|(i, _)| i)
}

fn settle(avg_ns: &[u64]) -> Option<(usize, ChoiceReason)> {
    let n = avg_ns.len();
    if n < 2 {
        return None;
    }
    let last = n - 2;
    let root = (0..=last).find(|&i| {
        if i == 0 || i == last {
            avg_ns[i + 1] == avg_ns[i]
        } else {
            avg_ns[i + 1] == avg_ns[i - 1]
        }
    });
    if let Some(i) = root {
        return Some((i, ChoiceReason::Root));
    }
    (1..n - 1)
        .find(|&i| avg_ns[i - 1] >= avg_ns[i] && avg_ns[i + 1] >= avg_ns[i])
        .map(|i| (i, ChoiceReason::LocalMinimum))
}

/// Probes a workload for a stable repetition count
pub struct RepetitionSelector<'a> {
    clock: &'a dyn Clock,
    warmup_reps: u64,
    max_reps: u64,
    safe_budget_ns: u64,
}

impl<'a> RepetitionSelector<'a> {
    pub fn new(clock: &'a dyn Clock, warmup_reps: u64, max_reps: u64, safe_budget_ns: u64) -> Self {
        Self {
            clock,
            warmup_reps,
            max_reps: max_reps.max(1),
            safe_budget_ns,
        }
    }

    /// Run the search; `invoke(reps)` must execute the workload `reps` times
    pub fn choose<F>(&self, mut invoke: F) -> Result<RepetitionChoice, WorkloadError>
    where
        F: FnMut(u64) -> Result<(), WorkloadError>,
    {
        if self.warmup_reps > 0 {
            invoke(self.warmup_reps)?;
        }

        let mut probes: Vec<(u64, u64)> = Vec::new();
        let mut averages: Vec<u64> = Vec::new();
        let mut reps = 1u64;

        while reps < self.max_reps || probes.is_empty() {
            let start = self.clock.now_ns();
            invoke(reps)?;
            let elapsed = self.clock.now_ns().saturating_sub(start);
            let avg = elapsed / reps;
            probes.push((reps, avg));
            averages.push(avg);
            debug!(reps, elapsed_ns = elapsed, avg_ns = avg, "repetition probe");

            if let Some((i, reason)) = settle(&averages) {
                return Ok(RepetitionChoice {
                    reps: probes[i].0,
                    reason,
                    probes,
                });
            }

            if elapsed >= self.safe_budget_ns {
                return Ok(RepetitionChoice {
                    reps,
                    reason: ChoiceReason::BudgetExceeded,
                    probes,
                });
            }

            reps = match reps.checked_mul(10) {
                Some(next) => next,
                None => break,
            };
        }

        let reps = probes.last().map_or(1, |(r, _)| *r);
        Ok(RepetitionChoice {
            reps,
            reason: ChoiceReason::ProbesExhausted,
            probes,
        })
    }
}
