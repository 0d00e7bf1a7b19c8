//! Time sources for the trial engine
//!
//! The engine never reads the system clock directly. Production runs use
//! [`MonotonicClock`]; tests drive a [`SimulatedClock`] so that repetition
//! selection and time limits are deterministic.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// A monotonic nanosecond counter plus a wall-clock timestamp
pub trait Clock: Send + Sync {
    /// Monotonic nanoseconds since an arbitrary origin
    fn now_ns(&self) -> u64;

    /// Milliseconds since the Unix epoch
    fn wall_ms(&self) -> u64;
}

/// Real time: `Instant` for intervals, `SystemTime` for timestamps
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ns(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }

    fn wall_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0)
    }
}

/// Manually driven clock
///
/// Every call to `now_ns` advances time by `tick_ns`, which models the cost
/// of reading the clock. Workloads holding a clone can call
/// [`SimulatedClock::advance`] to model their own cost.
#[derive(Debug, Default)]
pub struct SimulatedClock {
    now: AtomicU64,
    tick_ns: u64,
    epoch_ms: u64,
}

impl SimulatedClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clock whose every reading costs `tick_ns`
    pub fn with_tick(tick_ns: u64) -> Self {
        Self {
            tick_ns,
            ..Self::default()
        }
    }

    /// Move time forward by `ns`
    pub fn advance(&self, ns: u64) {
        self.now.fetch_add(ns, Ordering::SeqCst);
    }

    /// Current time without advancing it
    pub fn peek_ns(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

impl Clock for SimulatedClock {
    fn now_ns(&self) -> u64 {
        self.now.fetch_add(self.tick_ns, Ordering::SeqCst)
    }

    fn wall_ms(&self) -> u64 {
        self.epoch_ms + self.peek_ns() / 1_000_000
    }
}
