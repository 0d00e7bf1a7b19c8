// Statistics engine
//
// Streaming and batch estimators, histogram binning, and the three
// distributions used by the trial engine:
// - Student's t decides when a trial's running mean has stabilized
// - Chi-squared decides when the per-trial means fit a Normal model
// - Normal supplies the fitted histogram for that goodness-of-fit test
//
// Everything is f64 and hand-rolled on top of `special`, so results are
// identical on every platform and need no numeric backend.

pub mod chi_squared;
mod histogram;
pub mod normal;
mod offline;
mod online;
pub mod special;
pub mod students_t;

pub use histogram::Histogram;
pub use normal::Normal;
pub use offline::OfflineStatistics;
pub use online::OnlineStatistics;

use crate::error::StatsError;

/// Samples needed before a variance estimate is meaningful
pub const MIN_N_BEFORE_VALID_VARIANCE: usize = 2;

/// Result type for the statistics engine
pub type Result<T> = std::result::Result<T, StatsError>;

/// Common read-only view over a sample
pub trait Statistics {
    /// Number of samples
    fn size(&self) -> usize;

    fn mean(&self) -> f64;

    fn variance(&self) -> f64;

    fn standard_deviation(&self) -> f64 {
        self.variance().sqrt()
    }

    fn lowest(&self) -> f64;

    fn highest(&self) -> f64;

    /// True once `size() >= MIN_N_BEFORE_VALID_VARIANCE`
    fn has_valid_variance(&self) -> bool {
        self.size() >= MIN_N_BEFORE_VALID_VARIANCE
    }
}

pub(crate) fn check_probability(p: f64) -> Result<()> {
    if (0.0..=1.0).contains(&p) {
        Ok(())
    } else {
        Err(StatsError::InvalidProbability(p))
    }
}

pub(crate) fn check_sample_size(n: usize) -> Result<()> {
    if n < MIN_N_BEFORE_VALID_VARIANCE {
        return Err(StatsError::InsufficientSamples {
            required: MIN_N_BEFORE_VALID_VARIANCE,
            actual: n,
        });
    }
    Ok(())
}
