use super::{Statistics, MIN_N_BEFORE_VALID_VARIANCE};
use crate::error::StatsError;
use std::fmt;

/// Streaming mean/variance estimator (Welford)
///
/// Not meant to be shared between writers; each trial loop owns its own.
/// Before `MIN_N_BEFORE_VALID_VARIANCE` samples the variance reads as 0.0;
/// use [`OnlineStatistics::checked_variance`] to tell the two states apart.
#[derive(Debug, Clone, PartialEq)]
pub struct OnlineStatistics {
    n: usize,
    mean: f64,
    m2: f64,
    lowest: f64,
    highest: f64,
}

impl Default for OnlineStatistics {
    fn default() -> Self {
        Self {
            n: 0,
            mean: 0.0,
            m2: 0.0,
            lowest: f64::INFINITY,
            highest: f64::NEG_INFINITY,
        }
    }
}

impl OnlineStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Incorporate one sample
    pub fn update(&mut self, x: f64) {
        self.n += 1;
        let delta = x - self.mean;
        self.mean += delta / self.n as f64;
        self.m2 += delta * (x - self.mean);
        self.lowest = self.lowest.min(x);
        self.highest = self.highest.max(x);
    }

    /// Return to the empty state
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Sample variance, or an error while fewer than two samples are in
    pub fn checked_variance(&self) -> Result<f64, StatsError> {
        if self.n < MIN_N_BEFORE_VALID_VARIANCE {
            return Err(StatsError::InsufficientSamples {
                required: MIN_N_BEFORE_VALID_VARIANCE,
                actual: self.n,
            });
        }
        Ok(self.m2 / (self.n - 1) as f64)
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }
}

impl Statistics for OnlineStatistics {
    fn size(&self) -> usize {
        self.n
    }

    fn mean(&self) -> f64 {
        self.mean
    }

    fn variance(&self) -> f64 {
        self.checked_variance().unwrap_or(0.0)
    }

    fn lowest(&self) -> f64 {
        self.lowest
    }

    fn highest(&self) -> f64 {
        self.highest
    }
}

impl Extend<f64> for OnlineStatistics {
    fn extend<I: IntoIterator<Item = f64>>(&mut self, iter: I) {
        for x in iter {
            self.update(x);
        }
    }
}

impl fmt::Display for OnlineStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.n == 0 {
            return f.write_str("n: 0");
        }
        write!(
            f,
            "n: {}, mean: {:.3}, sd: {:.3}, min: {:.3}, max: {:.3}",
            self.n,
            self.mean,
            self.standard_deviation(),
            self.lowest,
            self.highest
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_textbook_sequence() {
        let mut stats = OnlineStatistics::new();
        stats.extend([2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(stats.size(), 8);
        assert!((stats.mean() - 5.0).abs() < 1e-12);
        assert!((stats.variance() - 32.0 / 7.0).abs() < 1e-12);
        assert_eq!(stats.lowest(), 2.0);
        assert_eq!(stats.highest(), 9.0);
    }

    #[test]
    fn test_variance_not_valid_before_two_samples() {
        let mut stats = OnlineStatistics::new();
        assert!(stats.checked_variance().is_err());
        stats.update(3.0);
        assert_eq!(
            stats.checked_variance(),
            Err(StatsError::InsufficientSamples {
                required: 2,
                actual: 1
            })
        );
        assert_eq!(stats.variance(), 0.0);
        assert!(!stats.has_valid_variance());
        stats.update(5.0);
        assert_eq!(stats.checked_variance(), Ok(2.0));
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut stats = OnlineStatistics::new();
        stats.extend([1.0, 2.0, 3.0]);
        stats.clear();
        assert_eq!(stats, OnlineStatistics::default());
        assert!(stats.is_empty());
        assert_eq!(stats.to_string(), "n: 0");
    }
}
