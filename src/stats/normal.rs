//! Normal distribution and fitted histograms

use super::special::{erf, invert_monotone};
use super::{check_probability, Histogram, Result, Statistics};
use std::f64::consts::{PI, SQRT_2};

/// A Normal distribution given by mean and standard deviation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normal {
    mean: f64,
    sd: f64,
}

impl Normal {
    pub fn new(mean: f64, sd: f64) -> Self {
        Self {
            mean,
            sd: sd.abs(),
        }
    }

    /// N(0, 1)
    pub fn standard() -> Self {
        Self::new(0.0, 1.0)
    }

    /// Normal with the sample's mean and standard deviation
    pub fn fit(stats: &impl Statistics) -> Self {
        Self::new(stats.mean(), stats.standard_deviation())
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn sd(&self) -> f64 {
        self.sd
    }

    pub fn pdf(&self, x: f64) -> f64 {
        let z = (x - self.mean) / self.sd;
        (-0.5 * z * z).exp() / (self.sd * (2.0 * PI).sqrt())
    }

    /// `Pr(X <= x)`; a zero-width distribution is a step at the mean
    pub fn cdf(&self, x: f64) -> f64 {
        if self.sd == 0.0 {
            return if x < self.mean { 0.0 } else { 1.0 };
        }
        0.5 * (1.0 + erf((x - self.mean) / (self.sd * SQRT_2)))
    }

    /// Quantile function
    pub fn inv(&self, p: f64) -> Result<f64> {
        check_probability(p)?;
        if p == 0.0 {
            return Ok(f64::NEG_INFINITY);
        }
        if p == 1.0 {
            return Ok(f64::INFINITY);
        }
        if self.sd == 0.0 {
            return Ok(self.mean);
        }
        let standard = Normal::standard();
        let z = invert_monotone(|z| standard.cdf(z), p, -40.0, 40.0);
        Ok(self.mean + self.sd * z)
    }

    /// Expected counts for `observed`'s bins under this distribution
    ///
    /// Uses the same range, bin count and total as `observed`. The first and
    /// last bins are open towards -∞ and +∞ so the expected counts sum to
    /// the observed total.
    pub fn histogram(&self, observed: &Histogram) -> Histogram {
        let bins = observed.len();
        let total = observed.total();
        let counts = (0..bins)
            .map(|i| {
                let (left, right) = observed.bin_range(i);
                let lower = if i == 0 { 0.0 } else { self.cdf(left) };
                let upper = if i + 1 == bins { 1.0 } else { self.cdf(right) };
                total * (upper - lower)
            })
            .collect();
        observed.with_counts(counts)
    }
}

impl Default for Normal {
    fn default() -> Self {
        Self::standard()
    }
}
