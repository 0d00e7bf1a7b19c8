//! Chi-squared distribution and goodness-of-fit testing
//!
//! [`cdf`] and [`inv`] take a sample (or bin) count `n` and use `n - 1`
//! degrees of freedom.

use super::special::{incomplete_gamma, invert_monotone};
use super::{check_probability, check_sample_size, students_t, Histogram, Result};
use crate::error::StatsError;

/// Largest sample size [`min_samples`] will search
pub const MAX_MIN_SAMPLES: usize = 1_000_000;

/// Sizes up to here are scanned one by one; above it the coverage is
/// monotone and [`min_samples`] bisects
const LINEAR_SCAN_LIMIT: usize = 1_024;

fn degrees_of_freedom(n: usize) -> Result<f64> {
    check_sample_size(n)?;
    Ok((n - 1) as f64)
}

/// `Pr(X <= x)`, mirrored for negative `x`
pub fn cdf(n: usize, x: f64) -> Result<f64> {
    let v = degrees_of_freedom(n)?;
    if x < 0.0 {
        return Ok(1.0 - incomplete_gamma(v / 2.0, -x / 2.0));
    }
    Ok(incomplete_gamma(v / 2.0, x / 2.0))
}

/// Quantile function
pub fn inv(n: usize, p: f64) -> Result<f64> {
    let v = degrees_of_freedom(n)?;
    check_probability(p)?;
    if p == 0.0 {
        return Ok(0.0);
    }
    if p == 1.0 {
        return Ok(f64::INFINITY);
    }
    Ok(invert_monotone(
        |x| incomplete_gamma(v / 2.0, x / 2.0),
        p,
        0.0,
        v.max(1.0),
    ))
}

/// Smallest sample size whose mean and variance both land within `q`
/// standard deviations of the true values with probability `p`
///
/// The probability for a given `n` is
/// `Pr(T < q·√(n-1)) · Pr((1-q)²n < V < (1+q)²n)` with `T` Student's t and
/// `V` chi-squared, both on `n - 1` degrees of freedom.
///
/// # Example
/// ```
/// use regla::stats::chi_squared;
///
/// assert_eq!(chi_squared::min_samples(0.2, 0.5).unwrap(), 14);
/// ```
pub fn min_samples(q: f64, p: f64) -> Result<usize> {
    check_probability(p)?;
    if !(q.is_finite() && q > 0.0) {
        return Err(StatsError::InvalidTolerance(q));
    }
    if p >= 1.0 {
        return Err(StatsError::InvalidProbability(p));
    }

    for n in 2..=LINEAR_SCAN_LIMIT {
        if coverage(q, n)? >= p {
            return Ok(n);
        }
    }

    let (mut lo, mut hi) = (LINEAR_SCAN_LIMIT, LINEAR_SCAN_LIMIT);
    loop {
        if hi >= MAX_MIN_SAMPLES {
            return Err(StatsError::NoConvergence {
                tolerance: q,
                confidence: p,
                limit: MAX_MIN_SAMPLES,
            });
        }
        hi = hi.saturating_mul(2).min(MAX_MIN_SAMPLES);
        if coverage(q, hi)? >= p {
            break;
        }
        lo = hi;
    }
    while hi - lo > 1 {
        let mid = lo + (hi - lo) / 2;
        if coverage(q, mid)? >= p {
            hi = mid;
        } else {
            lo = mid;
        }
    }
    Ok(hi)
}

/// Probability that both mean and variance of `n` samples are within `q`
fn coverage(q: f64, n: usize) -> Result<f64> {
    let nf = n as f64;
    let mean_ok = students_t::one_sided_cdf(n, q * (nf - 1.0).sqrt())?;
    let variance_ok = cdf(n, (1.0 + q).powi(2) * nf)? - cdf(n, (1.0 - q).powi(2) * nf)?;
    Ok(mean_ok * variance_ok)
}

/// `Σ (observed - expected)² / expected` over bins with positive expectation
pub fn statistic(expected: &[f64], observed: &[f64]) -> Result<f64> {
    if expected.len() != observed.len() {
        return Err(StatsError::LengthMismatch {
            expected: expected.len(),
            observed: observed.len(),
        });
    }
    Ok(expected
        .iter()
        .zip(observed)
        .filter(|(e, _)| **e > 0.0)
        .map(|(e, o)| (o - e).powi(2) / e)
        .sum())
}

/// Goodness-of-fit test; true iff `observed` is consistent with `expected`
///
/// Bins with zero expectation are excluded. The remaining `k` bins give
/// `k - 1` degrees of freedom.
pub fn test(confidence: f64, expected: &[f64], observed: &[f64]) -> Result<bool> {
    check_probability(confidence)?;
    let stat = statistic(expected, observed)?;
    let bins = expected.iter().filter(|e| **e > 0.0).count();
    let threshold = inv(bins, confidence)?;
    Ok(stat < threshold)
}

/// [`test`] over two histograms' raw counts
pub fn test_histograms(confidence: f64, expected: &Histogram, observed: &Histogram) -> Result<bool> {
    test(confidence, expected.counts(), observed.counts())
}
