//! Student's t distribution
//!
//! All functions take the sample size `n` and use `n - 1` degrees of
//! freedom. [`cdf`] is the two-sided confidence of the interval
//! `[-|x|, |x|]`, mirrored for negative `x` so that
//! `cdf(n, -x) = 1 - cdf(n, x)`. [`inv`] is its inverse: non-negative for
//! `p >= 0.5`, negative below.

use super::special::{incomplete_beta, invert_monotone};
use super::{check_probability, check_sample_size, Result};

fn degrees_of_freedom(n: usize) -> Result<f64> {
    check_sample_size(n)?;
    Ok((n - 1) as f64)
}

/// `Pr(|T| <= x)` for `x >= 0`
fn two_sided(v: f64, x: f64) -> f64 {
    1.0 - incomplete_beta(v / (v + x * x), v / 2.0, 0.5)
}

/// Two-sided confidence for `x`, mirrored below zero
///
/// # Example
/// ```
/// use regla::stats::students_t;
///
/// let p = students_t::cdf(8, 2.364624).unwrap();
/// assert!((p - 0.95).abs() < 1e-4);
/// ```
pub fn cdf(n: usize, x: f64) -> Result<f64> {
    let v = degrees_of_freedom(n)?;
    if x.is_infinite() {
        return Ok(if x > 0.0 { 1.0 } else { 0.0 });
    }
    let p = two_sided(v, x.abs());
    Ok(if x < 0.0 { 1.0 - p } else { p })
}

/// Ordinary lower-tail CDF, `Pr(T <= x)`
pub fn one_sided_cdf(n: usize, x: f64) -> Result<f64> {
    let p = cdf(n, x.abs())?;
    let upper = 0.5 * (1.0 + p);
    Ok(if x < 0.0 { 1.0 - upper } else { upper })
}

/// Inverse of [`cdf`]
pub fn inv(n: usize, p: f64) -> Result<f64> {
    let v = degrees_of_freedom(n)?;
    check_probability(p)?;
    if p >= 0.5 {
        Ok(positive_root(v, p))
    } else {
        Ok(-positive_root(v, 1.0 - p))
    }
}

fn positive_root(v: f64, p: f64) -> f64 {
    if p >= 1.0 {
        return f64::INFINITY;
    }
    invert_monotone(|x| two_sided(v, x), p, 0.0, 1.0)
}

/// Confidence interval `mean ± t·sd/√n`
pub fn bounds(n: usize, confidence: f64, mean: f64, sd: f64) -> Result<(f64, f64)> {
    let t = inv(n, confidence)?;
    let half_width = t * sd / (n as f64).sqrt();
    Ok((mean - half_width, mean + half_width))
}

/// True iff `hypothesized` lies inside the interval around `sample_mean`
pub fn test_hypothesis(
    n: usize,
    confidence: f64,
    sample_mean: f64,
    sd: f64,
    hypothesized: f64,
) -> Result<bool> {
    let (lower, upper) = bounds(n, confidence, sample_mean, sd)?;
    Ok(lower <= hypothesized && hypothesized <= upper)
}

/// True iff `mean` is a plausible population mean for the sample
///
/// Same as [`test_hypothesis`] with the sample mean as hypothesis; fails
/// only when the interval is not defined (non-finite `mean` or `sd`).
pub fn test(n: usize, confidence: f64, mean: f64, sd: f64) -> Result<bool> {
    test_hypothesis(n, confidence, mean, sd, mean)
}
