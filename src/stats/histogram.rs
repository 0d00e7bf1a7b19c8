use super::{OfflineStatistics, Result, Statistics, MIN_N_BEFORE_VALID_VARIANCE};
use crate::error::StatsError;

/// Equal-width bins over `[lowest, highest]`
///
/// Counts are stored as `f64` so that fitted (expected) histograms with
/// fractional counts share the type with observed ones.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    lowest: f64,
    highest: f64,
    counts: Vec<f64>,
    total: f64,
}

impl Histogram {
    /// Bin a sample using [`Histogram::optimal_bins`]
    pub fn new(stats: &OfflineStatistics) -> Self {
        Self::with_bins(stats, Self::optimal_bins(stats))
    }

    /// Bin a sample into exactly `bins` bins (at least one)
    ///
    /// Values falling on or past the last edge land in the last bin.
    pub fn with_bins(stats: &OfflineStatistics, bins: usize) -> Self {
        let bins = bins.max(1);
        let lowest = stats.lowest();
        let highest = stats.highest();
        let width = (highest - lowest) / bins as f64;

        let mut counts = vec![0.0; bins];
        for &x in stats.data() {
            let idx = if width > 0.0 {
                (((x - lowest) / width) as usize).min(bins - 1)
            } else {
                0
            };
            counts[idx] += 1.0;
        }

        Self {
            lowest,
            highest,
            counts,
            total: stats.size() as f64,
        }
    }

    /// Build a histogram from precomputed counts
    pub fn from_counts(lowest: f64, highest: f64, counts: Vec<f64>) -> Result<Self> {
        if highest < lowest {
            return Err(StatsError::InvalidRange { lowest, highest });
        }
        if counts.is_empty() {
            return Err(StatsError::EmptyData);
        }
        let total = counts.iter().sum();
        Ok(Self {
            lowest,
            highest,
            counts,
            total,
        })
    }

    /// Same range with different counts
    pub(crate) fn with_counts(&self, counts: Vec<f64>) -> Self {
        let total = counts.iter().sum();
        Self {
            lowest: self.lowest,
            highest: self.highest,
            counts,
            total,
        }
    }

    /// Bin count for approximately normal data
    ///
    /// Scott's rule, width `3.5σ / n^(1/3)`, padded up to
    /// `MIN_N_BEFORE_VALID_VARIANCE + 1` bins.
    pub fn optimal_bins(stats: &impl Statistics) -> usize {
        let min_bins = MIN_N_BEFORE_VALID_VARIANCE + 1;
        let n = stats.size() as f64;
        let width = 3.5 * stats.standard_deviation() / n.cbrt();
        let partitions = ((stats.highest() - stats.lowest()) / width).ceil();
        if partitions.is_finite() && partitions > min_bins as f64 {
            partitions as usize
        } else {
            min_bins
        }
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn lowest(&self) -> f64 {
        self.lowest
    }

    pub fn highest(&self) -> f64 {
        self.highest
    }

    pub fn bin_width(&self) -> f64 {
        (self.highest - self.lowest) / self.counts.len() as f64
    }

    /// `[left, right)` edges of bin `i`
    pub fn bin_range(&self, i: usize) -> (f64, f64) {
        let width = self.bin_width();
        let left = self.lowest + width * i as f64;
        (left, left + width)
    }

    /// Raw counts per bin
    pub fn counts(&self) -> &[f64] {
        &self.counts
    }

    /// Sum of all counts
    pub fn total(&self) -> f64 {
        self.total
    }

    /// Relative frequency per bin, `count / total`
    pub fn normalized(&self) -> Vec<f64> {
        if self.total == 0.0 {
            return vec![0.0; self.counts.len()];
        }
        self.counts.iter().map(|c| c / self.total).collect()
    }
}
