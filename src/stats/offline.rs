use super::Statistics;
use crate::error::StatsError;
use std::sync::OnceLock;

/// Batch statistics over a fixed sample
///
/// Derived values are computed on first use and cached, so repeated calls
/// return bit-identical results. Variance is the population variance (mean
/// squared deviation).
#[derive(Debug, Clone)]
pub struct OfflineStatistics {
    data: Vec<f64>,
    sorted: OnceLock<Vec<f64>>,
    mean: OnceLock<f64>,
    variance: OnceLock<f64>,
}

impl OfflineStatistics {
    /// Wrap a non-empty sample
    pub fn new(data: impl Into<Vec<f64>>) -> Result<Self, StatsError> {
        let data = data.into();
        if data.is_empty() {
            return Err(StatsError::EmptyData);
        }
        Ok(Self {
            data,
            sorted: OnceLock::new(),
            mean: OnceLock::new(),
            variance: OnceLock::new(),
        })
    }

    /// Samples in their original order
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Samples in ascending order
    pub fn sorted(&self) -> &[f64] {
        self.sorted.get_or_init(|| {
            let mut sorted = self.data.clone();
            sorted.sort_by(f64::total_cmp);
            sorted
        })
    }

    pub fn median(&self) -> f64 {
        self.percentile(50.0)
    }

    /// Linear-interpolated percentile, `p` in `[0, 100]`
    pub fn percentile(&self, p: f64) -> f64 {
        let sorted = self.sorted();
        let rank = (p.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
        let lower = rank.floor() as usize;
        let upper = rank.ceil() as usize;
        let frac = rank - lower as f64;
        sorted[lower] + (sorted[upper] - sorted[lower]) * frac
    }
}

impl Statistics for OfflineStatistics {
    fn size(&self) -> usize {
        self.data.len()
    }

    fn mean(&self) -> f64 {
        *self
            .mean
            .get_or_init(|| self.data.iter().sum::<f64>() / self.data.len() as f64)
    }

    fn variance(&self) -> f64 {
        *self.variance.get_or_init(|| {
            let mean = self.mean();
            self.data.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / self.data.len() as f64
        })
    }

    fn lowest(&self) -> f64 {
        self.sorted()[0]
    }

    fn highest(&self) -> f64 {
        self.sorted()[self.data.len() - 1]
    }
}
