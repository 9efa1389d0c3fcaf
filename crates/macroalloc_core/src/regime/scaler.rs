use serde::Serialize;

/// Per-feature standardization fitted on the training history
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureScaler {
    mean: Vec<f64>,
    /// Population standard deviation
    std_dev: Vec<f64>,
    min: Vec<f64>,
    max: Vec<f64>,
}

/// Below this a feature is treated as constant.
const MIN_STD_DEV: f64 = 1e-12;

impl FeatureScaler {
    /// Fit on rows of equal, non-zero length. `rows` must not be empty.
    pub(crate) fn fit<'a, I>(rows: I, dim: usize) -> Self
    where
        I: IntoIterator<Item = &'a [f64]>,
    {
        let mut n = 0usize;
        let mut sum = vec![0.0; dim];
        let mut sum_sq = vec![0.0; dim];
        let mut min = vec![f64::INFINITY; dim];
        let mut max = vec![f64::NEG_INFINITY; dim];
        for row in rows {
            n += 1;
            for (i, &x) in row.iter().enumerate() {
                sum[i] += x;
                sum_sq[i] += x * x;
                min[i] = min[i].min(x);
                max[i] = max[i].max(x);
            }
        }
        let n = n.max(1) as f64;
        let mean: Vec<f64> = sum.iter().map(|s| s / n).collect();
        let std_dev = sum_sq
            .iter()
            .zip(&mean)
            .map(|(sq, m)| (sq / n - m * m).max(0.0).sqrt())
            .collect();
        Self {
            mean,
            std_dev,
            min,
            max,
        }
    }

    /// Standardize a raw vector. Constant features map to 0.
    #[must_use]
    pub fn transform(&self, values: &[f64]) -> Vec<f64> {
        values
            .iter()
            .zip(self.mean.iter().zip(&self.std_dev))
            .map(|(x, (m, s))| if *s < MIN_STD_DEV { 0.0 } else { (x - m) / s })
            .collect()
    }

    /// Map a standardized vector back to indicator units.
    #[must_use]
    pub fn inverse(&self, standardized: &[f64]) -> Vec<f64> {
        standardized
            .iter()
            .zip(self.mean.iter().zip(&self.std_dev))
            .map(|(z, (m, s))| if *s < MIN_STD_DEV { *m } else { m + z * s })
            .collect()
    }

    /// Whether any raw value lies outside the training range.
    #[must_use]
    pub fn is_outside_range(&self, values: &[f64]) -> bool {
        values
            .iter()
            .zip(self.min.iter().zip(&self.max))
            .any(|(x, (lo, hi))| x < lo || x > hi)
    }

    #[must_use]
    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    #[must_use]
    pub fn std_dev(&self) -> &[f64] {
        &self.std_dev
    }
}
