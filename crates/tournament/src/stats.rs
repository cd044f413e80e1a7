//! Summary statistics used by autoplay weighting

/// Arithmetic mean, 0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance around `mean`.
pub fn variance(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64
}

pub fn std_dev(values: &[f64], mean: f64) -> f64 {
    variance(values, mean).sqrt()
}

/// Mean and spread of one quantity across candidates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub mean: f64,
    pub variance: f64,
}

impl Summary {
    pub fn of(values: &[f64]) -> Self {
        let mean = mean(values);
        Self {
            mean,
            variance: variance(values, mean),
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance.sqrt()
    }
}
