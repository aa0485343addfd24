//! Closed-form statistics shared by the detectors and aggregators.
//!
//! Standard deviations use the sample (n - 1) divisor throughout, matching the
//! `STDDEV` aggregate of the measurement store.

/// Arithmetic mean, or `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation. Undefined (`None`) for fewer than two values.
pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let sum_sq: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    Some((sum_sq / (values.len() - 1) as f64).sqrt())
}

pub fn min(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    values.into_iter().reduce(f64::min)
}

pub fn max(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    values.into_iter().reduce(f64::max)
}

/// Slope of the least-squares line through `(i, y[i])` for `i = 0..n`.
///
/// With fewer than two points there is no trend and the slope is 0.
pub fn index_slope(y: &[f64]) -> f64 {
    let n = y.len();
    if n < 2 {
        return 0.0;
    }
    let x_mean = (n - 1) as f64 / 2.0;
    let y_mean = y.iter().sum::<f64>() / n as f64;

    let (sxy, sxx) = y
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(sxy, sxx), (i, &yi)| {
            let dx = i as f64 - x_mean;
            (sxy + dx * (yi - y_mean), sxx + dx * dx)
        });

    sxy / sxx
}

/// Rounds to two decimal places for presentation.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
