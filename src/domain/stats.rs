//! Quarterly summary statistics.

/// Round to two decimal places, half away from zero.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Sample standard deviation (n - 1 denominator).
///
/// Returns `None` for fewer than two values, e.g. a run that closed a single
/// quarter, where the estimator is undefined.
pub fn sample_stddev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(variance.sqrt())
}

/// Fraction of quarters where the strategy's return, rounded to two
/// decimals, exceeded the baseline's. The ratio itself is rounded to two
/// decimals. `None` when no quarter has closed.
pub fn quarters_beating_baseline(strategy: &[f64], baseline: &[f64]) -> Option<f64> {
    if strategy.is_empty() {
        return None;
    }
    let count = strategy
        .iter()
        .zip(baseline)
        .filter(|&(s, b)| round2(*s) > round2(*b))
        .count();
    Some(round2(count as f64 / strategy.len() as f64))
}
