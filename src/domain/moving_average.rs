//! Simple moving average over the prepared price series.
//!
//! SMA(n)[i] = sum(P[i-j] for j in 0..n) / n
//! The first (n-1) points have no average and are not emitted, so
//! `averages[k]` lines up with `series[k + n - 1]`.

use crate::domain::error::MeanrevError;
use crate::domain::price_point::PricePoint;

pub fn simple_moving_average(
    series: &[PricePoint],
    period: usize,
) -> Result<Vec<f64>, MeanrevError> {
    if period == 0 {
        return Err(MeanrevError::InvalidParameter {
            name: "ma_length".into(),
            reason: "ma_length must be at least 1".into(),
        });
    }
    if series.len() < period {
        return Err(MeanrevError::InsufficientData {
            points: series.len(),
            minimum: period,
        });
    }

    let averages = series
        .windows(period)
        .map(|window| window.iter().map(|p| p.price).sum::<f64>() / period as f64)
        .collect();

    Ok(averages)
}

/// Drop the warm-up points so the series aligns index-for-index with its averages.
pub fn warmed_up(series: &[PricePoint], period: usize) -> &[PricePoint] {
    &series[period.saturating_sub(1).min(series.len())..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_series(prices: &[f64]) -> Vec<PricePoint> {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        prices
            .iter()
            .enumerate()
            .map(|(i, &price)| {
                PricePoint::new(start + chrono::Duration::hours(i as i64), price, 1)
            })
            .collect()
    }

    #[test]
    fn sma_basic_calculation() {
        let series = make_series(&[10.0, 20.0, 30.0, 40.0, 50.0]);
        let sma = simple_moving_average(&series, 3).unwrap();
        assert_eq!(sma, vec![20.0, 30.0, 40.0]);
    }

    #[test]
    fn sma_aligns_with_warmed_up_series() {
        let series = make_series(&[10.0, 20.0, 30.0, 40.0, 50.0]);
        let sma = simple_moving_average(&series, 3).unwrap();
        let steps = warmed_up(&series, 3);
        assert_eq!(steps.len(), sma.len());
        assert_eq!(steps[0].price, 30.0);
    }

    #[test]
    fn sma_period_one_is_identity() {
        let series = make_series(&[5.0, 6.0, 7.0]);
        let sma = simple_moving_average(&series, 1).unwrap();
        assert_eq!(sma, vec![5.0, 6.0, 7.0]);
        assert_eq!(warmed_up(&series, 1).len(), 3);
    }

    #[test]
    fn sma_series_exactly_period_long_yields_one_value() {
        let series = make_series(&[1.0, 2.0, 3.0, 4.0]);
        let sma = simple_moving_average(&series, 4).unwrap();
        assert_eq!(sma.len(), 1);
        assert!((sma[0] - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn sma_series_shorter_than_period_is_error() {
        let series = make_series(&[1.0, 2.0]);
        let err = simple_moving_average(&series, 3).unwrap_err();
        assert!(matches!(
            err,
            MeanrevError::InsufficientData {
                points: 2,
                minimum: 3
            }
        ));
    }

    #[test]
    fn sma_zero_period_is_error() {
        let series = make_series(&[1.0]);
        assert!(simple_moving_average(&series, 0).is_err());
    }

    #[test]
    fn sma_constant_values() {
        let series = make_series(&[100.0; 6]);
        let sma = simple_moving_average(&series, 4).unwrap();
        assert!(sma.iter().all(|&v| (v - 100.0).abs() < f64::EPSILON));
    }
}
