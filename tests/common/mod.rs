#![allow(dead_code)]

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use meanrev::domain::error::MeanrevError;
use meanrev::domain::params::StrategyParams;
pub use meanrev::domain::price_point::PricePoint;
use meanrev::domain::quarter::{annotate_quarters, validate_years};
use meanrev::domain::result::BacktestResult;
use meanrev::domain::sweep::SweepOutcome;
use meanrev::ports::report_port::ReportPort;
use meanrev::ports::series_port::SeriesPort;
use std::cell::RefCell;

pub struct MockSeriesPort {
    pub series: Vec<PricePoint>,
    pub error: Option<String>,
    pub fetches: RefCell<usize>,
}

impl MockSeriesPort {
    pub fn new(series: Vec<PricePoint>) -> Self {
        Self {
            series,
            error: None,
            fetches: RefCell::new(0),
        }
    }

    pub fn with_error(reason: &str) -> Self {
        Self {
            series: Vec::new(),
            error: Some(reason.to_string()),
            fetches: RefCell::new(0),
        }
    }
}

impl SeriesPort for MockSeriesPort {
    fn fetch_series(&self, years: Option<&[i32]>) -> Result<Vec<PricePoint>, MeanrevError> {
        *self.fetches.borrow_mut() += 1;
        if let Some(reason) = &self.error {
            return Err(MeanrevError::Data {
                reason: reason.clone(),
            });
        }
        match years {
            Some(years) => {
                let wanted = validate_years(years)?;
                let mut series: Vec<PricePoint> = self
                    .series
                    .iter()
                    .filter(|p| wanted.contains(&p.timestamp.year()))
                    .cloned()
                    .collect();
                annotate_quarters(&mut series);
                Ok(series)
            }
            None => Ok(self.series.clone()),
        }
    }

    fn data_range(&self) -> Result<Option<(NaiveDateTime, NaiveDateTime, usize)>, MeanrevError> {
        Ok(match (self.series.first(), self.series.last()) {
            (Some(first), Some(last)) => Some((first.timestamp, last.timestamp, self.series.len())),
            _ => None,
        })
    }
}

/// Captures everything handed to the report port.
#[derive(Default)]
pub struct RecordingReport {
    pub results: RefCell<Vec<BacktestResult>>,
    pub sweeps: RefCell<Vec<Vec<SweepOutcome>>>,
}

impl ReportPort for RecordingReport {
    fn write(&self, result: &BacktestResult) -> Result<(), MeanrevError> {
        self.results.borrow_mut().push(result.clone());
        Ok(())
    }

    fn write_sweep(&self, outcomes: &[SweepOutcome]) -> Result<(), MeanrevError> {
        self.sweeps.borrow_mut().push(outcomes.to_vec());
        Ok(())
    }
}

pub fn ts(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, 0, 0)
        .unwrap()
}

/// Hourly points from `start`, all labelled quarter 1.
pub fn hourly_series(start: NaiveDateTime, prices: &[f64]) -> Vec<PricePoint> {
    prices
        .iter()
        .enumerate()
        .map(|(i, &p)| PricePoint::new(start + chrono::Duration::hours(i as i64), p, 1))
        .collect()
}

/// Hourly points with explicit quarter labels.
pub fn labelled_series(start: NaiveDateTime, prices: &[f64], quarters: &[u32]) -> Vec<PricePoint> {
    assert_eq!(prices.len(), quarters.len());
    prices
        .iter()
        .zip(quarters)
        .enumerate()
        .map(|(i, (&p, &q))| PricePoint::new(start + chrono::Duration::hours(i as i64), p, q))
        .collect()
}

/// One point per day, quarters derived from the calendar.
pub fn daily_series(start: NaiveDateTime, prices: &[f64]) -> Vec<PricePoint> {
    let mut series: Vec<PricePoint> = prices
        .iter()
        .enumerate()
        .map(|(i, &p)| PricePoint::new(start + chrono::Duration::days(i as i64), p, 0))
        .collect();
    annotate_quarters(&mut series);
    series
}

pub fn oscillating_prices(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 100.0 + 12.0 * ((i as f64) * 0.3).sin())
        .collect()
}

/// Dip below and recover above a flat moving average.
pub fn spike_prices() -> Vec<f64> {
    vec![100.0, 100.0, 100.0, 100.0, 100.0, 90.0, 110.0, 110.0, 110.0, 110.0]
}

pub fn zero_fee_params(ma_length: usize) -> StrategyParams {
    StrategyParams {
        ma_length,
        fixed_fee: true,
        fee: 0.0,
        ..StrategyParams::default()
    }
}
