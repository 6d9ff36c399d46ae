//! Prepared price series representation.

use crate::domain::error::MeanrevError;
use chrono::NaiveDateTime;

/// One hourly observation of the prepared series.
#[derive(Debug, Clone, PartialEq)]
pub struct PricePoint {
    pub timestamp: NaiveDateTime,
    pub price: f64,
    /// 1-based calendar-quarter index relative to the series start.
    pub quarter: u32,
}

impl PricePoint {
    pub fn new(timestamp: NaiveDateTime, price: f64, quarter: u32) -> Self {
        Self {
            timestamp,
            price,
            quarter,
        }
    }
}

/// Check the ordering and value constraints a prepared series must satisfy.
pub fn validate_series(series: &[PricePoint]) -> Result<(), MeanrevError> {
    if series.is_empty() {
        return Err(MeanrevError::InvalidSeries {
            reason: "series is empty".into(),
        });
    }

    for (i, point) in series.iter().enumerate() {
        if !point.price.is_finite() || point.price <= 0.0 {
            return Err(MeanrevError::InvalidSeries {
                reason: format!("price at index {} must be positive, got {}", i, point.price),
            });
        }
        if point.quarter == 0 {
            return Err(MeanrevError::InvalidSeries {
                reason: format!("quarter label at index {} must start from 1", i),
            });
        }
    }

    for (i, pair) in series.windows(2).enumerate() {
        if pair[1].timestamp < pair[0].timestamp {
            return Err(MeanrevError::InvalidSeries {
                reason: format!("timestamps decrease at index {}", i + 1),
            });
        }
        if pair[1].quarter < pair[0].quarter {
            return Err(MeanrevError::InvalidSeries {
                reason: format!("quarter labels decrease at index {}", i + 1),
            });
        }
    }

    Ok(())
}
