//! Year selection and quarter labelling for prepared series.

use crate::domain::error::MeanrevError;
use crate::domain::price_point::PricePoint;
use chrono::Datelike;
use std::collections::BTreeSet;
use std::ops::RangeInclusive;

/// Calendar years covered by the bundled hourly history.
pub const SUPPORTED_YEARS: RangeInclusive<i32> = 2014..=2023;

/// Parse a comma-separated year list such as `2019, 2020`.
pub fn parse_years(input: &str) -> Result<Vec<i32>, MeanrevError> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i32>().map_err(|_| MeanrevError::ConfigInvalid {
                section: "data".into(),
                key: "years".into(),
                reason: format!("'{}' is not a year", s),
            })
        })
        .collect()
}

/// Every requested year must be in [`SUPPORTED_YEARS`]; an empty request is rejected.
pub fn validate_years(years: &[i32]) -> Result<BTreeSet<i32>, MeanrevError> {
    if years.is_empty() {
        return Err(MeanrevError::NoYears);
    }
    for &year in years {
        if !SUPPORTED_YEARS.contains(&year) {
            return Err(MeanrevError::UnsupportedYear {
                year,
                first: *SUPPORTED_YEARS.start(),
                last: *SUPPORTED_YEARS.end(),
            });
        }
    }
    Ok(years.iter().copied().collect())
}

/// Label each point with its quarter index: whole months elapsed since the
/// first point's month, divided by three, plus one.
pub fn annotate_quarters(series: &mut [PricePoint]) {
    let Some(first) = series.first().map(|p| p.timestamp) else {
        return;
    };
    let (start_year, start_month) = (first.year(), first.month() as i32);

    for point in series.iter_mut() {
        let months = (point.timestamp.year() - start_year) * 12
            + point.timestamp.month() as i32
            - start_month;
        point.quarter = (months.div_euclid(3) + 1).max(1) as u32;
    }
}
