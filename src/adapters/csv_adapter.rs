//! CSV file series adapter.
//!
//! Reads a prepared hourly series with a header row. `timestamp` and `price`
//! columns are required; a `quarter` column is optional and recomputed from
//! the first returned point when absent or when a year filter is applied.

use crate::domain::error::MeanrevError;
use crate::domain::price_point::PricePoint;
use crate::domain::quarter::{annotate_quarters, validate_years};
use crate::ports::series_port::SeriesPort;
use chrono::{DateTime, Datelike, NaiveDateTime};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

const TIMESTAMP_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
];

pub struct CsvSeriesAdapter {
    path: PathBuf,
}

struct Columns {
    timestamp: usize,
    price: usize,
    quarter: Option<usize>,
}

impl CsvSeriesAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn find_columns(headers: &csv::StringRecord) -> Result<Columns, MeanrevError> {
        let position = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        let timestamp = position("timestamp").ok_or_else(|| MeanrevError::MissingField {
            field: "timestamp".into(),
        })?;
        let price = position("price").ok_or_else(|| MeanrevError::MissingField {
            field: "price".into(),
        })?;
        Ok(Columns {
            timestamp,
            price,
            quarter: position("quarter"),
        })
    }

    fn read_points(&self) -> Result<(Vec<PricePoint>, bool), MeanrevError> {
        let content = fs::read_to_string(&self.path).map_err(|e| MeanrevError::Data {
            reason: format!("failed to read {}: {}", self.path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr.headers().map_err(|e| MeanrevError::Data {
            reason: format!("CSV header error: {}", e),
        })?;
        let columns = Self::find_columns(headers)?;

        let mut points = Vec::new();
        for (row, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| MeanrevError::Data {
                reason: format!("CSV parse error: {}", e),
            })?;

            let ts_str = record.get(columns.timestamp).unwrap_or("");
            let timestamp = parse_timestamp(ts_str).ok_or_else(|| MeanrevError::Data {
                reason: format!("invalid timestamp '{}' on row {}", ts_str, row + 1),
            })?;

            let price_str = record.get(columns.price).unwrap_or("");
            let price: f64 = price_str.trim().parse().map_err(|_| MeanrevError::Data {
                reason: format!("invalid price '{}' on row {}", price_str, row + 1),
            })?;

            let quarter = match columns.quarter {
                Some(idx) => {
                    let q_str = record.get(idx).unwrap_or("");
                    q_str.trim().parse().map_err(|_| MeanrevError::Data {
                        reason: format!("invalid quarter '{}' on row {}", q_str, row + 1),
                    })?
                }
                None => 0,
            };

            points.push(PricePoint {
                timestamp,
                price,
                quarter,
            });
        }

        Ok((points, columns.quarter.is_some()))
    }
}

/// Accepts `YYYY-MM-DD HH:MM:SS` variants or unix seconds.
fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            value
                .parse::<i64>()
                .ok()
                .and_then(|secs| DateTime::from_timestamp(secs, 0))
                .map(|dt| dt.naive_utc())
        })
}

/// Sort by timestamp and keep the last row seen for each timestamp.
fn sort_and_dedupe(points: Vec<PricePoint>) -> Vec<PricePoint> {
    let mut indexed: Vec<(usize, PricePoint)> = points.into_iter().enumerate().collect();
    indexed.sort_by_key(|(i, p)| (p.timestamp, *i));

    let mut out: Vec<PricePoint> = Vec::with_capacity(indexed.len());
    for (_, point) in indexed {
        match out.last_mut() {
            Some(last) if last.timestamp == point.timestamp => *last = point,
            _ => out.push(point),
        }
    }
    out
}

impl SeriesPort for CsvSeriesAdapter {
    fn fetch_series(&self, years: Option<&[i32]>) -> Result<Vec<PricePoint>, MeanrevError> {
        let (points, has_quarters) = self.read_points()?;
        let read = points.len();
        let mut series = sort_and_dedupe(points);
        debug!(read, kept = series.len(), "series deduplicated");

        let filtered = match years {
            Some(years) => {
                let wanted = validate_years(years)?;
                series.retain(|p| wanted.contains(&p.timestamp.year()));
                true
            }
            None => false,
        };

        if filtered || !has_quarters {
            annotate_quarters(&mut series);
        }

        info!(
            path = %self.path.display(),
            points = series.len(),
            "series loaded"
        );
        Ok(series)
    }

    fn data_range(&self) -> Result<Option<(NaiveDateTime, NaiveDateTime, usize)>, MeanrevError> {
        let (points, _) = self.read_points()?;
        let series = sort_and_dedupe(points);
        Ok(match (series.first(), series.last()) {
            (Some(first), Some(last)) => Some((first.timestamp, last.timestamp, series.len())),
            _ => None,
        })
    }
}
