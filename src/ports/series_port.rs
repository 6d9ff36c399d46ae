//! Prepared price series access port trait.

use crate::domain::error::MeanrevError;
use crate::domain::price_point::PricePoint;
use chrono::NaiveDateTime;

pub trait SeriesPort {
    /// Ordered, deduplicated hourly series with quarter labels. When `years`
    /// is given, only those calendar years are returned and quarters are
    /// counted from the first returned point.
    fn fetch_series(&self, years: Option<&[i32]>) -> Result<Vec<PricePoint>, MeanrevError>;

    /// First timestamp, last timestamp and point count, or `None` when empty.
    fn data_range(&self) -> Result<Option<(NaiveDateTime, NaiveDateTime, usize)>, MeanrevError>;
}
