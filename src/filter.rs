//! Closed date-range filtering on the purchase timestamp.

use chrono::{Datelike, Days, NaiveDate};
use polars::prelude::*;
use tracing::debug;

use crate::columns::PURCHASE_TIMESTAMP;
use crate::error::{require_columns, DashboardResult};

const UNIX_EPOCH_CE_DAYS: i32 = 719_163;

/// Inclusive `[start, end]` interval of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Clamp both ends into `bounds`.
    pub fn clamp_to(&self, bounds: &DateRange) -> DateRange {
        DateRange {
            start: self.start.clamp(bounds.start, bounds.end),
            end: self.end.clamp(bounds.start, bounds.end),
        }
    }
}

/// Shift a date by a signed number of days, saturating at chrono's limits.
pub fn shift_date(date: NaiveDate, days: i64) -> NaiveDate {
    let magnitude = Days::new(days.unsigned_abs());
    let shifted = if days >= 0 {
        date.checked_add_days(magnitude)
    } else {
        date.checked_sub_days(magnitude)
    };
    shifted.unwrap_or(date)
}

fn epoch_days(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_CE_DAYS
}

fn date_from_epoch_days(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(UNIX_EPOCH_CE_DAYS.saturating_add(days))
}

/// Purchase date as days since the Unix epoch; the time of day is discarded.
fn purchase_day() -> Expr {
    col(PURCHASE_TIMESTAMP)
        .dt()
        .date()
        .cast(DataType::Int32)
}

/// Keep rows whose purchase date lies in `range` (both ends inclusive).
///
/// Rows with a null timestamp never match. `start > end` yields an empty frame.
pub fn filter_by_date_range(df: &DataFrame, range: &DateRange) -> DashboardResult<DataFrame> {
    require_columns(df, &[PURCHASE_TIMESTAMP])?;
    if range.start > range.end {
        return Ok(df.clear());
    }

    let filtered = df
        .clone()
        .lazy()
        .filter(
            purchase_day()
                .gt_eq(lit(epoch_days(range.start)))
                .and(purchase_day().lt_eq(lit(epoch_days(range.end)))),
        )
        .collect()?;
    debug!(
        start = %range.start,
        end = %range.end,
        rows = filtered.height(),
        "applied date range"
    );
    Ok(filtered)
}

/// Earliest and latest purchase date, or None when no row has a timestamp.
pub fn date_bounds(df: &DataFrame) -> DashboardResult<Option<DateRange>> {
    require_columns(df, &[PURCHASE_TIMESTAMP])?;
    let out = df
        .clone()
        .lazy()
        .select([
            purchase_day().min().alias("min_day"),
            purchase_day().max().alias("max_day"),
        ])
        .collect()?;

    let min = out.column("min_day")?.i32()?.get(0);
    let max = out.column("max_day")?.i32()?.get(0);
    Ok(match (min.and_then(date_from_epoch_days), max.and_then(date_from_epoch_days)) {
        (Some(start), Some(end)) => Some(DateRange { start, end }),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prepare::prepare;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample() -> DataFrame {
        let df = df!(
            PURCHASE_TIMESTAMP => &[
                "2018-01-01 00:00:00",
                "2018-01-31 23:59:59",
                "2018-02-15 12:00:00",
                "garbage",
            ],
            "product_id" => &["A", "B", "C", "D"]
        )
        .unwrap();
        prepare(df).unwrap().df
    }

    #[test]
    fn end_date_is_inclusive_for_whole_day() {
        let df = sample();
        let out =
            filter_by_date_range(&df, &DateRange::new(date(2018, 1, 1), date(2018, 1, 31)))
                .unwrap();
        assert_eq!(out.height(), 2);
    }

    #[test]
    fn inverted_range_is_empty_not_error() {
        let df = sample();
        let out =
            filter_by_date_range(&df, &DateRange::new(date(2018, 2, 1), date(2018, 1, 1)))
                .unwrap();
        assert_eq!(out.height(), 0);
        assert_eq!(out.width(), df.width());
    }

    #[test]
    fn full_bounds_keep_every_valid_row() {
        let df = sample();
        let bounds = date_bounds(&df).unwrap().unwrap();
        assert_eq!(bounds, DateRange::new(date(2018, 1, 1), date(2018, 2, 15)));
        let out = filter_by_date_range(&df, &bounds).unwrap();
        assert_eq!(out.height(), 3);
    }

    #[test]
    fn bounds_of_empty_frame_are_none() {
        let df = sample().clear();
        assert_eq!(date_bounds(&df).unwrap(), None);
    }

    #[test]
    fn missing_timestamp_column_errors() {
        let df = df!("product_id" => &["A"]).unwrap();
        assert!(filter_by_date_range(&df, &DateRange::new(date(2018, 1, 1), date(2018, 1, 2)))
            .is_err());
    }

    #[test]
    fn shift_and_clamp() {
        let bounds = DateRange::new(date(2018, 1, 1), date(2018, 12, 31));
        assert_eq!(shift_date(date(2018, 1, 1), -1), date(2017, 12, 31));
        assert_eq!(shift_date(date(2018, 1, 1), 30), date(2018, 1, 31));
        let r = DateRange::new(date(2017, 6, 1), date(2019, 1, 1)).clamp_to(&bounds);
        assert_eq!(r, bounds);
        assert!(bounds.contains(date(2018, 6, 1)));
    }
}
