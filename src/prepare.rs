//! Timestamp parsing and purchase-month derivation.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use tracing::warn;

use crate::columns::{PURCHASE_MONTH, PURCHASE_TIMESTAMP};
use crate::error::{DashboardError, DashboardResult, Notice};

const TIMESTAMP_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

/// Parse one ISO-like timestamp. Offsets are converted to UTC; a bare date is midnight.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_utc()))
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Prepared dataset plus the notices raised while preparing it.
#[derive(Debug, Clone)]
pub struct Prepared {
    pub df: DataFrame,
    pub notices: Vec<Notice>,
}

impl Prepared {
    /// True when the timestamp column was present, so filtering and charts can run.
    pub fn has_timestamps(&self) -> bool {
        self.df.get_column_index(PURCHASE_TIMESTAMP).is_some()
    }
}

/// Parse the purchase timestamp into a Datetime column and derive `purchase_month`.
///
/// Unparseable values become null and raise a single aggregate warning. A missing
/// timestamp column raises an error notice and leaves the frame untouched. Running
/// this twice yields the same months as running it once.
pub fn prepare(mut df: DataFrame) -> DashboardResult<Prepared> {
    let mut notices = Vec::new();

    let column = match df.column(PURCHASE_TIMESTAMP) {
        Ok(column) => column.clone(),
        Err(_) => {
            let err = DashboardError::MissingColumn(PURCHASE_TIMESTAMP.to_string());
            warn!(column = PURCHASE_TIMESTAMP, "timestamp column missing");
            notices.push(Notice::from(&err));
            return Ok(Prepared { df, notices });
        }
    };

    match column.dtype() {
        DataType::Datetime(_, _) => {}
        DataType::Date => {
            let widened = column.cast(&DataType::Datetime(TimeUnit::Microseconds, None))?;
            df.with_column(widened)?;
        }
        _ => {
            let parsed = parse_timestamp_column(&column)?;
            let invalid = parsed.null_count();
            if invalid > 0 {
                warn!(invalid, "unparseable purchase timestamps coerced to null");
                notices.push(Notice::warning(format!(
                    "{} value(s) in '{}' are not valid timestamps and were ignored.",
                    invalid, PURCHASE_TIMESTAMP
                )));
            }
            df.with_column(parsed)?;
        }
    }

    let df = df
        .lazy()
        .with_column(
            col(PURCHASE_TIMESTAMP)
                .dt()
                .month()
                .cast(DataType::Int32)
                .alias(PURCHASE_MONTH),
        )
        .collect()?;

    Ok(Prepared { df, notices })
}

fn parse_timestamp_column(column: &Column) -> DashboardResult<Series> {
    let strings = column.cast(&DataType::String)?;
    let micros: Int64Chunked = strings
        .str()?
        .into_iter()
        .map(|value| {
            value
                .and_then(parse_timestamp)
                .map(|dt| dt.and_utc().timestamp_micros())
        })
        .collect();
    Ok(micros
        .with_name(PURCHASE_TIMESTAMP.into())
        .into_datetime(TimeUnit::Microseconds, None)
        .into_series())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn months(df: &DataFrame) -> Vec<Option<i32>> {
        df.column(PURCHASE_MONTH)
            .unwrap()
            .i32()
            .unwrap()
            .into_iter()
            .collect()
    }

    #[test]
    fn parses_common_formats() {
        let expected = NaiveDate::from_ymd_opt(2017, 10, 2)
            .unwrap()
            .and_hms_opt(10, 56, 33)
            .unwrap();
        assert_eq!(parse_timestamp("2017-10-02 10:56:33"), Some(expected));
        assert_eq!(parse_timestamp("2017-10-02T10:56:33"), Some(expected));
        assert_eq!(parse_timestamp(" 2017-10-02 10:56:33.000 "), Some(expected));
        assert_eq!(parse_timestamp("2017-10-02T12:56:33+02:00"), Some(expected));
        assert_eq!(
            parse_timestamp("2017-10-02"),
            NaiveDate::from_ymd_opt(2017, 10, 2).unwrap().and_hms_opt(0, 0, 0)
        );
        assert_eq!(parse_timestamp("not-a-date"), None);
        assert_eq!(parse_timestamp(""), None);
    }

    #[test]
    fn derives_month_and_warns_once() {
        let df = df!(
            PURCHASE_TIMESTAMP => &["2018-01-15 08:00:00", "not-a-date", "2018-07-04 23:59:59"]
        )
        .unwrap();
        let prepared = prepare(df).unwrap();
        assert_eq!(months(&prepared.df), vec![Some(1), None, Some(7)]);
        assert_eq!(prepared.notices.len(), 1);
        assert!(!prepared.notices[0].is_error());
        assert!(matches!(
            prepared.df.column(PURCHASE_TIMESTAMP).unwrap().dtype(),
            DataType::Datetime(TimeUnit::Microseconds, None)
        ));
    }

    #[test]
    fn clean_data_has_no_notices() {
        let df = df!(PURCHASE_TIMESTAMP => &["2018-03-01 00:00:00"]).unwrap();
        let prepared = prepare(df).unwrap();
        assert!(prepared.notices.is_empty());
        assert_eq!(months(&prepared.df), vec![Some(3)]);
    }

    #[test]
    fn prepare_is_idempotent() {
        let df = df!(
            PURCHASE_TIMESTAMP => &["2018-01-15 08:00:00", "bad", "2017-12-31 23:59:59"]
        )
        .unwrap();
        let once = prepare(df).unwrap();
        let twice = prepare(once.df.clone()).unwrap();
        assert_eq!(months(&once.df), months(&twice.df));
        assert_eq!(once.df.height(), twice.df.height());
    }

    #[test]
    fn missing_timestamp_column_returns_frame_unmodified() {
        let df = df!("product_id" => &["A", "B"]).unwrap();
        let prepared = prepare(df.clone()).unwrap();
        assert!(!prepared.has_timestamps());
        assert!(prepared.df.equals(&df));
        assert_eq!(prepared.notices.len(), 1);
        assert!(prepared.notices[0].is_error());
        assert!(prepared.notices[0].message.contains(PURCHASE_TIMESTAMP));
    }
}
