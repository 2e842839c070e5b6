//! Date coercion for the fixed set of named date columns.
//!
//! Only columns named in [`COERCED_DATE_COLUMNS`] are touched. Values that do not
//! parse become null; the number of such cells is reported back.

use crate::error::Result;
use crate::types::DateOrder;
use crate::utils::{COERCED_DATE_COLUMNS, date_series};
use chrono::NaiveDate;
use polars::prelude::*;
use tracing::debug;

/// Formats independent of day/month order.
const UNAMBIGUOUS_FORMATS: [&str; 8] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y%m%d",
    "%d-%b-%y",
    "%d-%b-%Y",
    "%d %b %Y",
    "%b %d, %Y",
    "%B %d, %Y",
];

// Two-digit years are tried first: `%Y` would happily read `25` as year 25.
const MONTH_FIRST_FORMATS: [&str; 6] = [
    "%m/%d/%y", "%m/%d/%Y", "%m-%d-%y", "%m-%d-%Y", "%m.%d.%y", "%m.%d.%Y",
];

const DAY_FIRST_FORMATS: [&str; 6] = [
    "%d/%m/%y", "%d/%m/%Y", "%d-%m-%y", "%d-%m-%Y", "%d.%m.%y", "%d.%m.%Y",
];

/// Parse a single cell into a calendar date.
///
/// An explicit `hint` is tried first, then numeric layouts in the given order,
/// then ISO and named-month layouts. A trailing time part is ignored.
pub fn parse_date_value(value: &str, order: DateOrder, hint: Option<&str>) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    parse_with_formats(value, order, hint).or_else(|| {
        // "10/27/2025 12:00:00 AM", "2025-10-27T08:30:00"
        let date_part = value
            .split(|c: char| c.is_whitespace() || c == 'T')
            .next()
            .filter(|part| part.len() < value.len())?;
        parse_with_formats(date_part, order, hint)
    })
}

fn parse_with_formats(value: &str, order: DateOrder, hint: Option<&str>) -> Option<NaiveDate> {
    let ordered: &[&str] = match order {
        DateOrder::MonthFirst => &MONTH_FIRST_FORMATS,
        DateOrder::DayFirst => &DAY_FIRST_FORMATS,
    };

    // Numeric layouts go before ISO so `10/12/25` is not read as year 10.
    hint.into_iter()
        .chain(ordered.iter().copied())
        .chain(UNAMBIGUOUS_FORMATS.iter().copied())
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
}

/// Converts the named date columns of a table to `Date`.
#[derive(Debug, Clone, Default)]
pub struct DateCoercer {
    order: DateOrder,
    format_hint: Option<String>,
}

impl DateCoercer {
    pub fn new(order: DateOrder, format_hint: Option<String>) -> Self {
        Self { order, format_hint }
    }

    /// Coerce every named date column present in `df`.
    ///
    /// Returns the table and the number of non-empty cells that failed to parse.
    pub fn coerce(&self, mut df: DataFrame) -> Result<(DataFrame, usize)> {
        let mut failures = 0;

        for name in COERCED_DATE_COLUMNS {
            let Ok(column) = df.column(name) else {
                continue;
            };
            if column.dtype() == &DataType::Date {
                continue;
            }

            let text = column.as_materialized_series().cast(&DataType::String)?;
            let mut dates = Vec::with_capacity(text.len());
            let mut column_failures = 0;

            for value in text.str()?.into_iter() {
                let parsed = value.and_then(|v| parse_date_value(v, self.order, self.hint()));
                if parsed.is_none() && value.is_some_and(|v| !v.trim().is_empty()) {
                    column_failures += 1;
                }
                dates.push(parsed);
            }

            if column_failures > 0 {
                debug!(
                    "Column '{}': {} value(s) could not be read as dates",
                    name, column_failures
                );
            }
            failures += column_failures;
            df.replace(name, date_series(name, &dates)?)?;
        }

        Ok((df, failures))
    }

    fn hint(&self) -> Option<&str> {
        self.format_hint.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::cell_date;

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn test_parse_common_layouts() {
        let mf = DateOrder::MonthFirst;
        assert_eq!(parse_date_value("10/27/2025", mf, None), date(2025, 10, 27));
        assert_eq!(parse_date_value("10/27/25", mf, None), date(2025, 10, 27));
        assert_eq!(parse_date_value("1/5/2025", mf, None), date(2025, 1, 5));
        assert_eq!(parse_date_value("2025-10-27", mf, None), date(2025, 10, 27));
        assert_eq!(parse_date_value("27-Oct-2025", mf, None), date(2025, 10, 27));
        assert_eq!(parse_date_value("Oct 27, 2025", mf, None), date(2025, 10, 27));
    }

    #[test]
    fn test_parse_ignores_time_part() {
        let mf = DateOrder::MonthFirst;
        assert_eq!(
            parse_date_value("10/27/2025 12:00:00 AM", mf, None),
            date(2025, 10, 27)
        );
        assert_eq!(
            parse_date_value("2025-10-27T08:30:00", mf, None),
            date(2025, 10, 27)
        );
    }

    #[test]
    fn test_day_first_and_hint() {
        assert_eq!(
            parse_date_value("05/09/2024", DateOrder::DayFirst, None),
            date(2024, 9, 5)
        );
        assert_eq!(
            parse_date_value("05/09/2024", DateOrder::MonthFirst, None),
            date(2024, 5, 9)
        );
        assert_eq!(
            parse_date_value("2024|05|09", DateOrder::MonthFirst, Some("%Y|%m|%d")),
            date(2024, 5, 9)
        );
    }

    #[test]
    fn test_parse_failures() {
        let mf = DateOrder::MonthFirst;
        assert_eq!(parse_date_value("", mf, None), None);
        assert_eq!(parse_date_value("pending", mf, None), None);
        assert_eq!(parse_date_value("13/45/2025", mf, None), None);
        assert_eq!(parse_date_value("10/12/25", mf, None), date(2025, 10, 12));
    }

    #[test]
    fn test_coerce_only_named_columns() {
        let df = df![
            "Begin Date" => [Some("10/01/2025"), Some("garbage"), None],
            "Other Date" => ["10/01/2025", "10/02/2025", "10/03/2025"],
        ]
        .unwrap();

        let (df, failures) = DateCoercer::default().coerce(df).unwrap();

        assert_eq!(failures, 1);
        assert_eq!(df.column("Begin Date").unwrap().dtype(), &DataType::Date);
        assert_eq!(df.column("Begin Date").unwrap().null_count(), 2);
        assert_eq!(df.column("Other Date").unwrap().dtype(), &DataType::String);
    }

    #[test]
    fn test_round_trip_mixed_layouts() {
        let df = df![
            "Begin Date" => ["10/27/2025", "2025-10-27"],
            "End Date" => ["2025-11-02", "11/02/2025"],
        ]
        .unwrap();

        let (df, failures) = DateCoercer::default().coerce(df).unwrap();
        assert_eq!(failures, 0);

        for (name, expected) in [("Begin Date", "10/27/2025"), ("End Date", "11/02/2025")] {
            let column = df.column(name).unwrap();
            for row in 0..2 {
                let shown = cell_date(&column.get(row).unwrap())
                    .map(|d| d.format("%m/%d/%Y").to_string());
                assert_eq!(shown.as_deref(), Some(expected));
            }
        }
    }

    #[test]
    fn test_coerce_is_noop_without_date_columns() {
        let df = df!["SCO" => ["POST; TODD"]].unwrap();
        let (out, failures) = DateCoercer::default().coerce(df.clone()).unwrap();
        assert_eq!(failures, 0);
        assert!(out.equals(&df));
    }
}
