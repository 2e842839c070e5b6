//! Worksheet column width heuristics, in Excel character units.

use crate::utils::{EXPORT_DATE_COLUMNS, MONTH_COLUMN, cell_text};
use polars::prelude::*;

const MIN_WIDTH: f64 = 10.0;
const MAX_WIDTH: f64 = 60.0;
const PADDING: f64 = 2.0;
/// Fits `mm/dd/yy` with room to spare.
pub const DATE_COLUMN_WIDTH: f64 = 12.0;
/// Fits `Oct`.
pub const MONTH_COLUMN_WIDTH: f64 = 8.0;

/// Width for one column.
///
/// Date columns get a fixed width and `Month` a compact one. Other columns use the
/// longest of the header and the first `sample_rows` values, plus padding, clamped
/// to `[10, 60]`.
pub fn column_width(df: &DataFrame, name: &str, sample_rows: usize) -> f64 {
    if name == MONTH_COLUMN {
        return MONTH_COLUMN_WIDTH;
    }
    if EXPORT_DATE_COLUMNS.contains(&name) {
        return DATE_COLUMN_WIDTH;
    }

    let content_max_len = match df.column(name) {
        Ok(column) => (0..sample_rows.min(column.len()))
            .filter_map(|i| column.get(i).ok())
            .filter_map(|value| cell_text(&value))
            .map(|text| text.chars().count())
            .max()
            .unwrap_or(0),
        Err(_) => 0,
    };

    let max_chars = name.chars().count().max(content_max_len);
    (max_chars as f64 + PADDING).clamp(MIN_WIDTH, MAX_WIDTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_values_get_minimum() {
        let df = df!["ID" => ["1", "2"]].unwrap();
        assert_eq!(column_width(&df, "ID", 1000), 10.0);
    }

    #[test]
    fn test_long_values_are_clamped() {
        let long = "x".repeat(200);
        let df = df!["Notes" => [long.as_str()]].unwrap();
        assert_eq!(column_width(&df, "Notes", 1000), 60.0);
    }

    #[test]
    fn test_width_follows_longest_value() {
        let df = df!["SCO" => ["AGNEW; JACQUELINE", "POST; TODD"]].unwrap();
        assert_eq!(column_width(&df, "SCO", 1000), 19.0);
    }

    #[test]
    fn test_header_counts() {
        let df = df!["Amendment Reason Description" => ["a"]].unwrap();
        assert_eq!(column_width(&df, "Amendment Reason Description", 1000), 30.0);
    }

    #[test]
    fn test_only_sampled_rows_count() {
        let long = "y".repeat(40);
        let df = df!["Comment" => ["short", long.as_str()]].unwrap();
        assert_eq!(column_width(&df, "Comment", 1), 10.0);
        assert_eq!(column_width(&df, "Comment", 2), 42.0);
    }

    #[test]
    fn test_fixed_widths_for_dates_and_month() {
        let df = df!["Begin Date" => ["10/01/2025"], "Month" => ["x"]].unwrap();
        assert_eq!(column_width(&df, "Begin Date", 1000), DATE_COLUMN_WIDTH);
        assert_eq!(column_width(&df, "From", 1000), DATE_COLUMN_WIDTH);
        assert_eq!(column_width(&df, "Month", 1000), MONTH_COLUMN_WIDTH);
    }
}
