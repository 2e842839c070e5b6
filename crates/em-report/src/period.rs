//! Reporting period extraction from file names.
//!
//! Operators name their exports after the period they cover, e.g.
//! `10.27.25_11.2.25.csv` or `05-09-2024_report.csv`. A date token is
//! `D[.-]D[.-]Y` with 1-2 digit month and day and a 2 or 4 digit year; a range is
//! two tokens joined by exactly one underscore.
//!
//! Extraction never fails. Anything it cannot read becomes an absent bound.

use crate::types::{DateOrder, Period};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

// Filename patterns - compiled once at startup
static RANGE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{1,2})[.\-](\d{1,2})[.\-](\d{4}|\d{2})_(\d{1,2})[.\-](\d{1,2})[.\-](\d{4}|\d{2})")
        .expect("Invalid regex: date range")
});

static SINGLE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{1,2})[.\-](\d{1,2})[.\-](\d{4}|\d{2})").expect("Invalid regex: single date")
});

/// Extract the reporting period from a file name, reading tokens month-first.
pub fn extract_period(file_name: &str) -> Period {
    extract_period_with(file_name, DateOrder::MonthFirst)
}

/// Extract the reporting period from a file name.
///
/// A range yields `(from, to)`, a single token yields `(date, None)` and no token
/// yields an empty period. Only the first match is considered.
pub fn extract_period_with(file_name: &str, order: DateOrder) -> Period {
    let base = strip_csv_suffix(file_name);

    if let Some(caps) = RANGE_PATTERN.captures(base) {
        return Period::new(
            token_date(&caps, 1, order),
            token_date(&caps, 4, order),
        );
    }

    if let Some(caps) = SINGLE_PATTERN.captures(base) {
        return Period::new(token_date(&caps, 1, order), None);
    }

    Period::empty()
}

fn strip_csv_suffix(file_name: &str) -> &str {
    let split = file_name.len().saturating_sub(4);
    match file_name.get(split..) {
        Some(suffix) if suffix.eq_ignore_ascii_case(".csv") => &file_name[..split],
        _ => file_name,
    }
}

/// Build the date whose three groups start at capture index `first`.
fn token_date(caps: &Captures, first: usize, order: DateOrder) -> Option<NaiveDate> {
    let a: u32 = caps.get(first)?.as_str().parse().ok()?;
    let b: u32 = caps.get(first + 1)?.as_str().parse().ok()?;
    let year = normalize_year(caps.get(first + 2)?.as_str())?;

    let (month, day) = match order {
        DateOrder::MonthFirst => (a, b),
        DateOrder::DayFirst => (b, a),
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Two-digit years land in 2000-2099; four-digit years are kept.
fn normalize_year(raw: &str) -> Option<i32> {
    let value: i32 = raw.parse().ok()?;
    Some(if raw.len() == 4 { value } else { 2000 + value })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn test_range_two_digit_years() {
        let period = extract_period("10.27.25_11.2.25.csv");
        assert_eq!(period, Period::new(date(2025, 10, 27), date(2025, 11, 2)));
    }

    #[test]
    fn test_range_four_digit_years_with_dashes() {
        let period = extract_period("01-01-2025_01-15-2025.csv");
        assert_eq!(period, Period::new(date(2025, 1, 1), date(2025, 1, 15)));
    }

    #[test]
    fn test_range_embedded_in_longer_name() {
        let period = extract_period("EM Detail 10.01.25_10.07.25 final.CSV");
        assert_eq!(period, Period::new(date(2025, 10, 1), date(2025, 10, 7)));
    }

    #[test]
    fn test_single_date() {
        let period = extract_period("05-09-2024_report.csv");
        assert_eq!(period, Period::new(date(2024, 5, 9), None));
    }

    #[test]
    fn test_single_date_is_idempotent() {
        let first = extract_period("05-09-2024_report.csv");
        let second = extract_period("05-09-2024_report.csv");
        assert_eq!(first, second);
    }

    #[test]
    fn test_double_underscore_is_not_a_range() {
        let period = extract_period("10.01.25__10.07.25.csv");
        assert_eq!(period, Period::new(date(2025, 10, 1), None));
    }

    #[test]
    fn test_no_date() {
        assert_eq!(extract_period("summary.csv"), Period::empty());
        assert_eq!(extract_period(""), Period::empty());
        assert_eq!(extract_period("csv"), Period::empty());
    }

    #[test]
    fn test_invalid_month_resolves_to_absent() {
        let period = extract_period("13.01.25_11.02.25.csv");
        assert_eq!(period, Period::new(None, date(2025, 11, 2)));

        assert_eq!(extract_period("02.30.2024.csv"), Period::empty());
    }

    #[test]
    fn test_day_first_order() {
        let period = extract_period_with("27.10.25_02.11.25.csv", DateOrder::DayFirst);
        assert_eq!(period, Period::new(date(2025, 10, 27), date(2025, 11, 2)));
    }

    #[test]
    fn test_suffix_is_stripped_case_insensitively() {
        assert_eq!(strip_csv_suffix("a.CsV"), "a");
        assert_eq!(strip_csv_suffix("a.txt"), "a.txt");
        assert_eq!(strip_csv_suffix("é.csv"), "é");
    }

    #[test]
    fn test_normalize_year() {
        assert_eq!(normalize_year("25"), Some(2025));
        assert_eq!(normalize_year("2025"), Some(2025));
        assert_eq!(normalize_year("99"), Some(2099));
    }
}
