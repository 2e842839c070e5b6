//! Shared column names and helpers for the ingestion pipeline.
//!
//! Column names are part of the output contract: the presentation shell and the
//! exported workbook both rely on them verbatim.

use chrono::{Datelike, NaiveDate};
use polars::prelude::*;

// =============================================================================
// Column Names
// =============================================================================

/// Reporting year, taken from the period's from-date.
pub const YEAR_COLUMN: &str = "Year";
/// Reporting month, stored as the full from-date and displayed as `mmm`.
pub const MONTH_COLUMN: &str = "Month";
pub const FROM_COLUMN: &str = "From";
pub const TO_COLUMN: &str = "To";
/// Raw operator label as exported, e.g. `AGNEW; JACQUELINE`.
pub const OPERATOR_COLUMN: &str = "SCO";
/// Canonical operator display name. Empty when the raw label is unmapped.
pub const OPERATOR_CODE_COLUMN: &str = "SCO2";
/// Name of the file a row came from.
pub const SOURCE_FILE_COLUMN: &str = "_source_file";
pub const FACILITY_CODE_COLUMN: &str = "Facility Code";
pub const BEGIN_DATE_COLUMN: &str = "Begin Date";
pub const END_DATE_COLUMN: &str = "End Date";
pub const SUBMISSION_DATE_COLUMN: &str = "Submission Date";
pub const AMENDMENT_EFFECTIVE_DATE_COLUMN: &str = "Amendment Effective Date";

/// Source columns coerced to dates by exact name.
pub const COERCED_DATE_COLUMNS: [&str; 4] = [
    BEGIN_DATE_COLUMN,
    END_DATE_COLUMN,
    SUBMISSION_DATE_COLUMN,
    AMENDMENT_EFFECTIVE_DATE_COLUMN,
];

/// Columns written as `mm/dd/yy` date cells on export.
pub const EXPORT_DATE_COLUMNS: [&str; 6] = [
    FROM_COLUMN,
    TO_COLUMN,
    BEGIN_DATE_COLUMN,
    END_DATE_COLUMN,
    SUBMISSION_DATE_COLUMN,
    AMENDMENT_EFFECTIVE_DATE_COLUMN,
];

/// Columns shown for rows whose operator failed to map.
pub const REVIEW_COLUMNS: [&str; 4] = [
    OPERATOR_COLUMN,
    FACILITY_CODE_COLUMN,
    BEGIN_DATE_COLUMN,
    END_DATE_COLUMN,
];

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

// =============================================================================
// Date Utilities
// =============================================================================

/// Days between 0001-01-01 and 1970-01-01; polars stores dates as days since the epoch.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Convert a calendar date to polars' physical `Date` representation.
#[inline]
pub fn date_to_days(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

/// Convert polars' physical `Date` representation back to a calendar date.
#[inline]
pub fn days_to_date(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days.checked_add(UNIX_EPOCH_DAYS_FROM_CE)?)
}

/// Build a `Date` series from optional calendar dates.
pub fn date_series(name: &str, dates: &[Option<NaiveDate>]) -> PolarsResult<Series> {
    let days: Vec<Option<i32>> = dates.iter().map(|d| d.map(date_to_days)).collect();
    Series::new(name.into(), days).cast(&DataType::Date)
}

/// Read a calendar date out of a cell, if it holds one.
pub fn cell_date(value: &AnyValue) -> Option<NaiveDate> {
    match value {
        AnyValue::Date(days) => days_to_date(*days),
        _ => None,
    }
}

/// Render a cell the way it is shown to users: strings unquoted, dates as ISO,
/// nulls as `None`.
pub fn cell_text(value: &AnyValue) -> Option<String> {
    match value {
        AnyValue::Null => None,
        AnyValue::String(s) => Some((*s).to_string()),
        AnyValue::StringOwned(s) => Some(s.to_string()),
        AnyValue::Date(days) => days_to_date(*days).map(|d| d.format("%Y-%m-%d").to_string()),
        other => Some(other.to_string()),
    }
}
