use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reporting period covered by one file: an inclusive (from, to) pair.
///
/// Either bound may be absent. A period is derived from a file name and falls back,
/// bound by bound, to a caller-supplied default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Period {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl Period {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        Self { from, to }
    }

    /// A period with both bounds set.
    pub fn between(from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
        }
    }

    /// A period with neither bound set.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    /// Fill each missing bound from `fallback`.
    pub fn or(self, fallback: Period) -> Period {
        Period {
            from: self.from.or(fallback.from),
            to: self.to.or(fallback.to),
        }
    }

    /// Calendar year of the from-date.
    pub fn year(&self) -> Option<i32> {
        self.from.map(|d| d.year())
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |d: Option<NaiveDate>| {
            d.map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "-".to_string())
        };
        write!(f, "{} .. {}", show(self.from), show(self.to))
    }
}

/// How ambiguous numeric dates such as `05/09/2024` are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateOrder {
    /// `MM/DD/YYYY`, the layout operators export.
    #[default]
    MonthFirst,
    /// `DD/MM/YYYY`
    DayFirst,
}

/// The two report variants operators export. Each becomes one worksheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    /// One row per case or record.
    Detail,
    /// Aggregate rows for the period.
    Summary,
}

impl ReportKind {
    /// Worksheet name used on export.
    pub fn sheet_name(&self) -> &'static str {
        match self {
            Self::Detail => "Detail",
            Self::Summary => "Summary",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sheet_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_period_or_fills_each_bound() {
        let fallback = Period::between(date(2025, 1, 1), date(2025, 1, 31));

        let only_from = Period::new(Some(date(2025, 10, 27)), None);
        assert_eq!(
            only_from.or(fallback),
            Period::between(date(2025, 10, 27), date(2025, 1, 31))
        );

        assert_eq!(Period::empty().or(fallback), fallback);
    }

    #[test]
    fn test_period_year() {
        assert_eq!(Period::between(date(2024, 5, 9), date(2024, 6, 1)).year(), Some(2024));
        assert_eq!(Period::new(None, Some(date(2024, 6, 1))).year(), None);
    }

    #[test]
    fn test_period_display() {
        let p = Period::new(Some(date(2025, 10, 27)), None);
        assert_eq!(p.to_string(), "2025-10-27 .. -");
    }

    #[test]
    fn test_report_kind_serialization() {
        assert_eq!(serde_json::to_string(&ReportKind::Summary).unwrap(), "\"summary\"");
        assert_eq!(ReportKind::Detail.sheet_name(), "Detail");
    }
}
