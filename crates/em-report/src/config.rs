//! Configuration types for the report compiler.
//!
//! This module provides configuration options using the builder pattern
//! for flexible and ergonomic compiler setup.

use crate::types::{DateOrder, Period};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default bound on the number of files in one batch.
pub const DEFAULT_MAX_FILES: usize = 100;
/// Default bound on the number of columns kept per file.
pub const DEFAULT_MAX_COLUMNS: usize = 40;
/// Default number of bytes sampled for delimiter sniffing.
pub const DEFAULT_SNIFF_SAMPLE_BYTES: usize = 32 * 1024;
/// Default number of rows sampled when sizing worksheet columns.
pub const DEFAULT_WIDTH_SAMPLE_ROWS: usize = 1000;

/// Configuration for the report compiler.
///
/// Use [`CompilerConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use em_report::config::CompilerConfig;
///
/// let config = CompilerConfig::builder()
///     .max_files(50)
///     .output_dir("exports")
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Maximum number of files processed per batch. Extra files are ignored.
    /// Default: 100
    pub max_files: usize,

    /// Maximum number of header columns kept per file, by position.
    /// Default: 40
    pub max_columns: usize,

    /// Bytes of decoded text sampled for delimiter sniffing.
    /// Default: 32768
    pub sniff_sample_bytes: usize,

    /// Period used for any bound a file name does not provide.
    /// Default: None
    pub default_period: Option<Period>,

    /// How ambiguous numeric dates are read, in file names and date columns.
    /// Default: MonthFirst
    pub date_order: DateOrder,

    /// Explicit chrono format tried before the built-in date formats.
    /// Default: None
    pub date_format_hint: Option<String>,

    /// Directory exported workbooks are persisted to.
    /// Default: "exports"
    pub output_dir: PathBuf,

    /// Prefix of the suggested workbook file name.
    /// Default: "unified"
    pub file_prefix: String,

    /// Whether to persist exported workbooks to `output_dir`.
    /// Persistence is best-effort; the in-memory workbook is always returned.
    /// Default: true
    pub save_to_disk: bool,

    /// Rows sampled per column when computing worksheet column widths.
    /// Default: 1000
    pub width_sample_rows: usize,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            max_files: DEFAULT_MAX_FILES,
            max_columns: DEFAULT_MAX_COLUMNS,
            sniff_sample_bytes: DEFAULT_SNIFF_SAMPLE_BYTES,
            default_period: None,
            date_order: DateOrder::default(),
            date_format_hint: None,
            output_dir: PathBuf::from("exports"),
            file_prefix: "unified".to_string(),
            save_to_disk: true,
            width_sample_rows: DEFAULT_WIDTH_SAMPLE_ROWS,
        }
    }
}

impl CompilerConfig {
    /// Create a new configuration builder.
    pub fn builder() -> CompilerConfigBuilder {
        CompilerConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let limits = [
            ("max_files", self.max_files),
            ("max_columns", self.max_columns),
            ("sniff_sample_bytes", self.sniff_sample_bytes),
            ("width_sample_rows", self.width_sample_rows),
        ];
        for (field, value) in limits {
            if value == 0 {
                return Err(ConfigValidationError::ZeroLimit(field.to_string()));
            }
        }

        if self.file_prefix.trim().is_empty() {
            return Err(ConfigValidationError::EmptyFilePrefix);
        }

        if let Some(Period {
            from: Some(from),
            to: Some(to),
        }) = self.default_period
            && from > to
        {
            return Err(ConfigValidationError::InvertedPeriod {
                from: from.to_string(),
                to: to.to_string(),
            });
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid value for '{0}': must be at least 1")]
    ZeroLimit(String),

    #[error("File prefix must not be empty")]
    EmptyFilePrefix,

    #[error("Default period starts after it ends: {from} > {to}")]
    InvertedPeriod { from: String, to: String },
}

/// Builder for [`CompilerConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct CompilerConfigBuilder {
    max_files: Option<usize>,
    max_columns: Option<usize>,
    sniff_sample_bytes: Option<usize>,
    default_period: Option<Period>,
    date_order: Option<DateOrder>,
    date_format_hint: Option<String>,
    output_dir: Option<PathBuf>,
    file_prefix: Option<String>,
    save_to_disk: Option<bool>,
    width_sample_rows: Option<usize>,
}

impl CompilerConfigBuilder {
    /// Set the maximum number of files processed per batch.
    pub fn max_files(mut self, max: usize) -> Self {
        self.max_files = Some(max);
        self
    }

    /// Set the maximum number of columns kept per file.
    pub fn max_columns(mut self, max: usize) -> Self {
        self.max_columns = Some(max);
        self
    }

    /// Set the delimiter sniffing sample size in bytes.
    pub fn sniff_sample_bytes(mut self, bytes: usize) -> Self {
        self.sniff_sample_bytes = Some(bytes);
        self
    }

    /// Set the fallback period for files whose names carry no dates.
    pub fn default_period(mut self, period: Period) -> Self {
        self.default_period = Some(period);
        self
    }

    /// Set how ambiguous numeric dates are read.
    pub fn date_order(mut self, order: DateOrder) -> Self {
        self.date_order = Some(order);
        self
    }

    /// Set a chrono format string tried first when coercing date columns.
    pub fn date_format_hint(mut self, hint: impl Into<String>) -> Self {
        self.date_format_hint = Some(hint.into());
        self
    }

    /// Set the directory exported workbooks are persisted to.
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    /// Set the prefix of suggested workbook file names.
    pub fn file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.file_prefix = Some(prefix.into());
        self
    }

    /// Enable or disable persisting exported workbooks.
    ///
    /// When false, workbooks are only returned in memory.
    pub fn save_to_disk(mut self, save: bool) -> Self {
        self.save_to_disk = Some(save);
        self
    }

    /// Set the number of rows sampled when sizing columns.
    pub fn width_sample_rows(mut self, rows: usize) -> Self {
        self.width_sample_rows = Some(rows);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `CompilerConfig` or an error if validation fails.
    pub fn build(self) -> Result<CompilerConfig, ConfigValidationError> {
        let config = CompilerConfig {
            max_files: self.max_files.unwrap_or(DEFAULT_MAX_FILES),
            max_columns: self.max_columns.unwrap_or(DEFAULT_MAX_COLUMNS),
            sniff_sample_bytes: self.sniff_sample_bytes.unwrap_or(DEFAULT_SNIFF_SAMPLE_BYTES),
            default_period: self.default_period,
            date_order: self.date_order.unwrap_or_default(),
            date_format_hint: self.date_format_hint,
            output_dir: self.output_dir.unwrap_or_else(|| PathBuf::from("exports")),
            file_prefix: self.file_prefix.unwrap_or_else(|| "unified".to_string()),
            save_to_disk: self.save_to_disk.unwrap_or(true),
            width_sample_rows: self.width_sample_rows.unwrap_or(DEFAULT_WIDTH_SAMPLE_ROWS),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_default_config() {
        let config = CompilerConfig::default();
        assert_eq!(config.max_files, 100);
        assert_eq!(config.max_columns, 40);
        assert_eq!(config.sniff_sample_bytes, 32768);
        assert_eq!(config.date_order, DateOrder::MonthFirst);
        assert_eq!(config.output_dir, PathBuf::from("exports"));
        assert!(config.save_to_disk);
    }

    #[test]
    fn test_builder_defaults_match_default() {
        let config = CompilerConfig::builder().build().unwrap();
        assert_eq!(config, CompilerConfig::default());
    }

    #[test]
    fn test_builder_custom_values() {
        let from = NaiveDate::from_ymd_opt(2025, 10, 1).unwrap();
        let to = NaiveDate::from_ymd_opt(2025, 10, 31).unwrap();
        let config = CompilerConfig::builder()
            .max_files(10)
            .max_columns(12)
            .default_period(Period::between(from, to))
            .date_order(DateOrder::DayFirst)
            .file_prefix("em_detail")
            .save_to_disk(false)
            .build()
            .unwrap();

        assert_eq!(config.max_files, 10);
        assert_eq!(config.max_columns, 12);
        assert_eq!(config.default_period, Some(Period::between(from, to)));
        assert_eq!(config.date_order, DateOrder::DayFirst);
        assert_eq!(config.file_prefix, "em_detail");
        assert!(!config.save_to_disk);
    }

    #[test]
    fn test_validation_zero_limit() {
        let result = CompilerConfig::builder().max_columns(0).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::ZeroLimit(field) if field == "max_columns"
        ));
    }

    #[test]
    fn test_validation_inverted_period() {
        let from = NaiveDate::from_ymd_opt(2025, 11, 1).unwrap();
        let to = NaiveDate::from_ymd_opt(2025, 10, 1).unwrap();
        let result = CompilerConfig::builder()
            .default_period(Period::between(from, to))
            .build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvertedPeriod { .. }
        ));
    }

    #[test]
    fn test_validation_empty_prefix() {
        let result = CompilerConfig::builder().file_prefix("  ").build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::EmptyFilePrefix
        ));
    }

    #[test]
    fn test_config_from_json() {
        let json = r#"{
            "max_files": 25,
            "max_columns": 40,
            "sniff_sample_bytes": 4096,
            "default_period": { "from": "2025-10-01", "to": "2025-10-07" },
            "date_order": "month_first",
            "date_format_hint": null,
            "output_dir": "custom_exports",
            "file_prefix": "em",
            "save_to_disk": false,
            "width_sample_rows": 100
        }"#;

        let config: CompilerConfig =
            serde_json::from_str(json).expect("Should deserialize from shell JSON");

        assert_eq!(config.max_files, 25);
        assert_eq!(config.sniff_sample_bytes, 4096);
        assert_eq!(
            config.default_period.and_then(|p| p.to),
            NaiveDate::from_ymd_opt(2025, 10, 7)
        );
        assert_eq!(config.output_dir.to_str().unwrap(), "custom_exports");
        assert!(!config.save_to_disk);
        assert!(config.validate().is_ok());
    }
}
