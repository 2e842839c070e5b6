//! XLSX workbook export.

use super::widths::column_width;
use crate::config::{CompilerConfig, DEFAULT_WIDTH_SAMPLE_ROWS};
use crate::error::{ReportError, Result, ResultExt};
use crate::transform::parse_date_value;
use crate::types::{DateOrder, ReportKind};
use crate::utils::{
    EXPORT_DATE_COLUMNS, MONTH_COLUMN, cell_text, date_to_days, days_to_date, is_numeric_dtype,
};
use chrono::{Local, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Rows per worksheet, header included.
const MAX_SHEET_ROWS: usize = 1_048_576;
const MAX_SHEET_COLUMNS: usize = 16_384;

/// Days from Excel's day zero (1899-12-30) to the Unix epoch.
const EXCEL_EPOCH_OFFSET: i32 = 25_569;

const DATE_NUM_FORMAT: &str = "mm/dd/yy";
const MONTH_NUM_FORMAT: &str = "mmm";

/// An exported workbook.
#[derive(Debug, Clone, Serialize)]
pub struct ExportArtifact {
    /// Suggested file name, e.g. `unified_20251103_0915.xlsx`.
    pub file_name: String,
    #[serde(skip)]
    pub bytes: Vec<u8>,
    /// Where the workbook was saved, when persistence is enabled and succeeded.
    pub persisted_to: Option<PathBuf>,
}

struct SheetFormats {
    header: Format,
    date: Format,
    month: Format,
}

impl SheetFormats {
    fn new() -> Self {
        Self {
            header: Format::new().set_bold(),
            date: Format::new().set_num_format(DATE_NUM_FORMAT),
            month: Format::new().set_num_format(MONTH_NUM_FORMAT),
        }
    }
}

/// Writes unified tables to a workbook, one worksheet per report kind.
#[derive(Debug, Clone)]
pub struct WorkbookExporter {
    output_dir: PathBuf,
    file_prefix: String,
    save_to_disk: bool,
    width_sample_rows: usize,
    date_order: DateOrder,
}

impl WorkbookExporter {
    /// Exporter persisting to `output_dir` with the given file name prefix.
    pub fn new(output_dir: impl Into<PathBuf>, file_prefix: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            file_prefix: file_prefix.into(),
            save_to_disk: true,
            width_sample_rows: DEFAULT_WIDTH_SAMPLE_ROWS,
            date_order: DateOrder::default(),
        }
    }

    pub fn from_config(config: &CompilerConfig) -> Self {
        Self {
            output_dir: config.output_dir.clone(),
            file_prefix: config.file_prefix.clone(),
            save_to_disk: config.save_to_disk,
            width_sample_rows: config.width_sample_rows,
            date_order: config.date_order,
        }
    }

    /// Only build the workbook in memory.
    pub fn in_memory(mut self) -> Self {
        self.save_to_disk = false;
        self
    }

    /// Export under a timestamped file name.
    pub fn export(&self, sheets: &[(ReportKind, &DataFrame)]) -> Result<ExportArtifact> {
        let file_name = suggested_file_name_at(&self.file_prefix, Local::now().naive_local());
        self.export_as(sheets, &file_name)
    }

    /// Export under a caller-supplied file name.
    ///
    /// Persistence is best-effort: a failed write is logged and the in-memory
    /// workbook is still returned.
    pub fn export_as(
        &self,
        sheets: &[(ReportKind, &DataFrame)],
        file_name: &str,
    ) -> Result<ExportArtifact> {
        let bytes = self.render(sheets)?;
        info!(
            "Built workbook '{}' ({} sheet(s), {} bytes)",
            file_name,
            sheets.len(),
            bytes.len()
        );

        let persisted_to = if self.save_to_disk {
            match persist(&self.output_dir, file_name, &bytes) {
                Ok(path) => {
                    info!("Workbook saved: {}", path.display());
                    Some(path)
                }
                Err(e) => {
                    warn!(
                        "Could not save workbook to '{}': {}",
                        self.output_dir.display(),
                        e
                    );
                    None
                }
            }
        } else {
            None
        };

        Ok(ExportArtifact {
            file_name: file_name.to_string(),
            bytes,
            persisted_to,
        })
    }

    /// Build the workbook bytes.
    pub fn render(&self, sheets: &[(ReportKind, &DataFrame)]) -> Result<Vec<u8>> {
        if sheets.is_empty() {
            return Err(ReportError::EmptyBatch);
        }

        let mut seen = HashSet::new();
        for (kind, _) in sheets {
            if !seen.insert(*kind) {
                return Err(ReportError::Export(format!(
                    "more than one '{}' sheet supplied",
                    kind.sheet_name()
                )));
            }
        }

        let formats = SheetFormats::new();
        let mut workbook = Workbook::new();
        for (kind, df) in sheets {
            self.write_sheet(&mut workbook, *kind, df, &formats)
                .context(format!("Writing sheet '{}'", kind.sheet_name()))?;
        }

        Ok(workbook.save_to_buffer()?)
    }

    fn write_sheet(
        &self,
        workbook: &mut Workbook,
        kind: ReportKind,
        df: &DataFrame,
        formats: &SheetFormats,
    ) -> Result<()> {
        if df.height() + 1 > MAX_SHEET_ROWS || df.width() > MAX_SHEET_COLUMNS {
            return Err(ReportError::Export(format!(
                "{} rows x {} columns does not fit in a worksheet",
                df.height(),
                df.width()
            )));
        }

        let sheet = workbook.add_worksheet();
        sheet.set_name(kind.sheet_name())?;

        for (index, column) in df.get_columns().iter().enumerate() {
            let col = index as u16;
            let name = column.name().as_str();

            sheet.write_string_with_format(0, col, name, &formats.header)?;
            sheet.set_column_width(col, column_width(df, name, self.width_sample_rows))?;

            let date_format = if name == MONTH_COLUMN {
                Some(&formats.month)
            } else if EXPORT_DATE_COLUMNS.contains(&name) {
                Some(&formats.date)
            } else {
                None
            };

            for row in 0..df.height() {
                let value = column.get(row)?;
                self.write_cell(sheet, row as u32 + 1, col, &value, date_format, formats)?;
            }
        }

        debug!(
            "Sheet '{}': {} rows, {} columns",
            kind.sheet_name(),
            df.height(),
            df.width()
        );
        Ok(())
    }

    fn write_cell(
        &self,
        sheet: &mut Worksheet,
        row: u32,
        col: u16,
        value: &AnyValue,
        date_format: Option<&Format>,
        formats: &SheetFormats,
    ) -> Result<()> {
        match value {
            AnyValue::Null => {}
            AnyValue::Date(days) => {
                if let Some(date) = days_to_date(*days) {
                    let format = date_format.unwrap_or(&formats.date);
                    sheet.write_number_with_format(row, col, excel_serial(date), format)?;
                }
            }
            AnyValue::Boolean(b) => {
                sheet.write_boolean(row, col, *b)?;
            }
            v if is_numeric_dtype(&v.dtype()) => {
                if let Some(number) = v.extract::<f64>() {
                    sheet.write_number(row, col, number)?;
                }
            }
            other => {
                let Some(text) = cell_text(other) else {
                    return Ok(());
                };
                // Date columns that ended up as text after unification
                match date_format.and_then(|f| {
                    parse_date_value(&text, self.date_order, None).map(|d| (d, f))
                }) {
                    Some((date, format)) => {
                        sheet.write_number_with_format(row, col, excel_serial(date), format)?;
                    }
                    None => {
                        sheet.write_string(row, col, &text)?;
                    }
                }
            }
        }
        Ok(())
    }
}

/// Suggested workbook file name: `<prefix>_<YYYYMMDD_HHMM>.xlsx`.
pub fn suggested_file_name_at(prefix: &str, at: NaiveDateTime) -> String {
    format!("{}_{}.xlsx", prefix, at.format("%Y%m%d_%H%M"))
}

/// Excel serial day number for a calendar date.
fn excel_serial(date: NaiveDate) -> f64 {
    f64::from(date_to_days(date) + EXCEL_EPOCH_OFFSET)
}

/// Write `bytes` under `dir`, never replacing an existing file.
fn persist(dir: &Path, file_name: &str, bytes: &[u8]) -> io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = available_path(dir, file_name);
    fs::write(&path, bytes)?;
    Ok(path)
}

/// `dir/file_name`, or `dir/<stem>_2.<ext>`, `_3`... if taken.
fn available_path(dir: &Path, file_name: &str) -> PathBuf {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }

    let (stem, extension) = match file_name.rsplit_once('.') {
        Some((stem, ext)) => (stem, format!(".{ext}")),
        None => (file_name, String::new()),
    };

    (2..)
        .map(|n| dir.join(format!("{stem}_{n}{extension}")))
        .find(|path| !path.exists())
        .unwrap_or(candidate)
}
