//! Unification of per-file tables and the diagnostics that go with them.

use crate::error::Result;
use crate::ingest::{MalformedRow, TextEncoding};
use crate::types::Period;
use crate::utils::{OPERATOR_CODE_COLUMN, OPERATOR_COLUMN, REVIEW_COLUMNS, date_series};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

/// Concatenate per-file tables, preserving file order and row order within files.
///
/// Columns are unioned in first-seen order, with a column new to the batch placed
/// after its predecessor in the frame that introduced it. Missing columns are
/// filled with nulls. A column whose type differs between files is kept as text.
/// Tables without rows contribute nothing.
pub fn unify_tables(frames: Vec<DataFrame>) -> Result<DataFrame> {
    let frames: Vec<DataFrame> = frames.into_iter().filter(|df| df.height() > 0).collect();

    let mut schema: Vec<(String, DataType)> = Vec::new();
    for df in &frames {
        let mut anchor: Option<usize> = None;
        for column in df.get_columns() {
            let name = column.name().as_str();
            match schema.iter().position(|(n, _)| n == name) {
                Some(position) => {
                    let dtype = &mut schema[position].1;
                    if dtype != column.dtype() && *dtype != DataType::String {
                        debug!(
                            "Column '{}' has mixed types ({} / {}), keeping it as text",
                            name,
                            dtype,
                            column.dtype()
                        );
                        *dtype = DataType::String;
                    }
                    anchor = Some(position);
                }
                None => {
                    let position = anchor.map_or(0, |a| a + 1);
                    schema.insert(position, (name.to_string(), column.dtype().clone()));
                    anchor = Some(position);
                }
            }
        }
    }

    let mut unified: Option<DataFrame> = None;
    for df in frames {
        let height = df.height();
        let mut columns = Vec::with_capacity(schema.len());
        for (name, dtype) in &schema {
            let column = match df.column(name) {
                Ok(column) if column.dtype() == dtype => column.clone(),
                Ok(column) => column.cast(dtype)?,
                Err(_) => Column::full_null(name.as_str().into(), height, dtype),
            };
            columns.push(column);
        }
        let aligned = DataFrame::new(columns)?;

        match unified.as_mut() {
            Some(acc) => {
                acc.vstack_mut(&aligned)?;
            }
            None => unified = Some(aligned),
        }
    }

    Ok(unified.unwrap_or_else(DataFrame::empty))
}

/// Parse outcome for one input file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileDiagnostics {
    pub file_name: String,
    /// Rows kept from this file.
    pub rows: usize,
    /// Columns kept from this file, before enrichment.
    pub columns: usize,
    /// Columns declared by the header, before capping.
    pub header_columns: usize,
    pub skipped_rows: usize,
    /// Non-empty date cells that could not be parsed.
    pub unparsed_dates: usize,
    /// Rows whose operator label did not map.
    pub unmapped_operators: usize,
    pub encoding: Option<TextEncoding>,
    pub delimiter: Option<char>,
    pub period: Period,
    /// First few dropped rows.
    pub mismatched_lines: Vec<MalformedRow>,
    /// Set when the file could not be read at all.
    pub error: Option<String>,
}

impl FileDiagnostics {
    /// Diagnostics for a file that failed to read.
    pub fn failed(file_name: impl Into<String>, period: Period, error: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            rows: 0,
            columns: 0,
            header_columns: 0,
            skipped_rows: 0,
            unparsed_dates: 0,
            unmapped_operators: 0,
            encoding: None,
            delimiter: None,
            period,
            mismatched_lines: Vec::new(),
            error: Some(error.into()),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Per-file diagnostics for one batch, in file order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParseDiagnostics {
    pub files: Vec<FileDiagnostics>,
}

impl ParseDiagnostics {
    pub fn push(&mut self, file: FileDiagnostics) {
        self.files.push(file);
    }

    pub fn total_skipped(&self) -> usize {
        self.files.iter().map(|f| f.skipped_rows).sum()
    }

    pub fn total_rows(&self) -> usize {
        self.files.iter().map(|f| f.rows).sum()
    }

    pub fn total_unparsed_dates(&self) -> usize {
        self.files.iter().map(|f| f.unparsed_dates).sum()
    }

    pub fn failed_files(&self) -> impl Iterator<Item = &FileDiagnostics> {
        self.files.iter().filter(|f| f.is_failed())
    }

    /// Per-file breakdown as a table, for display.
    pub fn preview_table(&self) -> Result<DataFrame> {
        let files: Vec<&str> = self.files.iter().map(|f| f.file_name.as_str()).collect();
        let rows: Vec<u64> = self.files.iter().map(|f| f.rows as u64).collect();
        let columns: Vec<u64> = self.files.iter().map(|f| f.columns as u64).collect();
        let skipped: Vec<u64> = self.files.iter().map(|f| f.skipped_rows as u64).collect();
        let unparsed: Vec<u64> = self.files.iter().map(|f| f.unparsed_dates as u64).collect();
        let encodings: Vec<Option<&str>> = self
            .files
            .iter()
            .map(|f| f.encoding.as_ref().map(TextEncoding::label))
            .collect();
        let delimiters: Vec<Option<String>> = self
            .files
            .iter()
            .map(|f| f.delimiter.map(display_delimiter))
            .collect();
        let from: Vec<_> = self.files.iter().map(|f| f.period.from).collect();
        let to: Vec<_> = self.files.iter().map(|f| f.period.to).collect();
        let errors: Vec<Option<&str>> = self.files.iter().map(|f| f.error.as_deref()).collect();

        let df = DataFrame::new(vec![
            Series::new("file".into(), files).into(),
            Series::new("rows".into(), rows).into(),
            Series::new("columns".into(), columns).into(),
            Series::new("skipped".into(), skipped).into(),
            Series::new("unparsed_dates".into(), unparsed).into(),
            Series::new("encoding".into(), encodings).into(),
            Series::new("delimiter".into(), delimiters).into(),
            date_series("from", &from)?.into(),
            date_series("to", &to)?.into(),
            Series::new("error".into(), errors).into(),
        ])?;
        Ok(df)
    }
}

/// Readable name for a delimiter.
pub fn display_delimiter(delimiter: char) -> String {
    match delimiter {
        '\t' => "tab".to_string(),
        other => other.to_string(),
    }
}

/// Rows whose operator failed to map, for manual review.
#[derive(Debug, Clone)]
pub struct UnmappedReview {
    /// Review columns (`SCO`, `Facility Code`, `Begin Date`, `End Date`) that exist
    /// in the table, for each flagged row.
    pub rows: DataFrame,
    /// Distinct raw operator labels among flagged rows, sorted.
    pub raw_values: Vec<String>,
}

impl Default for UnmappedReview {
    fn default() -> Self {
        Self {
            rows: DataFrame::empty(),
            raw_values: Vec::new(),
        }
    }
}

impl UnmappedReview {
    /// Collect rows whose `SCO2` is empty or missing.
    ///
    /// Tables without an `SCO2` column produce an empty review.
    pub fn from_table(df: &DataFrame) -> Result<Self> {
        let Ok(codes) = df.column(OPERATOR_CODE_COLUMN) else {
            return Ok(Self::default());
        };

        let codes = codes.as_materialized_series().cast(&DataType::String)?;
        let flags: Vec<bool> = codes
            .str()?
            .into_iter()
            .map(|code| code.is_none_or(|c| c.trim().is_empty()))
            .collect();
        let mask = BooleanChunked::from_slice("mask".into(), &flags);
        let flagged = df.filter(&mask)?;

        let raw_values: Vec<String> = match flagged.column(OPERATOR_COLUMN) {
            Ok(raw) => raw
                .as_materialized_series()
                .cast(&DataType::String)?
                .str()?
                .into_iter()
                .flatten()
                .filter(|v| !v.trim().is_empty())
                .map(str::to_string)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect(),
            Err(_) => Vec::new(),
        };

        let present: Vec<&str> = REVIEW_COLUMNS
            .iter()
            .copied()
            .filter(|name| flagged.get_column_index(name).is_some())
            .collect();
        let rows = flagged.select(present)?;

        Ok(Self { rows, raw_values })
    }

    /// Number of flagged rows.
    pub fn len(&self) -> usize {
        self.rows.height()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.height() == 0
    }
}
