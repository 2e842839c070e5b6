//! Diagnostics reports.
//!
//! A [`DiagnosticsReport`] summarizes one export action for:
//! - JSON output to stdout (`--json` CLI flag)
//! - JSON file output (`--emit-report` CLI flag)
//! - Programmatic access from a presentation shell
//!
//! # Example
//!
//! ```rust,ignore
//! use em_report::reporting::DiagnosticsReport;
//!
//! let report = DiagnosticsReport::build(&[&detail, &summary], Some(&artifact));
//! println!("{}", serde_json::to_string_pretty(&report)?);
//! report.write_report_to_file("exports", "unified_20251103_0905")?;
//! ```

use crate::error::Result;
use crate::export::ExportArtifact;
use crate::pipeline::{CompiledReport, FileDiagnostics, FileFailure};
use crate::types::ReportKind;
use chrono::Local;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Serializable summary of one or more compiled reports and their export.
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticsReport {
    /// Timestamp when the report was generated
    pub generated_at: String,
    /// Suggested workbook file name, if a workbook was built
    pub workbook: Option<String>,
    /// Where the workbook was saved, if it was
    pub persisted_to: Option<PathBuf>,
    pub sheets: Vec<SheetReport>,
    pub total_rows: usize,
    pub total_skipped: usize,
    pub total_unmapped: usize,
    /// Distinct raw operator labels that did not map, across all sheets
    pub unmapped_operators: Vec<String>,
}

/// Diagnostics for one sheet.
#[derive(Debug, Clone, Serialize)]
pub struct SheetReport {
    pub kind: ReportKind,
    pub rows: usize,
    pub columns: Vec<String>,
    pub skipped: usize,
    pub unmapped_rows: usize,
    pub unmapped_operators: Vec<String>,
    pub files: Vec<FileDiagnostics>,
    pub failures: Vec<FileFailure>,
    pub ignored_files: Vec<String>,
}

impl SheetReport {
    fn from_compiled(report: &CompiledReport) -> Self {
        Self {
            kind: report.kind,
            rows: report.row_count(),
            columns: report
                .table
                .get_column_names()
                .iter()
                .map(|s| s.to_string())
                .collect(),
            skipped: report.total_skipped(),
            unmapped_rows: report.unmapped.len(),
            unmapped_operators: report.unmapped.raw_values.clone(),
            files: report.diagnostics.files.clone(),
            failures: report.failures.clone(),
            ignored_files: report.ignored_files.clone(),
        }
    }
}

impl DiagnosticsReport {
    pub fn build(reports: &[&CompiledReport], artifact: Option<&ExportArtifact>) -> Self {
        let sheets: Vec<SheetReport> = reports
            .iter()
            .map(|r| SheetReport::from_compiled(r))
            .collect();

        let unmapped_operators: BTreeSet<String> = sheets
            .iter()
            .flat_map(|s| s.unmapped_operators.iter().cloned())
            .collect();

        Self {
            generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            workbook: artifact.map(|a| a.file_name.clone()),
            persisted_to: artifact.and_then(|a| a.persisted_to.clone()),
            total_rows: sheets.iter().map(|s| s.rows).sum(),
            total_skipped: sheets.iter().map(|s| s.skipped).sum(),
            total_unmapped: sheets.iter().map(|s| s.unmapped_rows).sum(),
            unmapped_operators: unmapped_operators.into_iter().collect(),
            sheets,
        }
    }

    /// Write the report as pretty JSON to `<dir>/<base_name>_diagnostics.json`.
    pub fn write_report_to_file(&self, dir: impl AsRef<Path>, base_name: &str) -> Result<PathBuf> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let report_path = dir.join(format!("{}_diagnostics.json", base_name));
        let mut file = File::create(&report_path)?;
        file.write_all(serde_json::to_string_pretty(self)?.as_bytes())?;

        info!("Diagnostics saved: {}", report_path.display());

        Ok(report_path)
    }
}
