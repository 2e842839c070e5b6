//! Operator Report Compilation Library
//!
//! Ingests operator-exported CSV reports (detail and summary variants), normalizes them
//! into one table per report kind and exports them as a formatted `.xlsx` workbook.
//!
//! # Overview
//!
//! - **Defensive Ingestion**: Encoding fallbacks, delimiter sniffing, a column cap and
//!   malformed-row tolerance
//! - **Period Extraction**: Reporting periods read from file names such as
//!   `10.27.25_11.2.25.csv`
//! - **Enrichment**: Year, month, period bounds, canonical operator names and source file
//! - **Date Coercion**: A fixed set of named date columns converted to dates
//! - **Unification & Diagnostics**: Per-file tables concatenated, with skipped-row counts
//!   and an unmapped-operator review
//! - **Workbook Export**: One worksheet per report kind, with date formats and column widths
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use em_report::{CompilerConfig, ReportCompiler, ReportKind, UploadedFile};
//!
//! let config = CompilerConfig::builder()
//!     .output_dir("exports")
//!     .build()?;
//! let compiler = ReportCompiler::builder().config(config).build()?;
//!
//! let mut files = vec![
//!     UploadedFile::from_bytes("10.01.25_10.07.25.csv", first),
//!     UploadedFile::from_bytes("10.08.25_10.14.25.csv", second),
//! ];
//! let detail = compiler.compile(ReportKind::Detail, &mut files)?;
//!
//! println!("{} rows, {} skipped", detail.row_count(), detail.total_skipped());
//! for raw in &detail.unmapped.raw_values {
//!     println!("unmapped operator: {raw}");
//! }
//!
//! let artifact = compiler.export(&[&detail])?;
//! println!("workbook: {}", artifact.file_name);
//! ```
//!
//! # Errors
//!
//! Only a file that cannot be read at all fails, and only for that file. Malformed rows,
//! unmapped operators and unparseable dates are counted in the diagnostics instead.
//! See [`error`] for details.

pub mod config;
pub mod error;
pub mod export;
pub mod ingest;
pub mod period;
pub mod pipeline;
pub mod reporting;
pub mod transform;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use config::{CompilerConfig, CompilerConfigBuilder, ConfigValidationError};
pub use error::{ReadError, ReportError, Result as ReportResult, ResultExt};
pub use export::{ExportArtifact, WorkbookExporter, suggested_file_name_at};
pub use ingest::{
    DefensiveCsvReader, FileSource, MalformedRow, ParsedTable, ReportSource, TextEncoding,
    UploadedFile,
};
pub use period::{extract_period, extract_period_with};
pub use pipeline::{
    CompiledReport, FileDiagnostics, FileFailure, ParseDiagnostics, ReportCompiler,
    ReportCompilerBuilder, UnmappedReview, unify_tables,
};
pub use reporting::{DiagnosticsReport, SheetReport};
pub use transform::{DateCoercer, OperatorMap, RowEnricher, normalize_operator};
pub use types::{DateOrder, Period, ReportKind};
