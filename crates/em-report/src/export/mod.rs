//! Spreadsheet export.
//!
//! Unified tables become worksheets of an `.xlsx` workbook:
//! - Header row mirroring the column names, in bold
//! - `From`, `To` and the named date columns as `mm/dd/yy` date cells
//! - `Month` as a date cell shown as `mmm`
//! - Column widths derived from the sampled content
//!
//! The workbook is always returned in memory; saving it to the output directory is
//! best-effort.

mod widths;
mod workbook;

pub use widths::{DATE_COLUMN_WIDTH, MONTH_COLUMN_WIDTH, column_width};
pub use workbook::{ExportArtifact, WorkbookExporter, suggested_file_name_at};
