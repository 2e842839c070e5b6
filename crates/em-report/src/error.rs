//! Error types for the report ingestion pipeline.
//!
//! Only two kinds of failure are ever raised:
//!
//! - [`ReadError`] - a single byte source could not be read or its header could not be
//!   parsed. It is scoped to one file; the batch keeps going.
//! - [`ReportError`] - anything that prevents a whole batch or export from completing.
//!
//! Malformed rows, unmapped operators and unparseable dates are never errors. They are
//! counted in the diagnostics instead.
//!
//! Errors are serializable so a presentation shell can forward them as JSON.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// Failure to turn one byte source into a table.
#[derive(Error, Debug)]
pub enum ReadError {
    /// The byte source could not be read or rewound.
    #[error("could not read byte source: {0}")]
    Io(#[from] std::io::Error),

    /// The header record could not be parsed.
    #[error("could not read header row: {0}")]
    Header(String),

    /// The kept rows could not be assembled into a table.
    #[error("could not build table: {0}")]
    Table(#[from] polars::error::PolarsError),
}

/// The main error type for batch compilation and export.
#[derive(Error, Debug)]
pub enum ReportError {
    /// A single file could not be read.
    #[error("Failed to read '{file}': {source}")]
    Read {
        file: String,
        #[source]
        source: ReadError,
    },

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// No report was supplied to the exporter.
    #[error("Nothing to export")]
    EmptyBatch,

    /// Workbook assembly failed for a reason other than the writer itself.
    #[error("Failed to export workbook: {0}")]
    Export(String),

    /// Workbook writer error.
    #[error("Workbook error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ReportError>,
    },
}

impl ReportError {
    /// Wrap a [`ReadError`] with the name of the file it belongs to.
    pub fn read(file: impl Into<String>, source: ReadError) -> Self {
        ReportError::Read {
            file: file.into(),
            source,
        }
    }

    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ReportError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Get error code for frontend handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Read { .. } => "READ_ERROR",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::EmptyBatch => "EMPTY_BATCH",
            Self::Export(_) => "EXPORT_FAILED",
            Self::Xlsx(_) => "XLSX_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Whether the error is confined to a single input file.
    pub fn is_file_scoped(&self) -> bool {
        match self {
            Self::Read { .. } => true,
            Self::WithContext { source, .. } => source.is_file_scoped(),
            _ => false,
        }
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for ReportError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("ReportError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, ReportError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| ReportError::Polars(e).with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, rust_xlsxwriter::XlsxError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| ReportError::Xlsx(e).with_context(context))
    }
}
