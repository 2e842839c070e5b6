//! Batch compilation of operator reports.
//!
//! A batch is processed sequentially: each file is read, given its reporting
//! period, enriched and date-coerced before the next one starts. A file that cannot
//! be read is recorded as a failure and the batch moves on.

use super::unify::{FileDiagnostics, ParseDiagnostics, UnmappedReview, unify_tables};
use crate::config::CompilerConfig;
use crate::error::{ReportError, Result, ResultExt};
use crate::export::{ExportArtifact, WorkbookExporter};
use crate::ingest::{DefensiveCsvReader, ReportSource};
use crate::period::extract_period_with;
use crate::transform::{DateCoercer, OperatorMap, RowEnricher};
use crate::types::{Period, ReportKind};
use polars::prelude::*;
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, info, warn};

/// A file that could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    pub file_name: String,
    pub code: String,
    pub message: String,
}

impl FileFailure {
    fn from_error(file_name: &str, error: &ReportError) -> Self {
        Self {
            file_name: file_name.to_string(),
            code: error.error_code().to_string(),
            message: error.to_string(),
        }
    }
}

/// The result of compiling one batch of same-kind reports.
#[derive(Debug, Clone)]
pub struct CompiledReport {
    pub kind: ReportKind,
    /// All rows of all readable files, in file order.
    pub table: DataFrame,
    pub diagnostics: ParseDiagnostics,
    pub unmapped: UnmappedReview,
    pub failures: Vec<FileFailure>,
    /// Files beyond the batch limit, not processed.
    pub ignored_files: Vec<String>,
}

impl CompiledReport {
    pub fn row_count(&self) -> usize {
        self.table.height()
    }

    pub fn total_skipped(&self) -> usize {
        self.diagnostics.total_skipped()
    }
}

/// Turns batches of uploaded CSV reports into unified tables and workbooks.
///
/// Use [`ReportCompiler::builder()`] to configure one.
///
/// # Example
///
/// ```rust,ignore
/// use em_report::{ReportCompiler, ReportKind, UploadedFile};
///
/// let compiler = ReportCompiler::builder().build()?;
/// let mut files = vec![UploadedFile::from_bytes("10.01.25_10.07.25.csv", bytes)];
///
/// let detail = compiler.compile(ReportKind::Detail, &mut files)?;
/// let artifact = compiler.export(&[&detail])?;
/// ```
#[derive(Debug, Clone)]
pub struct ReportCompiler {
    config: CompilerConfig,
    operators: OperatorMap,
    reader: DefensiveCsvReader,
    coercer: DateCoercer,
    exporter: WorkbookExporter,
}

// The shell may run a batch on a worker thread
static_assertions::assert_impl_all!(ReportCompiler: Send, Sync);

impl ReportCompiler {
    /// Create a new compiler builder.
    pub fn builder() -> ReportCompilerBuilder {
        ReportCompilerBuilder::default()
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn operators(&self) -> &OperatorMap {
        &self.operators
    }

    /// Reporting period for a file: dates from its name, with missing bounds taken
    /// from the configured default.
    pub fn resolve_period(&self, file_name: &str) -> Period {
        let fallback = self.config.default_period.unwrap_or_default();
        extract_period_with(file_name, self.config.date_order).or(fallback)
    }

    /// Compile a batch of sources of the same report kind.
    ///
    /// Only the first `max_files` sources are processed. Read failures are
    /// collected per file; any other error aborts the batch.
    pub fn compile<S: ReportSource>(
        &self,
        kind: ReportKind,
        sources: &mut [S],
    ) -> Result<CompiledReport> {
        let start = Instant::now();
        let limit = self.config.max_files.min(sources.len());
        let (batch, rest) = sources.split_at_mut(limit);

        let ignored_files: Vec<String> = rest.iter().map(|s| s.name().to_string()).collect();
        if !ignored_files.is_empty() {
            warn!(
                "{} report batch has {} files, only the first {} are processed",
                kind,
                limit + ignored_files.len(),
                limit
            );
        }

        info!("Compiling {} report from {} file(s)", kind, batch.len());

        let mut frames = Vec::with_capacity(batch.len());
        let mut diagnostics = ParseDiagnostics::default();
        let mut failures = Vec::new();

        for source in batch.iter_mut() {
            let name = source.name().to_string();
            match self.compile_file(source) {
                Ok((frame, file)) => {
                    frames.push(frame);
                    diagnostics.push(file);
                }
                Err(e) if e.is_file_scoped() => {
                    warn!("{}", e);
                    failures.push(FileFailure::from_error(&name, &e));
                    diagnostics.push(FileDiagnostics::failed(
                        &name,
                        self.resolve_period(&name),
                        e.to_string(),
                    ));
                }
                Err(e) => return Err(e.with_context(format!("While processing '{name}'"))),
            }
        }

        let table = unify_tables(frames).context("Unifying tables")?;
        let unmapped = UnmappedReview::from_table(&table)?;

        info!(
            "{} report: {} rows from {} file(s), {} skipped, {} unmapped, {} failed ({:.2?})",
            kind,
            table.height(),
            diagnostics.files.len(),
            diagnostics.total_skipped(),
            unmapped.len(),
            failures.len(),
            start.elapsed()
        );

        Ok(CompiledReport {
            kind,
            table,
            diagnostics,
            unmapped,
            failures,
            ignored_files,
        })
    }

    /// Read and transform one source.
    pub fn compile_file<S: ReportSource + ?Sized>(
        &self,
        source: &mut S,
    ) -> Result<(DataFrame, FileDiagnostics)> {
        let name = source.name().to_string();
        let parsed = self
            .reader
            .read(source)
            .map_err(|e| ReportError::read(&name, e))?;

        let period = self.resolve_period(&name);
        debug!("{}: period {}", name, period);

        let rows = parsed.frame.height();
        let columns = parsed.frame.width();
        let (enriched, outcome) =
            RowEnricher::new(&self.operators).enrich(parsed.frame, period, &name)?;
        let (frame, unparsed_dates) = self.coercer.coerce(enriched)?;

        info!(
            "{}: {} rows, {} columns, {} skipped",
            name, rows, columns, parsed.skipped_rows
        );

        let diagnostics = FileDiagnostics {
            file_name: name,
            rows,
            columns,
            header_columns: parsed.header_columns,
            skipped_rows: parsed.skipped_rows,
            unparsed_dates,
            unmapped_operators: outcome.unmapped_rows,
            encoding: Some(parsed.encoding),
            delimiter: Some(parsed.delimiter as char),
            period,
            mismatched_lines: parsed.malformed,
            error: None,
        };

        Ok((frame, diagnostics))
    }

    /// Export compiled reports as one workbook, one sheet per report.
    pub fn export(&self, reports: &[&CompiledReport]) -> Result<ExportArtifact> {
        let sheets: Vec<(ReportKind, &DataFrame)> =
            reports.iter().map(|r| (r.kind, &r.table)).collect();
        self.exporter.export(&sheets).context("Exporting workbook")
    }

    /// Export under a caller-supplied file name.
    pub fn export_as(
        &self,
        reports: &[&CompiledReport],
        file_name: &str,
    ) -> Result<ExportArtifact> {
        let sheets: Vec<(ReportKind, &DataFrame)> =
            reports.iter().map(|r| (r.kind, &r.table)).collect();
        self.exporter
            .export_as(&sheets, file_name)
            .context("Exporting workbook")
    }
}

/// Builder for [`ReportCompiler`].
#[derive(Debug, Default)]
pub struct ReportCompilerBuilder {
    config: Option<CompilerConfig>,
    operators: Option<OperatorMap>,
}

impl ReportCompilerBuilder {
    /// Set the compiler configuration.
    pub fn config(mut self, config: CompilerConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the operator map. Defaults to [`OperatorMap::builtin()`].
    pub fn operators(mut self, operators: OperatorMap) -> Self {
        self.operators = Some(operators);
        self
    }

    /// Build the compiler, validating the configuration.
    pub fn build(self) -> Result<ReportCompiler> {
        let config = self.config.unwrap_or_default();
        config
            .validate()
            .map_err(|e| ReportError::InvalidConfig(e.to_string()))?;

        let operators = self.operators.unwrap_or_else(OperatorMap::builtin);
        debug!("Operator map with {} entries", operators.len());

        Ok(ReportCompiler {
            reader: DefensiveCsvReader::from_config(&config),
            coercer: DateCoercer::new(config.date_order, config.date_format_hint.clone()),
            exporter: WorkbookExporter::from_config(&config),
            operators,
            config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{FileSource, UploadedFile};
    use chrono::NaiveDate;
    use std::io::Cursor;

    fn compiler() -> ReportCompiler {
        let config = CompilerConfig::builder().save_to_disk(false).build().unwrap();
        ReportCompiler::builder().config(config).build().unwrap()
    }

    fn upload(name: &str, content: &str) -> UploadedFile<Cursor<Vec<u8>>> {
        UploadedFile::from_bytes(name, content.as_bytes().to_vec())
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let config = CompilerConfig {
            max_files: 0,
            ..CompilerConfig::default()
        };
        let err = ReportCompiler::builder().config(config).build().unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");
    }

    #[test]
    fn test_resolve_period_falls_back_per_bound() {
        let default = Period::between(
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
        );
        let config = CompilerConfig::builder()
            .default_period(default)
            .build()
            .unwrap();
        let compiler = ReportCompiler::builder().config(config).build().unwrap();

        assert_eq!(compiler.resolve_period("summary.csv"), default);
        assert_eq!(
            compiler.resolve_period("05-09-2024_report.csv"),
            Period::between(
                NaiveDate::from_ymd_opt(2024, 5, 9).unwrap(),
                NaiveDate::from_ymd_opt(2025, 1, 31).unwrap()
            )
        );
    }

    #[test]
    fn test_compile_batch() {
        let mut files = vec![
            upload(
                "10.01.25_10.07.25.csv",
                "SCO,Facility Code,Begin Date\nPOST; TODD,F1,10/01/2025\nDOE; JANE,F2\n",
            ),
            upload(
                "10.08.25_10.14.25.csv",
                "SCO,Facility Code,Begin Date\nCRUZ; ASHLIE,F3,2025-10-09\n",
            ),
        ];

        let report = compiler().compile(ReportKind::Detail, &mut files).unwrap();

        assert_eq!(report.row_count(), 2);
        assert_eq!(report.total_skipped(), 1);
        assert!(report.failures.is_empty());
        assert!(report.unmapped.is_empty());
        assert_eq!(report.diagnostics.files[0].mismatched_lines.len(), 1);
        assert_eq!(
            report.table.column("Begin Date").unwrap().dtype(),
            &DataType::Date
        );
    }

    #[test]
    fn test_read_failure_does_not_abort_batch() {
        let mut files: Vec<Box<dyn ReportSource>> = vec![
            Box::new(FileSource::new("/definitely/not/here/10.01.25_10.07.25.csv")),
            Box::new(upload("10.08.25_10.14.25.csv", "SCO\nPOST; TODD\n")),
        ];

        let report = compiler().compile(ReportKind::Summary, &mut files).unwrap();

        assert_eq!(report.row_count(), 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].code, "READ_ERROR");
        assert_eq!(report.diagnostics.files.len(), 2);
        assert!(report.diagnostics.files[0].is_failed());
        assert_eq!(
            report.diagnostics.files[0].period.from,
            NaiveDate::from_ymd_opt(2025, 10, 1)
        );
    }

    #[test]
    fn test_batch_is_truncated() {
        let config = CompilerConfig::builder()
            .max_files(1)
            .save_to_disk(false)
            .build()
            .unwrap();
        let compiler = ReportCompiler::builder().config(config).build().unwrap();
        let mut files = vec![upload("a.csv", "x\n1\n"), upload("b.csv", "x\n2\n")];

        let report = compiler.compile(ReportKind::Detail, &mut files).unwrap();

        assert_eq!(report.row_count(), 1);
        assert_eq!(report.ignored_files, vec!["b.csv".to_string()]);
        assert_eq!(report.diagnostics.files.len(), 1);
    }

    #[test]
    fn test_empty_batch_compiles_to_empty_table() {
        let mut files: Vec<UploadedFile<Cursor<Vec<u8>>>> = Vec::new();
        let report = compiler().compile(ReportKind::Detail, &mut files).unwrap();
        assert_eq!(report.row_count(), 0);
        assert!(report.diagnostics.files.is_empty());
    }

    #[test]
    fn test_export_detail_and_summary() {
        let compiler = compiler();
        let mut detail_files = vec![upload("10.01.25_10.07.25.csv", "SCO\nPOST; TODD\n")];
        let mut summary_files = vec![upload("10.01.25_10.07.25.csv", "Total\n3\n")];

        let detail = compiler.compile(ReportKind::Detail, &mut detail_files).unwrap();
        let summary = compiler.compile(ReportKind::Summary, &mut summary_files).unwrap();
        let artifact = compiler.export(&[&detail, &summary]).unwrap();

        assert!(artifact.file_name.starts_with("unified_"));
        assert!(artifact.file_name.ends_with(".xlsx"));
        assert!(artifact.persisted_to.is_none());
        // xlsx files are zip archives
        assert_eq!(&artifact.bytes[..2], b"PK");
    }
}
