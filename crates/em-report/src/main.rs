//! CLI entry point for the operator report compiler.

use anyhow::{Result, anyhow};
use chrono::{Local, NaiveDate};
use clap::Parser;
use dotenv::dotenv;
use em_report::pipeline::display_delimiter;
use em_report::utils::cell_text;
use em_report::{
    CompiledReport, CompilerConfig, DateOrder, DiagnosticsReport, ExportArtifact, FileSource,
    OperatorMap, Period, ReportCompiler, ReportKind,
};
use std::env;
use std::path::PathBuf;
use tracing::info;

/// Environment variable naming the default output directory.
const OUTPUT_DIR_ENV: &str = "EM_REPORT_OUTPUT_DIR";

/// Rows of the unmapped-operator review printed in the summary.
const REVIEW_PREVIEW_ROWS: usize = 50;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Compile operator CSV reports into one workbook",
    long_about = "Reads operator-exported detail and summary CSV reports, tags rows with the \
                  reporting period from each file name, maps operator labels to display \
                  names and writes one .xlsx workbook.\n\n\
                  ENVIRONMENT VARIABLES:\n  \
                  EM_REPORT_OUTPUT_DIR  Default output directory (default: exports)\n\n\
                  EXAMPLES:\n  \
                  # Detail reports only\n  \
                  em-report 10.01.25_10.07.25.csv 10.08.25_10.14.25.csv\n\n  \
                  # Detail and summary sheets\n  \
                  em-report -d detail_10.01.25_10.07.25.csv -s summary_10.01.25_10.07.25.csv\n\n  \
                  # Extra operator aliases, diagnostics as JSON\n  \
                  em-report *.csv --operator-map operators.json --json"
)]
struct Args {
    /// Detail report CSV files
    #[arg(value_name = "CSV")]
    files: Vec<PathBuf>,

    /// Detail report CSV file (repeatable)
    #[arg(short, long, value_name = "CSV")]
    detail: Vec<PathBuf>,

    /// Summary report CSV file (repeatable)
    #[arg(short, long, value_name = "CSV")]
    summary: Vec<PathBuf>,

    /// Period start for files whose names carry no dates (YYYY-MM-DD)
    ///
    /// Defaults to today
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Period end for files whose names carry no dates (YYYY-MM-DD)
    ///
    /// Defaults to the period start
    #[arg(long)]
    to: Option<NaiveDate>,

    /// Output directory for the workbook
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Workbook file name prefix
    #[arg(long, default_value = "unified")]
    prefix: String,

    /// JSON file of extra operator labels: {"LAST; FIRST": "Display"}
    #[arg(long, value_name = "JSON")]
    operator_map: Option<PathBuf>,

    /// Read ambiguous dates as day/month/year
    #[arg(long)]
    day_first: bool,

    /// chrono format tried first for date columns, e.g. "%m/%d/%Y"
    #[arg(long)]
    date_format: Option<String>,

    /// Build the workbook without saving it
    #[arg(long)]
    no_save: bool,

    /// Output JSON to stdout instead of human-readable summary
    ///
    /// Disables all logs; only outputs the diagnostics report.
    #[arg(long)]
    json: bool,

    /// Write the diagnostics report to the output directory
    ///
    /// The report will be saved as <workbook_name>_diagnostics.json
    #[arg(short = 'r', long)]
    emit_report: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show warnings and final result)
    #[arg(short, long)]
    quiet: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    // Load environment variables from .env file
    dotenv().ok();

    let detail_paths: Vec<PathBuf> = args.files.iter().chain(&args.detail).cloned().collect();
    if detail_paths.is_empty() && args.summary.is_empty() {
        return Err(anyhow!(
            "No input files given. Pass CSV paths, or use --detail / --summary"
        ));
    }

    let output_dir = args
        .output
        .clone()
        .or_else(|| env::var(OUTPUT_DIR_ENV).ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("exports"));

    let from = args.from.unwrap_or_else(|| Local::now().date_naive());
    let to = args.to.unwrap_or(from);

    let mut config_builder = CompilerConfig::builder()
        .default_period(Period::between(from, to))
        .date_order(if args.day_first {
            DateOrder::DayFirst
        } else {
            DateOrder::MonthFirst
        })
        .output_dir(&output_dir)
        .file_prefix(&args.prefix)
        .save_to_disk(!args.no_save);

    if let Some(ref format) = args.date_format {
        config_builder = config_builder.date_format_hint(format);
    }

    let config = config_builder.build()?;

    let mut operators = OperatorMap::builtin();
    if let Some(ref path) = args.operator_map {
        let extra = OperatorMap::from_json_file(path)?;
        info!(
            "Loaded {} operator label(s) from {}",
            extra.len(),
            path.display()
        );
        operators = operators.merged_with(extra);
    }

    let compiler = ReportCompiler::builder()
        .config(config)
        .operators(operators)
        .build()?;

    let mut reports = Vec::new();
    for (kind, paths) in [
        (ReportKind::Detail, &detail_paths),
        (ReportKind::Summary, &args.summary),
    ] {
        if paths.is_empty() {
            continue;
        }
        let mut sources: Vec<FileSource> = paths.iter().map(FileSource::new).collect();
        reports.push(compiler.compile(kind, &mut sources)?);
    }

    let report_refs: Vec<&CompiledReport> = reports.iter().collect();
    let artifact = compiler.export(&report_refs)?;
    let diagnostics = DiagnosticsReport::build(&report_refs, Some(&artifact));

    if args.emit_report {
        let stem = artifact.file_name.trim_end_matches(".xlsx");
        let report_path = diagnostics.write_report_to_file(&output_dir, stem)?;
        info!("Report written to: {}", report_path.display());
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&diagnostics)?);
        return Ok(());
    }

    print_human_readable_summary(&reports, &artifact);

    Ok(())
}

fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{}...", kept)
    }
}

/// Print a human-readable summary of the compiled reports.
///
/// This is the default output when `--json` is not specified.
fn print_human_readable_summary(reports: &[CompiledReport], artifact: &ExportArtifact) {
    println!();
    println!("{}", "=".repeat(80));
    println!("REPORTS COMPILED");
    println!("{}", "=".repeat(80));
    println!();

    match artifact.persisted_to {
        Some(ref path) => println!("Workbook: {}", path.display()),
        None => println!("Workbook: {} (not saved)", artifact.file_name),
    }
    println!();

    for report in reports {
        print_report(report);
    }

    println!("Use --json for machine-readable output");
    println!("Use --emit-report to save the diagnostics report");
    println!("{}", "=".repeat(80));
}

fn print_report(report: &CompiledReport) {
    println!(
        "{}: {} rows unified from {} file(s), {} malformed row(s) skipped",
        report.kind,
        report.row_count(),
        report.diagnostics.files.len(),
        report.total_skipped()
    );
    println!("{}", "-".repeat(80));
    println!(
        "{:<32} {:>6} {:>6} {:>8} {:<26} {:<6}",
        "File", "Rows", "Cols", "Skipped", "Period", "Delim"
    );

    for file in &report.diagnostics.files {
        println!(
            "{:<32} {:>6} {:>6} {:>8} {:<26} {:<6}",
            truncate_str(&file.file_name, 31),
            file.rows,
            file.columns,
            file.skipped_rows,
            file.period.to_string(),
            file.delimiter.map(display_delimiter).unwrap_or_default()
        );
        for line in &file.mismatched_lines {
            println!(
                "    line {}: {} of {} fields",
                line.line, line.fields, line.expected
            );
        }
        if let Some(ref error) = file.error {
            println!("    ! {}", error);
        }
    }

    if !report.ignored_files.is_empty() {
        println!(
            "  ! {} file(s) over the batch limit were ignored",
            report.ignored_files.len()
        );
    }
    println!();

    if report.unmapped.is_empty() {
        println!("All operators mapped.");
        println!();
        return;
    }

    let review = &report.unmapped.rows;
    println!(
        "Unmapped operators ({} row(s), first {} shown):",
        review.height(),
        REVIEW_PREVIEW_ROWS.min(review.height())
    );
    let header: Vec<String> = review
        .get_column_names()
        .iter()
        .map(|name| format!("{:<24}", truncate_str(name.as_str(), 23)))
        .collect();
    println!("  {}", header.join(" "));

    for row in 0..review.height().min(REVIEW_PREVIEW_ROWS) {
        let cells: Vec<String> = review
            .get_columns()
            .iter()
            .map(|column| {
                let text = column
                    .get(row)
                    .ok()
                    .and_then(|value| cell_text(&value))
                    .unwrap_or_default();
                format!("{:<24}", truncate_str(&text, 23))
            })
            .collect();
        println!("  {}", cells.join(" "));
    }
    println!();

    println!("Raw operator labels to add to the map:");
    for raw in &report.unmapped.raw_values {
        println!("  {:?}", raw);
    }
    println!();
}
