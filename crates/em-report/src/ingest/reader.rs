//! The defensive CSV reader.
//!
//! Kept rows and the skipped-row count come out of one parsing pass, so the number
//! of rows dropped from the table always equals the number reported.

use super::encoding::{TextEncoding, decode_text};
use super::sniffer::{DEFAULT_DELIMITER, sniff_delimiter};
use super::source::ReportSource;
use crate::config::{CompilerConfig, DEFAULT_MAX_COLUMNS, DEFAULT_SNIFF_SAMPLE_BYTES};
use crate::error::ReadError;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Mismatched rows remembered per file as a corrective hint.
const MAX_REMEMBERED_MALFORMED: usize = 5;

/// A data row dropped because it had fewer fields than the kept columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MalformedRow {
    /// 1-based line number in the decoded text.
    pub line: u64,
    pub fields: usize,
    pub expected: usize,
}

/// Result of reading one byte source.
#[derive(Debug, Clone)]
pub struct ParsedTable {
    /// String columns, in header order, capped at the configured maximum.
    pub frame: DataFrame,
    /// Rows dropped for having fewer fields than the kept columns.
    pub skipped_rows: usize,
    /// Number of columns the header declared before capping.
    pub header_columns: usize,
    pub encoding: TextEncoding,
    pub delimiter: u8,
    /// First few dropped rows, for display.
    pub malformed: Vec<MalformedRow>,
}

impl ParsedTable {
    fn empty(encoding: TextEncoding, delimiter: u8) -> Self {
        Self {
            frame: DataFrame::empty(),
            skipped_rows: 0,
            header_columns: 0,
            encoding,
            delimiter,
            malformed: Vec::new(),
        }
    }
}

/// Reads operator CSV exports without failing on malformed content.
#[derive(Debug, Clone)]
pub struct DefensiveCsvReader {
    max_columns: usize,
    sniff_sample_bytes: usize,
}

impl Default for DefensiveCsvReader {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_COLUMNS, DEFAULT_SNIFF_SAMPLE_BYTES)
    }
}

impl DefensiveCsvReader {
    pub fn new(max_columns: usize, sniff_sample_bytes: usize) -> Self {
        Self {
            max_columns: max_columns.max(1),
            sniff_sample_bytes: sniff_sample_bytes.max(1),
        }
    }

    pub fn from_config(config: &CompilerConfig) -> Self {
        Self::new(config.max_columns, config.sniff_sample_bytes)
    }

    /// Read a byte source from its start and parse it.
    pub fn read<S: ReportSource + ?Sized>(&self, source: &mut S) -> Result<ParsedTable, ReadError> {
        let bytes = source.read_bytes()?;
        debug!("Read {} bytes from '{}'", bytes.len(), source.name());
        self.parse_bytes(&bytes)
    }

    /// Parse raw CSV bytes.
    ///
    /// The first non-blank record is the header. Only the first
    /// `min(max_columns, header_len)` columns are kept; rows with fewer fields are
    /// dropped and counted, longer rows are truncated. Empty content yields an
    /// empty table.
    pub fn parse_bytes(&self, bytes: &[u8]) -> Result<ParsedTable, ReadError> {
        let (text, encoding) = decode_text(bytes);
        let sample = sample_prefix(&text, self.sniff_sample_bytes);
        let delimiter = sniff_delimiter(sample).unwrap_or_else(|| {
            debug!("Could not sniff delimiter, defaulting to comma");
            DEFAULT_DELIMITER
        });
        debug!(
            "Decoded as {}, delimiter {:?}",
            encoding.label(),
            delimiter as char
        );

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(text.as_bytes());
        let mut records = reader.records();

        let header = loop {
            match records.next() {
                None => return Ok(ParsedTable::empty(encoding, delimiter)),
                Some(Err(e)) => return Err(ReadError::Header(e.to_string())),
                Some(Ok(record)) if record.iter().all(|f| f.trim().is_empty()) => continue,
                Some(Ok(record)) => break record,
            }
        };

        let header_columns = header.len();
        let keep = header_columns.min(self.max_columns);
        if header_columns > keep {
            debug!(
                "Header declares {} columns, keeping the first {}",
                header_columns, keep
            );
        }
        let names = unique_headers(header.iter().take(keep));

        let mut values: Vec<Vec<Option<String>>> = vec![Vec::new(); keep];
        let mut skipped_rows = 0;
        let mut malformed = Vec::new();

        for result in records {
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    debug!("Unreadable record: {}", e);
                    skipped_rows += 1;
                    continue;
                }
            };

            if record.len() < keep {
                skipped_rows += 1;
                if malformed.len() < MAX_REMEMBERED_MALFORMED {
                    malformed.push(MalformedRow {
                        line: record.position().map(|p| p.line()).unwrap_or(0),
                        fields: record.len(),
                        expected: keep,
                    });
                }
                continue;
            }

            for (column, field) in values.iter_mut().zip(record.iter()) {
                column.push(if field.is_empty() {
                    None
                } else {
                    Some(field.to_string())
                });
            }
        }

        if skipped_rows > 0 {
            warn!(
                "Skipped {} malformed row(s) with fewer than {} fields",
                skipped_rows, keep
            );
        }

        let columns: Vec<Column> = names
            .into_iter()
            .zip(values)
            .map(|(name, column)| Series::new(name.into(), column).into())
            .collect();
        let frame = DataFrame::new(columns)?;

        Ok(ParsedTable {
            frame,
            skipped_rows,
            header_columns,
            encoding,
            delimiter,
            malformed,
        })
    }
}

/// Longest prefix of `text` no larger than `limit` bytes, cut on a char boundary.
fn sample_prefix(text: &str, limit: usize) -> &str {
    if text.len() <= limit {
        return text;
    }
    let mut end = limit;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Make header names usable as column names: trimmed, non-empty and unique.
///
/// Blank names become `Unnamed: <index>`; repeats get a `.1`, `.2`... suffix.
fn unique_headers<'a>(raw: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut used: HashSet<String> = HashSet::new();
    let mut repeats: HashMap<String, usize> = HashMap::new();
    let mut names = Vec::new();

    for (index, name) in raw.enumerate() {
        let trimmed = name.trim();
        let base = if trimmed.is_empty() {
            format!("Unnamed: {index}")
        } else {
            trimmed.to_string()
        };

        let mut candidate = base.clone();
        while used.contains(&candidate) {
            let n = repeats.entry(base.clone()).or_insert(0);
            *n += 1;
            candidate = format!("{base}.{n}");
        }
        used.insert(candidate.clone());
        names.push(candidate);
    }

    names
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column_names(df: &DataFrame) -> Vec<String> {
        df.get_column_names().iter().map(|s| s.to_string()).collect()
    }

    fn string_at(df: &DataFrame, column: &str, row: usize) -> Option<String> {
        df.column(column)
            .unwrap()
            .as_materialized_series()
            .str()
            .unwrap()
            .get(row)
            .map(|s| s.to_string())
    }

    #[test]
    fn test_well_formed_csv() {
        let csv = b"SCO,Facility Code,Begin Date\nPOST; TODD,F1,10/01/2025\nCRUZ; ASHLIE,F2,10/02/2025\n";
        let table = DefensiveCsvReader::default().parse_bytes(csv).unwrap();

        assert_eq!(table.frame.shape(), (2, 3));
        assert_eq!(table.skipped_rows, 0);
        assert_eq!(table.delimiter, b',');
        assert_eq!(
            column_names(&table.frame),
            vec!["SCO", "Facility Code", "Begin Date"]
        );
        assert_eq!(string_at(&table.frame, "SCO", 1).as_deref(), Some("CRUZ; ASHLIE"));
    }

    #[test]
    fn test_short_row_is_skipped_and_counted() {
        let csv = b"a,b,c,d,e\n1,2,3,4,5\n1,2,3\n6,7,8,9,10\n";
        let table = DefensiveCsvReader::default().parse_bytes(csv).unwrap();

        assert_eq!(table.frame.width(), 5);
        assert_eq!(table.frame.height(), 2);
        assert_eq!(table.skipped_rows, 1);
        assert_eq!(
            table.malformed,
            vec![MalformedRow {
                line: 3,
                fields: 3,
                expected: 5
            }]
        );
    }

    #[test]
    fn test_long_row_is_truncated() {
        let csv = b"a,b\n1,2,3,4\n";
        let table = DefensiveCsvReader::default().parse_bytes(csv).unwrap();

        assert_eq!(table.frame.shape(), (1, 2));
        assert_eq!(table.skipped_rows, 0);
        assert_eq!(string_at(&table.frame, "b", 0).as_deref(), Some("2"));
    }

    #[test]
    fn test_column_cap() {
        let header: Vec<String> = (0..45).map(|i| format!("c{i}")).collect();
        let row: Vec<String> = (0..45).map(|i| i.to_string()).collect();
        let csv = format!("{}\n{}\n", header.join(","), row.join(","));

        let table = DefensiveCsvReader::default()
            .parse_bytes(csv.as_bytes())
            .unwrap();

        assert_eq!(table.header_columns, 45);
        assert_eq!(table.frame.width(), 40);
        let names = column_names(&table.frame);
        assert_eq!(names.first().map(String::as_str), Some("c0"));
        assert_eq!(names.last().map(String::as_str), Some("c39"));
        assert_eq!(string_at(&table.frame, "c39", 0).as_deref(), Some("39"));
    }

    #[test]
    fn test_cap_does_not_skip_rows_short_of_full_header() {
        // 45 declared columns, a row with 42 fields still covers the 40 kept ones
        let header: Vec<String> = (0..45).map(|i| format!("c{i}")).collect();
        let row: Vec<String> = (0..42).map(|i| i.to_string()).collect();
        let csv = format!("{}\n{}\n", header.join(","), row.join(","));

        let table = DefensiveCsvReader::default()
            .parse_bytes(csv.as_bytes())
            .unwrap();
        assert_eq!(table.frame.height(), 1);
        assert_eq!(table.skipped_rows, 0);
    }

    #[test]
    fn test_empty_content() {
        let table = DefensiveCsvReader::default().parse_bytes(b"").unwrap();
        assert_eq!(table.frame.shape(), (0, 0));
        assert_eq!(table.skipped_rows, 0);

        let table = DefensiveCsvReader::default().parse_bytes(b"\n\n  \n").unwrap();
        assert_eq!(table.frame.shape(), (0, 0));
    }

    #[test]
    fn test_header_only() {
        let table = DefensiveCsvReader::default()
            .parse_bytes(b"SCO,Facility Code\n")
            .unwrap();
        assert_eq!(table.frame.shape(), (0, 2));
    }

    #[test]
    fn test_leading_blank_lines_before_header() {
        let table = DefensiveCsvReader::default()
            .parse_bytes(b"\n\nSCO;Facility Code\n\"POST; TODD\";F1\n")
            .unwrap();
        assert_eq!(table.delimiter, b';');
        assert_eq!(column_names(&table.frame), vec!["SCO", "Facility Code"]);
        assert_eq!(table.frame.height(), 1);
    }

    #[test]
    fn test_semicolon_file_with_1252_encoding() {
        let csv = b"SCO;City\n\"CRUZ; ASHLIE\";Z\xfcrich\n";
        let table = DefensiveCsvReader::default().parse_bytes(csv).unwrap();

        assert_eq!(table.encoding, TextEncoding::Windows1252);
        assert_eq!(table.delimiter, b';');
        assert_eq!(string_at(&table.frame, "City", 0).as_deref(), Some("Zürich"));
        assert_eq!(string_at(&table.frame, "SCO", 0).as_deref(), Some("CRUZ; ASHLIE"));
    }

    #[test]
    fn test_empty_fields_are_missing() {
        let table = DefensiveCsvReader::default()
            .parse_bytes(b"a,b\n1,\n,2\n")
            .unwrap();
        assert_eq!(table.frame.column("b").unwrap().null_count(), 1);
        assert_eq!(table.frame.column("a").unwrap().null_count(), 1);
    }

    #[test]
    fn test_duplicate_and_blank_headers() {
        let table = DefensiveCsvReader::default()
            .parse_bytes(b"SCO,,SCO,SCO\n1,2,3,4\n")
            .unwrap();
        assert_eq!(
            column_names(&table.frame),
            vec!["SCO", "Unnamed: 1", "SCO.1", "SCO.2"]
        );
    }

    #[test]
    fn test_custom_column_cap() {
        let table = DefensiveCsvReader::new(2, 1024)
            .parse_bytes(b"a,b,c\n1,2\n")
            .unwrap();
        assert_eq!(table.frame.shape(), (1, 2));
        assert_eq!(table.skipped_rows, 0);
    }

    #[test]
    fn test_sample_prefix_respects_char_boundaries() {
        let text = "aé";
        assert_eq!(sample_prefix(text, 2), "a");
        assert_eq!(sample_prefix(text, 10), "aé");
    }
}
