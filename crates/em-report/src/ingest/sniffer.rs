//! Delimiter sniffing.
//!
//! A delimiter is accepted when it appears the same non-zero number of times on
//! (nearly) every sampled line. Occurrences inside double quotes are ignored.

use std::collections::HashMap;
use tracing::debug;

/// Delimiters considered, in order of preference on ties.
pub const CANDIDATE_DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];

/// Used when no candidate is consistent across the sample.
pub const DEFAULT_DELIMITER: u8 = b',';

/// Lines examined from the start of the sample.
const MAX_SNIFF_LINES: usize = 200;

/// Share of lines that must agree on the modal count.
const MIN_CONSISTENCY: f64 = 0.9;

/// Detect the delimiter of a text sample, or `None` when sniffing fails.
///
/// The trailing line of the sample is ignored when it is unterminated and other
/// lines exist, since a cut-off sample usually ends mid-row.
pub fn sniff_delimiter(sample: &str) -> Option<u8> {
    let mut lines: Vec<&str> = sample.lines().collect();
    if lines.len() > 1 && !sample.ends_with('\n') {
        lines.pop();
    }
    let lines: Vec<&str> = lines
        .into_iter()
        .filter(|line| !line.trim().is_empty())
        .take(MAX_SNIFF_LINES)
        .collect();

    if lines.is_empty() {
        return None;
    }

    let mut best: Option<(u8, f64, usize)> = None;

    for &candidate in &CANDIDATE_DELIMITERS {
        let mut frequencies: HashMap<usize, usize> = HashMap::new();
        for line in &lines {
            *frequencies.entry(count_unquoted(line, candidate)).or_insert(0) += 1;
        }

        // Most frequent per-line count, preferring the larger count on ties
        let Some((&mode, &agreeing)) = frequencies
            .iter()
            .max_by_key(|(count, lines)| (**lines, **count))
        else {
            continue;
        };

        if mode == 0 {
            continue;
        }

        let consistency = agreeing as f64 / lines.len() as f64;
        debug!(
            "Delimiter {:?}: {} per line on {:.0}% of lines",
            candidate as char,
            mode,
            consistency * 100.0
        );

        if consistency < MIN_CONSISTENCY {
            continue;
        }

        let better = match best {
            None => true,
            Some((_, best_consistency, best_mode)) => {
                consistency > best_consistency
                    || (consistency == best_consistency && mode > best_mode)
            }
        };
        if better {
            best = Some((candidate, consistency, mode));
        }
    }

    best.map(|(delimiter, _, _)| delimiter)
}

/// Count occurrences of `delimiter` outside double-quoted sections.
fn count_unquoted(line: &str, delimiter: u8) -> usize {
    let mut in_quotes = false;
    let mut count = 0;
    for &b in line.as_bytes() {
        if b == b'"' {
            in_quotes = !in_quotes;
        } else if b == delimiter && !in_quotes {
            count += 1;
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comma() {
        let sample = "SCO,Facility Code,Begin Date\nA,B,C\nD,E,F\n";
        assert_eq!(sniff_delimiter(sample), Some(b','));
    }

    #[test]
    fn test_semicolon_with_commas_in_values() {
        let sample = "SCO;Facility Code;Begin Date\n\"AGNEW, J\";F1;10/01/2025\n\"POST, T\";F2;10/02/2025\n";
        assert_eq!(sniff_delimiter(sample), Some(b';'));
    }

    #[test]
    fn test_tab() {
        let sample = "a\tb\tc\n1\t2\t3\n4\t5\t6\n";
        assert_eq!(sniff_delimiter(sample), Some(b'\t'));
    }

    #[test]
    fn test_pipe() {
        let sample = "a|b\n1|2\n3|4\n";
        assert_eq!(sniff_delimiter(sample), Some(b'|'));
    }

    #[test]
    fn test_operator_semicolon_inside_quotes_is_ignored() {
        let sample = "SCO,Facility Code\n\"AGNEW; JACQUELINE\",F1\n\"POST; TODD\",F2\n";
        assert_eq!(sniff_delimiter(sample), Some(b','));
    }

    #[test]
    fn test_single_column_fails() {
        assert_eq!(sniff_delimiter("Name\nAlice\nBob\n"), None);
    }

    #[test]
    fn test_empty_fails() {
        assert_eq!(sniff_delimiter(""), None);
        assert_eq!(sniff_delimiter("\n\n"), None);
    }

    #[test]
    fn test_inconsistent_sample_fails() {
        let sample = "a,b,c\n1;2\n3|4|5|6\nx\n";
        assert_eq!(sniff_delimiter(sample), None);
    }

    #[test]
    fn test_truncated_last_line_is_ignored() {
        let sample = "a;b;c\n1;2;3\n4;5;6\n7;8";
        assert_eq!(sniff_delimiter(sample), Some(b';'));
    }

    #[test]
    fn test_count_unquoted() {
        assert_eq!(count_unquoted("a,\"b,c\",d", b','), 2);
        assert_eq!(count_unquoted("", b','), 0);
    }
}
