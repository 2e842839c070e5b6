//! Operator label normalization.
//!
//! Operators export their own name as `LAST; FIRST`, with inconsistent case, stray
//! whitespace and the occasional typo. The map folds those raw labels onto a short
//! display name.

use crate::error::Result;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Raw label to display name, as shipped. Misspellings are kept as aliases.
const BUILTIN_ENTRIES: [(&str, &str); 16] = [
    ("CRUZ; ASHLIE", "Ashlie"),
    ("FITZGERALD; ZACHARY", "Zach"),
    ("GRABARZ; FRANK", "Frank"),
    ("JACKS; MELISSSA", "Melissa"),
    ("MCAFEE; CLIFFORD", "Clif"),
    ("POST; TODD", "Todd"),
    ("RAINS; SAVANNA", "Savanna"),
    ("WOJTIUK; BRADLEY", "Brad"),
    ("MOULDEN; MATTHEW", "Matthew"),
    ("VANDA; JESSICA", "Jessica"),
    ("EMOND; ELIJAH", "Elijah"),
    ("BUTTERFIELD; KATHERINE", "Katherine"),
    ("COSS; SAVANNA", "Savanna"),
    ("MONTROS; DENNIS", "Dennis"),
    ("AGNEW; JACQUELINE", "Jackie"),
    ("AGNEW; JAQUELINE", "Jackie"),
];

static BUILTIN: Lazy<OperatorMap> = Lazy::new(|| OperatorMap::from_pairs(BUILTIN_ENTRIES));

/// Normalize a raw operator label: non-breaking spaces folded, trimmed, uppercased.
pub fn normalize_operator(raw: &str) -> String {
    raw.replace('\u{00A0}', " ").trim().to_uppercase()
}

/// Immutable mapping from normalized operator labels to display names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperatorMap {
    entries: HashMap<String, String>,
}

impl OperatorMap {
    /// The shipped table.
    pub fn builtin() -> Self {
        BUILTIN.clone()
    }

    /// Build a map from `(raw, display)` pairs. Keys are normalized on insert.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        let entries = pairs
            .into_iter()
            .map(|(raw, display)| (normalize_operator(raw.as_ref()), display.into()))
            .collect();
        Self { entries }
    }

    /// Load a JSON object of `{"LAST; FIRST": "Display"}` entries.
    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self> {
        let raw: HashMap<String, String> = serde_json::from_reader(reader)?;
        Ok(Self::from_pairs(raw))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_json_reader(BufReader::new(file))
    }

    /// Overlay `other` on this map; its entries win on conflict.
    pub fn merged_with(mut self, other: OperatorMap) -> Self {
        self.entries.extend(other.entries);
        self
    }

    /// Display name for a raw label, if mapped.
    pub fn lookup(&self, raw: &str) -> Option<&str> {
        self.entries.get(&normalize_operator(raw)).map(String::as_str)
    }

    /// Display name for a raw cell. Unmapped and missing values yield `""`.
    pub fn display_name(&self, raw: Option<&str>) -> &str {
        raw.and_then(|r| self.lookup(r)).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
