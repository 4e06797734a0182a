//! The semicolon-delimited `KEY=VALUE` micro-format embedded in INFO-like
//! columns.
//!
//! Both the VCF `INFO` column and the VEP `Extra` column pack sub-fields
//! into a single cell as `KEY=VALUE;KEY=VALUE;...`, with the occasional
//! value-less flag (e.g. `IMPRECISE`). [`InfoField`] parses a cell into an
//! ordered map so consuming logic never works on raw substrings.

use indexmap::IndexMap;

/// The sub-field separator within an INFO-like cell.
pub const SUBFIELD_DELIMITER: char = ';';

/// An ordered map of the sub-fields of a single INFO-like cell.
///
/// Duplicate sub-keys collapse to the last occurrence. Flag sub-fields
/// (no `=`) are stored with an empty value and re-serialized without one.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InfoField {
    entries: IndexMap<String, String>,
}

impl InfoField {
    /// Parse an INFO-like cell. Empty sub-fields (e.g. from a trailing
    /// semicolon) are dropped.
    pub fn parse(cell: &str) -> Self {
        let mut entries = IndexMap::new();
        for part in cell.split(SUBFIELD_DELIMITER) {
            if part.is_empty() {
                continue;
            }
            match part.split_once('=') {
                Some((key, value)) => entries.insert(key.to_string(), value.to_string()),
                None => entries.insert(part.to_string(), String::new()),
            };
        }
        Self { entries }
    }

    /// Get a sub-field value. Flags yield `Some("")`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(|value| value.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert or overwrite a sub-field, appending it if new.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Remove a sub-field, preserving the order of the remaining entries.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.shift_remove(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

impl std::fmt::Display for InfoField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let joined = self
            .entries
            .iter()
            .map(|(key, value)| {
                if value.is_empty() {
                    key.clone()
                } else {
                    format!("{}={}", key, value)
                }
            })
            .collect::<Vec<_>>()
            .join(";");
        write!(f, "{}", joined)
    }
}

/// Scan a raw INFO-like cell for the *first* occurrence of `key` and return
/// its value.
///
/// [`InfoField`] collapses duplicate sub-keys to the last occurrence;
/// coordinate derivation is contractually bound to the first `END=` entry,
/// so it goes through this function instead.
pub fn first_value<'a>(cell: &'a str, key: &str) -> Option<&'a str> {
    cell.split(SUBFIELD_DELIMITER)
        .filter_map(|part| part.split_once('='))
        .find(|(k, _)| *k == key)
        .map(|(_, value)| value)
}
