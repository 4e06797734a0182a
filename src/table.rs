//! The keyed tabular store for VCF-like and VEP-like annotation files.
//!
//! A [`VariantTable`] holds three things: the `##`-prefixed metadata lines
//! (verbatim, in order), the column-name sequence from the single
//! `#`-prefixed header line, and an insertion-ordered map from record key
//! to [`Record`]. Records are untyped string fields; all semantic
//! interpretation (positions, INFO sub-fields) happens in consuming logic.
//!
//! [`VariantTable::render()`] is the one serialization path: it emits the
//! metadata, the column header, and the records sorted by their derived
//! [`Coordinate`] with a caller-chosen secondary column, and it never
//! mutates the table, so repeated calls are byte-identical.

use std::path::PathBuf;

use indexmap::IndexMap;

use crate::{
    coordinate::Coordinate,
    error::VarTableError,
    io::{
        tsv::{TsvConfig, VARIANT_TSV},
        InputFile,
    },
};

/// Prefix of opaque, order-preserved metadata lines.
pub const METADATA_PREFIX: &str = "##";
/// Prefix of the single column-header line (stripped on load).
pub const HEADER_PREFIX: &str = "#";
/// The field delimiter; no escaping of tabs within fields is supported.
pub const FIELD_DELIMITER: char = '\t';

pub const CHROM_COLUMN: &str = "CHROM";
pub const POS_COLUMN: &str = "POS";
pub const ID_COLUMN: &str = "ID";
pub const ALT_COLUMN: &str = "ALT";
pub const INFO_COLUMN: &str = "INFO";

/// The derived sorting field. Not part of the original column set; it is
/// only serialized if a caller adds it to the column sequence.
pub const LOCATION_COLUMN: &str = "Location";

/// What to do when two data rows map to the same key.
///
/// The upstream tools silently kept the last row, which is a latent
/// correctness hazard; [`DuplicateKeys::Reject`] makes it a load error.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DuplicateKeys {
    #[default]
    LastWins,
    Reject,
}

/// A single data row: a mapping from column name to raw string value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Record {
    fields: IndexMap<String, String>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields.get(column).map(|value| value.as_str())
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(column.into(), value.into());
    }

    pub fn contains(&self, column: &str) -> bool {
        self.fields.contains_key(column)
    }
}

/// An addressable in-memory annotation table.
#[derive(Clone, Debug, Default)]
pub struct VariantTable {
    /// Metadata header lines, verbatim and order-preserving.
    pub metadata: Vec<String>,
    /// The column-name sequence; defines the serialization order.
    pub columns: Vec<String>,
    records: IndexMap<String, Record>,
    key_column: Option<String>,
}

impl VariantTable {
    /// Parse tab-separated text with the default last-wins duplicate-key
    /// policy. See [`VariantTable::parse_with`].
    pub fn parse(text: &str, key_column: Option<&str>) -> Result<Self, VarTableError> {
        Self::parse_with(text, key_column, DuplicateKeys::default())
    }

    /// Parse tab-separated text into a table.
    ///
    /// Lines starting with `##` are metadata, the line starting with a
    /// single `#` (stripped) supplies the column names, and all other
    /// non-blank lines are data rows split positionally against the column
    /// sequence. Short rows leave trailing columns empty; overflow fields
    /// are folded into the last column rather than dropped.
    ///
    /// Records are keyed by `key_column` when given (which must be a
    /// declared column), else by their position (`"0"`, `"1"`, ...).
    pub fn parse_with(
        text: &str,
        key_column: Option<&str>,
        on_duplicates: DuplicateKeys,
    ) -> Result<Self, VarTableError> {
        let mut metadata = Vec::new();
        let mut columns: Option<Vec<String>> = None;
        let mut rows = Vec::new();

        for line in text.lines() {
            if line.starts_with(METADATA_PREFIX) {
                metadata.push(line.to_string());
            } else if let Some(header) = line.strip_prefix(HEADER_PREFIX) {
                columns = Some(
                    header
                        .split(FIELD_DELIMITER)
                        .map(|name| name.to_string())
                        .collect(),
                );
            } else if !line.is_empty() {
                rows.push(line);
            }
        }

        let columns = columns.ok_or(VarTableError::MissingColumnHeader)?;
        if let Some(name) = key_column {
            if !columns.iter().any(|column| column == name) {
                return Err(VarTableError::MissingKeyColumn(name.to_string()));
            }
        }

        let mut records = IndexMap::new();
        for (index, row) in rows.iter().enumerate() {
            // a trailing delimiter is a format quirk, not an extra field
            let row = row.strip_suffix(FIELD_DELIMITER).unwrap_or(row);
            let mut record = Record::new();
            let mut fields = row.splitn(columns.len(), FIELD_DELIMITER);
            for column in &columns {
                record.set(column, fields.next().unwrap_or(""));
            }
            let key = match key_column {
                Some(name) => record.get(name).unwrap_or("").to_string(),
                None => index.to_string(),
            };
            if on_duplicates == DuplicateKeys::Reject && records.contains_key(&key) {
                return Err(VarTableError::DuplicateKey(key, row.to_string()));
            }
            records.insert(key, record);
        }

        Ok(Self {
            metadata,
            columns,
            records,
            key_column: key_column.map(|name| name.to_string()),
        })
    }

    /// Read a table from a plaintext or gzip-compressed file.
    pub fn from_path(
        filepath: impl Into<PathBuf>,
        key_column: Option<&str>,
        on_duplicates: DuplicateKeys,
    ) -> Result<Self, VarTableError> {
        let text = InputFile::new(filepath).read_to_string()?;
        Self::parse_with(&text, key_column, on_duplicates)
    }

    pub fn get(&self, key: &str) -> Option<&Record> {
        self.records.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Record> {
        self.records.get_mut(key)
    }

    /// Insert a record under `key`; an existing record is overwritten.
    pub fn set(&mut self, key: impl Into<String>, record: Record) {
        self.records.insert(key.into(), record);
    }

    pub fn delete(&mut self, key: &str) -> Option<Record> {
        self.records.shift_remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.records.keys()
    }

    pub fn records(&self) -> impl Iterator<Item = (&String, &Record)> {
        self.records.iter()
    }

    pub fn records_mut(&mut self) -> impl Iterator<Item = (&String, &mut Record)> {
        self.records.iter_mut()
    }

    /// Get the total number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Return whether the table contains no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn key_column(&self) -> Option<&str> {
        self.key_column.as_deref()
    }

    /// Declare an additional column. Every record must carry the field
    /// before [`VariantTable::render()`] is called, or rendering fails.
    pub fn add_column(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.columns.iter().any(|column| *column == name) {
            self.columns.push(name);
        }
    }

    /// Attach the derived `Location` field to every record, from its
    /// CHROM/POS columns and the first `END=` INFO sub-field. VCF-origin
    /// tables need this before rendering; VEP-origin tables already carry a
    /// `Location` column.
    pub fn add_locations(&mut self) -> Result<(), VarTableError> {
        for (key, record) in self.records.iter_mut() {
            let coordinate = Coordinate::from_record(key, record)?;
            record.set(LOCATION_COLUMN, coordinate.to_string());
        }
        Ok(())
    }

    /// Serialize the table with the standard output configuration. See
    /// [`VariantTable::render_with`].
    pub fn render(&self, sort_column: &str) -> Result<String, VarTableError> {
        self.render_with(sort_column, &VARIANT_TSV)
    }

    /// Serialize the table: metadata lines, the `#`-prefixed column header,
    /// then every record sorted ascending by `(Coordinate, sort_column)`.
    ///
    /// The secondary column breaks ties between records sharing a
    /// breakpoint (e.g. a dispersed duplication and another variant at the
    /// same position), which keeps output deterministic. Rendering borrows
    /// the table immutably, so repeated calls yield identical text.
    pub fn render_with(
        &self,
        sort_column: &str,
        config: &TsvConfig,
    ) -> Result<String, VarTableError> {
        let mut order = Vec::with_capacity(self.records.len());
        for (key, record) in &self.records {
            let location = record.get(LOCATION_COLUMN).ok_or_else(|| {
                VarTableError::RecordMissingField(key.clone(), LOCATION_COLUMN.to_string())
            })?;
            let secondary = record.get(sort_column).ok_or_else(|| {
                VarTableError::RecordMissingField(key.clone(), sort_column.to_string())
            })?;
            let coordinate = Coordinate::parse(location)?;
            order.push((coordinate.sort_key(), secondary.to_string(), key));
        }
        // stable: records tied on (coordinate, secondary) keep load order
        order.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

        let mut out = String::new();
        for line in &self.metadata {
            out.push_str(line);
            out.push('\n');
        }
        out.push_str(HEADER_PREFIX);
        out.push_str(&self.columns.join("\t"));
        out.push('\n');

        for (_, _, key) in &order {
            let record = &self.records[*key];
            for (position, column) in self.columns.iter().enumerate() {
                let value = record.get(column).ok_or_else(|| {
                    VarTableError::RenderMissingField((*key).clone(), column.clone())
                })?;
                out.push_str(value);
                if config.trailing_delimiter || position + 1 < self.columns.len() {
                    out.push(FIELD_DELIMITER);
                }
            }
            out.push('\n');
        }
        Ok(out)
    }
}
