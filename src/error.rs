//! The [`VarTableError`] `enum` definition and error messages.
//!
use std::num::ParseIntError;
use thiserror::Error;

/// The [`VarTableError`] defines the standard set of errors that should
/// be passed to the user.
#[derive(Debug, Error)]
pub enum VarTableError {
    // IO related errors
    #[error("File reading error: {0}")]
    IOError(#[from] std::io::Error),

    // File parsing related errors
    #[error("Integer parsing error: {0}")]
    ParseIntError(#[from] ParseIntError),
    #[error("No column header line (a single '#'-prefixed line) was found before the data rows.")]
    MissingColumnHeader,
    #[error("Key column '{0}' is not declared in the column header.")]
    MissingKeyColumn(String),
    #[error("Duplicate key '{0}' encountered while loading in strict mode.\nLine: {1}")]
    DuplicateKey(String, String),

    // Coordinate errors
    #[error("Could not parse position '{1}' of record on chromosome '{0}'.")]
    InvalidPosition(String, String),
    #[error("Location '{0}' is not in genome-browser syntax ('chrom:start-end' or 'chrom:pos').")]
    InvalidLocation(String),

    // Record/render errors
    #[error("Record '{0}' has no field '{1}'.")]
    RecordMissingField(String, String),
    #[error("Record '{0}' lacks the declared column '{1}'; a column was added without being populated on every record.")]
    RenderMissingField(String, String),

    // Export errors
    #[error("CSV writing error: {0}")]
    CsvError(#[from] csv::Error),

    // Command line tool related errors
    #[error("Invalid sort specification: '{0}' (expected 'column' or 'column:asc|desc').")]
    InvalidSortSpec(String),
    #[error("Command line argument error: {0}")]
    ArgumentError(#[from] clap::error::Error),
}
