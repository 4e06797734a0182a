//! Types and methods for reading input and writing output.

pub mod file;
pub mod tsv;

pub use file::{InputFile, OutputFile};
pub use tsv::VARIANT_TSV;
