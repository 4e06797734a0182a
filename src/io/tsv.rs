//! TSV serializing helpers, functionality, etc.

use lazy_static::lazy_static;

lazy_static! {
    /// The standard annotation-table TSV configuration: upstream consumers
    /// expect a tab *after* the last field of every data row, so that quirk
    /// is on by default.
    pub static ref VARIANT_TSV: TsvConfig = TsvConfig {
        trailing_delimiter: true,
    };
}

/// This is an extensible type to handle common TSV output configurations.
pub struct TsvConfig {
    /// Emit a field delimiter after the last column of each data row.
    pub trailing_delimiter: bool,
}
