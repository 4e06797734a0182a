//! Genomic coordinates in genome-browser syntax, and their total order.
//!
//! Every sort in VarTable runs off [`Coordinate`]'s ordering: numbered
//! chromosomes compare as integers and always sort before named ones
//! (`1 < 2 < 10 < X < Y`), then start, then end. The same numbered-first
//! scheme is reused for record IDs via [`NameOrder`].

use crate::{
    error::VarTableError,
    info::first_value,
    table::{Record, CHROM_COLUMN, INFO_COLUMN, POS_COLUMN},
    Position,
};
use std::cmp::Ordering;

/// A sort key for names that may or may not be integers.
///
/// Derived ordering: all [`NameOrder::Numbered`] values (numeric compare)
/// sort before all [`NameOrder::Named`] values (lexical compare).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum NameOrder {
    Numbered(u64),
    Named(String),
}

impl NameOrder {
    pub fn from_name(name: &str) -> Self {
        match name.parse::<u64>() {
            Ok(number) => NameOrder::Numbered(number),
            Err(_) => NameOrder::Named(name.to_string()),
        }
    }
}

/// A chromosome interval. Insertions are point features with
/// `start == end`; `start <= end` is deliberately not enforced.
#[derive(Clone, Debug)]
pub struct Coordinate {
    pub chrom: String,
    pub start: Position,
    pub end: Position,
}

impl Coordinate {
    pub fn new(chrom: impl Into<String>, start: Position, end: Position) -> Self {
        Self {
            chrom: chrom.into(),
            start,
            end,
        }
    }

    /// Derive a coordinate from a record's CHROM/POS columns and the first
    /// `END=` sub-field of its INFO column. Records without an `END=`
    /// sub-field (insertions) get `end == start`.
    pub fn from_record(key: &str, record: &Record) -> Result<Self, VarTableError> {
        let chrom = record
            .get(CHROM_COLUMN)
            .ok_or_else(|| VarTableError::RecordMissingField(key.to_string(), CHROM_COLUMN.to_string()))?;
        let pos = record
            .get(POS_COLUMN)
            .ok_or_else(|| VarTableError::RecordMissingField(key.to_string(), POS_COLUMN.to_string()))?;
        let start: Position = pos
            .parse()
            .map_err(|_| VarTableError::InvalidPosition(chrom.to_string(), pos.to_string()))?;
        let end = match record.get(INFO_COLUMN).and_then(|info| first_value(info, "END")) {
            Some(value) => value
                .parse()
                .map_err(|_| VarTableError::InvalidPosition(chrom.to_string(), value.to_string()))?,
            None => start,
        };
        Ok(Self::new(chrom, start, end))
    }

    /// Parse genome-browser syntax: `chrom:start-end`, or the
    /// single-position form `chrom:pos` used for insertion sites.
    pub fn parse(location: &str) -> Result<Self, VarTableError> {
        let invalid = || VarTableError::InvalidLocation(location.to_string());
        let (chrom, span) = location.split_once(':').ok_or_else(invalid)?;
        if chrom.is_empty() {
            return Err(invalid());
        }
        let (start, end) = match span.split_once('-') {
            Some((start, end)) => (
                start.parse().map_err(|_| invalid())?,
                end.parse().map_err(|_| invalid())?,
            ),
            None => {
                let pos: Position = span.parse().map_err(|_| invalid())?;
                (pos, pos)
            }
        };
        Ok(Self::new(chrom, start, end))
    }

    /// The tuple every sort in the system compares on.
    pub fn sort_key(&self) -> (NameOrder, Position, Position) {
        (NameOrder::from_name(&self.chrom), self.start, self.end)
    }
}

impl std::fmt::Display for Coordinate {
    /// Always the range form, also for point features (`1:500-500`).
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}-{}", self.chrom, self.start, self.end)
    }
}

// Equality is defined through the sort key so that e.g. chromosomes "7" and
// "07" compare equal, keeping Ord consistent with PartialEq (a strict weak
// ordering).
impl PartialEq for Coordinate {
    fn eq(&self, other: &Self) -> bool {
        self.sort_key() == other.sort_key()
    }
}

impl Eq for Coordinate {}

impl PartialOrd for Coordinate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Coordinate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

#[cfg(test)]
mod tests {
    use super::{Coordinate, NameOrder};
    use crate::table::Record;
    use crate::test_utilities::random_coordinate;

    #[test]
    fn test_parse_range_and_point_forms() {
        let range = Coordinate::parse("1:100-200").unwrap();
        assert_eq!((range.start, range.end), (100, 200));

        let point = Coordinate::parse("X:500").unwrap();
        assert_eq!(point.chrom, "X");
        assert_eq!((point.start, point.end), (500, 500));

        assert!(Coordinate::parse("1:100-200-300").is_err());
        assert!(Coordinate::parse("1:abc-200").is_err());
        assert!(Coordinate::parse("no-colon").is_err());
    }

    #[test]
    fn test_display_always_range_form() {
        assert_eq!(Coordinate::new("2", 500, 500).to_string(), "2:500-500");
    }

    #[test]
    fn test_numbered_before_named() {
        let one = Coordinate::new("1", 100, 200);
        let ten = Coordinate::new("10", 1, 2);
        let x = Coordinate::new("X", 1, 2);
        let y = Coordinate::new("Y", 1, 2);
        assert!(one < ten); // numeric, not lexical
        assert!(ten < x);
        assert!(x < y);
    }

    #[test]
    fn test_from_record_uses_first_end() {
        let mut record = Record::new();
        record.set("CHROM", "3");
        record.set("POS", "100");
        record.set("INFO", "SVTYPE=DEL;END=250;END=900");
        let coord = Coordinate::from_record("0", &record).unwrap();
        assert_eq!((coord.start, coord.end), (100, 250));
    }

    #[test]
    fn test_from_record_insertion_end_is_start() {
        let mut record = Record::new();
        record.set("CHROM", "3");
        record.set("POS", "77");
        record.set("INFO", "SVTYPE=INS:DISPERSED");
        let coord = Coordinate::from_record("0", &record).unwrap();
        assert_eq!((coord.start, coord.end), (77, 77));
    }

    #[test]
    fn test_strict_weak_ordering_on_random_coordinates() {
        // exactly one of <, ==, > holds per pair; transitivity over triples
        let coords: Vec<_> = (0..60).map(|_| random_coordinate()).collect();
        for a in &coords {
            for b in &coords {
                let lt = a < b;
                let eq = a == b;
                let gt = a > b;
                assert_eq!([lt, eq, gt].iter().filter(|x| **x).count(), 1);
                for c in &coords {
                    if a <= b && b <= c {
                        assert!(a <= c);
                    }
                }
            }
        }
    }

    #[test]
    fn test_equal_chromosome_under_different_spelling() {
        assert_eq!(NameOrder::from_name("07"), NameOrder::Numbered(7));
        assert_eq!(Coordinate::new("07", 1, 2), Coordinate::new("7", 1, 2));
    }
}
