//! Filtering, sorting, paging, and aggregate counts for interactive use.
//!
//! The dashboard collaborator sends filter expressions of the form
//! `{Column} contains value && {Other} contains value`, where a value
//! encodes OR with commas, AND with pluses, negation with a leading `!`,
//! and may be quoted to embed those characters literally. The `Location`
//! column has bespoke semantics: its value is genome-browser syntax and
//! matches records whose interval is fully contained in the query
//! interval. Malformed location values match nothing rather than raising,
//! so interactive use degrades gracefully.
//!
//! [`QueryEngine::query`] answers one page plus aggregate counts computed
//! over the *full* filtered set, so the dashboard's graphs stay consistent
//! with its table.

use std::cmp::Ordering;

use serde::Serialize;

use crate::{
    coordinate::{Coordinate, NameOrder},
    correct::{Consequence, ALLELE_COLUMN, CONSEQUENCE_COLUMN, UPLOADED_VARIATION_COLUMN},
    error::VarTableError,
    expand::{DISPERSED_DUPLICATION, DISPERSED_INSERTION, SVTYPE_KEY},
    info::InfoField,
    table::{Record, VariantTable, ID_COLUMN, INFO_COLUMN, LOCATION_COLUMN},
};

/// The conjunction token between filter predicates.
pub const FILTER_CONJUNCTION: &str = " && ";

/// The predictor's gene-identifier column.
pub const GENE_COLUMN: &str = "Gene";

/// Every consequence term the predictor can annotate; aggregate counts
/// report them in this order. Some are never produced for structural
/// variants but are counted all the same.
pub const CONSEQUENCE_TERMS: &[&str] = &[
    "transcript_ablation",
    "splice_acceptor_variant",
    "splice_donor_variant",
    "stop_gained",
    "frameshift_variant",
    "stop_lost",
    "start_lost",
    "transcript_amplification",
    "inframe_insertion",
    "inframe_deletion",
    "missense_variant",
    "protein_altering_variant",
    "splice_region_variant",
    "incomplete_terminal_codon_variant",
    "start_retained_variant",
    "stop_retained_variant",
    "synonymous_variant",
    "coding_sequence_variant",
    "mature_miRNA_variant",
    "5_prime_UTR_variant",
    "3_prime_UTR_variant",
    "non_coding_transcript_exon_variant",
    "intron_variant",
    "NMD_transcript_variant",
    "non_coding_transcript_variant",
    "upstream_gene_variant",
    "downstream_gene_variant",
    "TFBS_ablation",
    "TFBS_amplification",
    "TF_binding_site_variant",
    "regulatory_region_ablation",
    "regulatory_region_amplification",
    "feature_elongation",
    "regulatory_region_variant",
    "feature_truncation",
    "intergenic_variant",
];

/// One `{Column} contains value` clause of a filter expression.
#[derive(Clone, Debug, PartialEq)]
pub struct Predicate {
    pub column: String,
    pub negated: bool,
    /// Quoted values match as one literal substring; the `,`/`+` operators
    /// only apply to unquoted values.
    literal: bool,
    value: String,
}

impl Predicate {
    /// Parse a single clause; `None` for clauses without a `contains`
    /// token or a braced column name (which the dashboard never sends, and
    /// which are ignored rather than failing the whole expression).
    fn parse(clause: &str) -> Option<Self> {
        let (name_part, value_part) = clause.split_once("contains")?;
        let open = name_part.find('{')?;
        let close = name_part.rfind('}')?;
        if close <= open {
            return None;
        }
        let column = name_part[open + 1..close].to_string();

        let mut value = value_part.trim().to_string();
        let negated = value.starts_with('!');
        if negated {
            value = value[1..].to_string();
        }
        // strip matching quotes and unescape embedded ones
        let mut literal = false;
        if let Some(first) = value.chars().next() {
            if value.len() >= 2
                && (first == '\'' || first == '"' || first == '`')
                && value.ends_with(first)
            {
                value =
                    value[1..value.len() - 1].replace(&format!("\\{}", first), &first.to_string());
                literal = true;
            }
        }
        Some(Self {
            column,
            negated,
            literal,
            value,
        })
    }

    pub fn matches(&self, record: &Record) -> bool {
        let matched = if self.column == LOCATION_COLUMN {
            self.matches_location(record)
        } else {
            self.matches_value(record)
        };
        matched != self.negated
    }

    /// Plus-separated groups must all match; comma-separated alternatives
    /// within a group are substring alternatives. Unknown columns match
    /// nothing.
    fn matches_value(&self, record: &Record) -> bool {
        let Some(field) = record.get(&self.column) else {
            return false;
        };
        if self.literal {
            return field.contains(&self.value);
        }
        self.value
            .split('+')
            .all(|group| group.split(',').any(|alternative| field.contains(alternative)))
    }

    /// Genome-browser queries: the record's chromosome must equal the
    /// query's, and its interval must lie fully inside the query interval.
    /// Comma-separated query ranges are alternatives; malformed ranges
    /// match nothing.
    fn matches_location(&self, record: &Record) -> bool {
        let Some(coordinate) = record
            .get(LOCATION_COLUMN)
            .and_then(|cell| Coordinate::parse(cell).ok())
        else {
            return false;
        };
        let contains = |alternative: &str| match Coordinate::parse(alternative.trim()) {
            Ok(query) => {
                coordinate.chrom == query.chrom
                    && coordinate.start >= query.start
                    && coordinate.end <= query.end
            }
            Err(_) => false,
        };
        if self.literal {
            return contains(&self.value);
        }
        self.value.split(',').any(contains)
    }
}

/// A parsed filter expression: the conjunction of its predicates.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Filter {
    predicates: Vec<Predicate>,
}

impl Filter {
    pub fn parse(expression: &str) -> Self {
        let predicates = expression
            .split(FILTER_CONJUNCTION)
            .filter_map(Predicate::parse)
            .collect();
        Self { predicates }
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.predicates.iter().all(|predicate| predicate.matches(record))
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// One element of a chained sort specification.
#[derive(Clone, Debug)]
pub struct SortKey {
    pub column: String,
    pub direction: Direction,
}

impl SortKey {
    /// Parse `column`, `column:asc`, or `column:desc`.
    pub fn parse(spec: &str) -> Result<Self, VarTableError> {
        let (column, direction) = match spec.rsplit_once(':') {
            Some((column, "asc")) => (column, Direction::Ascending),
            Some((column, "desc")) => (column, Direction::Descending),
            Some(_) => return Err(VarTableError::InvalidSortSpec(spec.to_string())),
            None => (spec, Direction::Ascending),
        };
        if column.is_empty() {
            return Err(VarTableError::InvalidSortSpec(spec.to_string()));
        }
        Ok(Self {
            column: column.to_string(),
            direction,
        })
    }
}

/// Sort key for record identifiers: numeric prefix first, and a bare ID
/// before its `.i`-derived counterpart.
fn id_sort_key(id: &str) -> (NameOrder, bool) {
    match id.split_once('.') {
        Some((prefix, _)) => (NameOrder::from_name(prefix), true),
        None => (NameOrder::from_name(id), false),
    }
}

fn is_id_column(column: &str) -> bool {
    column == ID_COLUMN || column == UPLOADED_VARIATION_COLUMN
}

fn compare_by_column(a: &Record, b: &Record, column: &str) -> Ordering {
    if column == LOCATION_COLUMN {
        let coordinate = |record: &Record| {
            record
                .get(LOCATION_COLUMN)
                .and_then(|cell| Coordinate::parse(cell).ok())
        };
        // unparsable locations sort last
        match (coordinate(a), coordinate(b)) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    } else if is_id_column(column) {
        id_sort_key(a.get(column).unwrap_or("")).cmp(&id_sort_key(b.get(column).unwrap_or("")))
    } else {
        a.get(column).unwrap_or("").cmp(b.get(column).unwrap_or(""))
    }
}

/// Compose a chained sort into one comparator, first key primary. With a
/// stable sort this makes chains order-independent of the input, but
/// equal-location records keep no guaranteed order unless the caller adds
/// an ID key as tiebreaker.
fn compare_records(a: &Record, b: &Record, keys: &[SortKey]) -> Ordering {
    for key in keys {
        let ordering = compare_by_column(a, b, &key.column);
        let ordering = match key.direction {
            Direction::Ascending => ordering,
            Direction::Descending => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Counts of the variant types in a filtered set, deduplicated by ID and
/// excluding the synthetic dispersed-insertion records (so a variant
/// overlapping several transcripts counts once, and a dispersed
/// duplication does not also count through its insertion site).
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TypeCounts {
    pub insertions: usize,
    pub deletions: usize,
    pub dispersed_duplications: usize,
    pub tandem_duplications: usize,
}

/// A named aggregate count (consequence term or chromosome).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CountEntry {
    pub name: String,
    pub count: usize,
}

/// One page of query results plus aggregates over the full filtered set.
#[derive(Clone, Debug)]
pub struct QueryResult {
    pub records: Vec<Record>,
    pub total: usize,
    pub types: TypeCounts,
    pub consequences: Vec<CountEntry>,
    pub chromosomes: Vec<CountEntry>,
}

/// Read-only filter/sort/count interface over a loaded table.
pub struct QueryEngine<'a> {
    table: &'a VariantTable,
}

impl<'a> QueryEngine<'a> {
    pub fn new(table: &'a VariantTable) -> Self {
        Self { table }
    }

    fn filtered(&self, filter: &Filter) -> Vec<&'a Record> {
        self.table
            .records()
            .map(|(_, record)| record)
            .filter(|record| filter.matches(record))
            .collect()
    }

    fn sorted(&self, filter: &Filter, sort: &[SortKey]) -> Vec<&'a Record> {
        let mut records = self.filtered(filter);
        if !sort.is_empty() {
            records.sort_by(|a, b| compare_records(a, b, sort));
        }
        records
    }

    /// Answer one page of the filtered, sorted record set, with aggregate
    /// counts computed over the whole filtered set (not just the page).
    pub fn query(
        &self,
        filter: &Filter,
        sort: &[SortKey],
        page: usize,
        page_size: usize,
    ) -> QueryResult {
        let records = self.sorted(filter, sort);
        let total = records.len();
        let types = type_counts(&records);
        let consequences = consequence_counts(&records);
        let chromosomes = chromosome_counts(&records);

        let start = total.min(page.saturating_mul(page_size));
        let end = total.min(start + page_size);
        let page_records = records[start..end].iter().map(|record| (*record).clone()).collect();

        QueryResult {
            records: page_records,
            total,
            types,
            consequences,
            chromosomes,
        }
    }

    /// The distinct values of `column` over the filtered set, in order of
    /// first appearance. Empty and `-` (the predictor's "absent") values
    /// are skipped; used to build gene study sets for enrichment tools.
    pub fn unique_values(&self, filter: &Filter, column: &str) -> Vec<String> {
        let mut seen = Vec::new();
        for record in self.filtered(filter) {
            let Some(value) = record.get(column) else {
                continue;
            };
            if value.is_empty() || value == "-" {
                continue;
            }
            if !seen.iter().any(|existing: &String| existing == value) {
                seen.push(value.to_string());
            }
        }
        seen
    }

    /// Write the whole filtered, sorted set (not a page) as comma-separated
    /// values with a header row, for download-style export.
    pub fn export_csv<W: std::io::Write>(
        &self,
        filter: &Filter,
        sort: &[SortKey],
        writer: W,
    ) -> Result<(), VarTableError> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(&self.table.columns)?;
        for record in self.sorted(filter, sort) {
            csv_writer.write_record(
                self.table
                    .columns
                    .iter()
                    .map(|column| record.get(column).unwrap_or("")),
            )?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}

/// The identifier used for deduplication: the ID column, falling back to
/// the predictor's identifier column.
fn record_id<'a>(record: &'a Record) -> Option<&'a str> {
    record
        .get(ID_COLUMN)
        .or_else(|| record.get(UPLOADED_VARIATION_COLUMN))
}

fn svtype(record: &Record) -> Option<String> {
    let cell = record.get(INFO_COLUMN)?;
    InfoField::parse(cell).get(SVTYPE_KEY).map(|value| value.to_string())
}

/// Deduplicate by ID and drop synthetic insertion-site records, yielding
/// the record set the type and chromosome counts run over.
fn distinct_variants<'a>(records: &[&'a Record]) -> Vec<&'a Record> {
    let mut seen: Vec<&str> = Vec::new();
    let mut distinct = Vec::new();
    for record in records {
        if let Some(id) = record_id(record) {
            if seen.contains(&id) {
                continue;
            }
            seen.push(id);
        }
        if svtype(record).as_deref() == Some(DISPERSED_INSERTION) {
            continue;
        }
        distinct.push(*record);
    }
    distinct
}

fn type_counts(records: &[&Record]) -> TypeCounts {
    let mut counts = TypeCounts::default();
    for record in distinct_variants(records) {
        match record.get(ALLELE_COLUMN) {
            Some("insertion") => counts.insertions += 1,
            Some("deletion") => counts.deletions += 1,
            _ => {}
        }
        match svtype(record).as_deref() {
            Some(DISPERSED_DUPLICATION) => counts.dispersed_duplications += 1,
            Some("DUP:TANDEM") => counts.tandem_duplications += 1,
            _ => {}
        }
    }
    counts
}

/// Per-term consequence counts over all records (not ID-deduplicated: a
/// variant consequence is counted once per overlapped transcript). Zero
/// entries are omitted.
fn consequence_counts(records: &[&Record]) -> Vec<CountEntry> {
    let consequences: Vec<Consequence> = records
        .iter()
        .filter_map(|record| record.get(CONSEQUENCE_COLUMN))
        .map(Consequence::parse)
        .collect();
    CONSEQUENCE_TERMS
        .iter()
        .map(|term| CountEntry {
            name: term.to_string(),
            count: consequences
                .iter()
                .filter(|consequence| consequence.contains(term))
                .count(),
        })
        .filter(|entry| entry.count != 0)
        .collect()
}

/// Per-chromosome variant counts (ID-deduplicated, synthetic records
/// excluded), in order of first appearance in the filtered set.
fn chromosome_counts(records: &[&Record]) -> Vec<CountEntry> {
    let mut counts: indexmap::IndexMap<String, usize> = indexmap::IndexMap::new();
    for record in distinct_variants(records) {
        let Some(coordinate) = record
            .get(LOCATION_COLUMN)
            .and_then(|cell| Coordinate::parse(cell).ok())
        else {
            continue;
        };
        *counts.entry(coordinate.chrom).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .map(|(name, count)| CountEntry { name, count })
        .collect()
}
