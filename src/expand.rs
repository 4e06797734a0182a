//! Expansion of dispersed duplications into synthetic insertion records.
//!
//! A dispersed duplication copies sequence to a distant genomic location.
//! Effect predictors only score the source interval, so the insertion site
//! would go un-annotated. This module synthesizes, for every
//! `SVTYPE=DUP:DISPERSED` record, a derived `<ID>.i` record placed at the
//! `INSCHROM`/`INSPOS` insertion site, so both breakpoints get scored.
//!
//! The scan is two-phase: all derived records are collected first and only
//! inserted after the full pass, so expansion never observes (or depends
//! on) a half-mutated table.

use crate::{
    error::VarTableError,
    info::InfoField,
    reporting::Report,
    table::{Record, VariantTable, ALT_COLUMN, CHROM_COLUMN, ID_COLUMN, INFO_COLUMN, POS_COLUMN},
};

pub const SVTYPE_KEY: &str = "SVTYPE";
pub const DISPERSED_DUPLICATION: &str = "DUP:DISPERSED";
pub const DISPERSED_INSERTION: &str = "INS:DISPERSED";

/// The ALT placeholder for synthesized insertions; the inserted sequence
/// itself is intentionally not reconstructed.
pub const INSERTION_PLACEHOLDER: &str = "<INS>";

/// Key suffix marking a record derived from a dispersed duplication.
pub const DERIVED_KEY_SUFFIX: &str = ".i";

const ALT_METADATA_PREFIX: &str = "##ALT=";
const DISPERSED_ALT_METADATA: &str =
    "##ALT=<ID=INS:DISPERSED,Description=\"Insertion site of dispersed duplication\">";

/// INFO sub-fields that describe the duplication, not the insertion site,
/// and are therefore dropped from the synthesized record.
const SOURCE_ONLY_SUBFIELDS: [&str; 4] = ["END", SVTYPE_KEY, "INSCHROM", "INSPOS"];

/// Synthesize an insertion record for every dispersed duplication in the
/// table and add the `##ALT` description line for the synthetic symbol.
/// Returns the number of records added.
///
/// Records whose INFO lacks the insertion-site sub-fields are skipped with
/// a warning rather than failing the run.
pub fn expand_dispersed_duplications(
    table: &mut VariantTable,
    report: &mut Report,
) -> Result<usize, VarTableError> {
    let mut synthesized: Vec<(String, Record)> = Vec::new();
    for (key, record) in table.records() {
        let Some(cell) = record.get(INFO_COLUMN) else {
            continue;
        };
        let info = InfoField::parse(cell);
        if info.get(SVTYPE_KEY) != Some(DISPERSED_DUPLICATION) {
            continue;
        }
        match insertion_record(key, record, &info) {
            Some(derived) => synthesized.push(derived),
            None => {
                let message = format!(
                    "record '{}' is a dispersed duplication without INSCHROM/INSPOS; \
                     no insertion record synthesized",
                    key
                );
                log::warn!("{}", message);
                report.add_issue(message);
            }
        }
    }

    let count = synthesized.len();
    for (key, record) in synthesized {
        table.set(key, record);
    }
    if count > 0 {
        add_alt_metadata(table);
    }
    Ok(count)
}

/// Build the derived insertion record: same fields as the duplication, with
/// CHROM/POS moved to the insertion site, a `.i`-suffixed ID, the ALT
/// placeholder, and an INFO stripped of the source-interval sub-fields.
fn insertion_record(key: &str, record: &Record, info: &InfoField) -> Option<(String, Record)> {
    let chrom = info.get("INSCHROM")?;
    let pos = info.get("INSPOS")?;

    let mut derived = record.clone();
    derived.set(CHROM_COLUMN, chrom);
    derived.set(POS_COLUMN, pos);
    derived.set(ALT_COLUMN, INSERTION_PLACEHOLDER);

    let mut derived_info = InfoField::default();
    for (subkey, value) in info.iter() {
        if !SOURCE_ONLY_SUBFIELDS.contains(&subkey) {
            derived_info.insert(subkey, value);
        }
    }
    derived_info.insert(SVTYPE_KEY, DISPERSED_INSERTION);
    derived.set(INFO_COLUMN, derived_info.to_string());

    let derived_key = format!("{}{}", key, DERIVED_KEY_SUFFIX);
    derived.set(ID_COLUMN, derived_key.clone());
    Some((derived_key, derived))
}

/// Insert the INS:DISPERSED description immediately after the contiguous
/// block of `##ALT=` metadata lines. Files without any `##ALT=` line are
/// left untouched; there is no sensible placement to guess.
fn add_alt_metadata(table: &mut VariantTable) {
    let Some(first) = table
        .metadata
        .iter()
        .position(|line| line.starts_with(ALT_METADATA_PREFIX))
    else {
        log::warn!("no ##ALT metadata block found; the INS:DISPERSED description was not added");
        return;
    };
    let mut end = first;
    while end < table.metadata.len() && table.metadata[end].starts_with(ALT_METADATA_PREFIX) {
        end += 1;
    }
    table
        .metadata
        .insert(end, DISPERSED_ALT_METADATA.to_string());
}

#[cfg(test)]
mod tests {
    use super::{expand_dispersed_duplications, DISPERSED_ALT_METADATA, INSERTION_PLACEHOLDER};
    use crate::info::InfoField;
    use crate::reporting::Report;
    use crate::table::VariantTable;
    use crate::test_utilities::sample_vcf_text;

    #[test]
    fn test_expansion_synthesizes_derived_record() {
        let mut table = VariantTable::parse(&sample_vcf_text(), Some("ID")).unwrap();
        let mut report = Report::new();
        let count = expand_dispersed_duplications(&mut table, &mut report).unwrap();
        assert_eq!(count, 1);
        assert!(report.is_empty());

        let derived = table.get("2.i").expect("derived record missing");
        assert_eq!(derived.get("CHROM"), Some("2"));
        assert_eq!(derived.get("POS"), Some("800"));
        assert_eq!(derived.get("ID"), Some("2.i"));
        assert_eq!(derived.get("ALT"), Some(INSERTION_PLACEHOLDER));

        let info = InfoField::parse(derived.get("INFO").unwrap());
        assert_eq!(info.get("SVTYPE"), Some("INS:DISPERSED"));
        for dropped in ["END", "INSCHROM", "INSPOS"] {
            assert!(!info.contains_key(dropped));
        }
        // the original duplication is untouched
        let original = table.get("2").unwrap();
        assert!(original.get("INFO").unwrap().contains("DUP:DISPERSED"));
    }

    #[test]
    fn test_alt_description_inserted_after_alt_block() {
        let mut table = VariantTable::parse(&sample_vcf_text(), Some("ID")).unwrap();
        let mut report = Report::new();
        expand_dispersed_duplications(&mut table, &mut report).unwrap();

        let alt_lines: Vec<usize> = table
            .metadata
            .iter()
            .enumerate()
            .filter(|(_, line)| line.starts_with("##ALT="))
            .map(|(index, _)| index)
            .collect();
        // contiguous block, with the new line as its last member
        assert_eq!(alt_lines, vec![1, 2, 3]);
        assert_eq!(table.metadata[3], DISPERSED_ALT_METADATA);
    }

    #[test]
    fn test_missing_insertion_site_skips_with_warning() {
        let text = "\
##fileformat=VCFv4.2
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO
1\t100\tv1\tN\t<DUP>\t.\tPASS\tSVTYPE=DUP:DISPERSED;END=400
";
        let mut table = VariantTable::parse(text, Some("ID")).unwrap();
        let mut report = Report::new();
        let count = expand_dispersed_duplications(&mut table, &mut report).unwrap();
        assert_eq!(count, 0);
        assert_eq!(report.entries().len(), 1);
        assert!(!table.contains_key("v1.i"));
    }

    #[test]
    fn test_no_alt_block_leaves_metadata_unchanged() {
        let text = "\
##fileformat=VCFv4.2
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO
1\t100\tv1\tN\t<DUP>\t.\tPASS\tSVTYPE=DUP:DISPERSED;END=400;INSCHROM=2;INSPOS=50
";
        let mut table = VariantTable::parse(text, Some("ID")).unwrap();
        let mut report = Report::new();
        expand_dispersed_duplications(&mut table, &mut report).unwrap();
        assert_eq!(table.metadata, vec!["##fileformat=VCFv4.2".to_string()]);
        assert!(table.contains_key("v1.i"));
    }
}
