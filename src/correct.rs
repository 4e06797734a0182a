//! Correction of known mis-annotations in variant-effect-predictor output.
//!
//! The upstream predictor scores structural variants imperfectly: coding
//! insertions get no frameshift/inframe call (it never sees the inserted
//! sequence length), duplications overlapping a start codon are flagged
//! `start_lost` even though the original start remains, deletions removing
//! a start codon through the 5' UTR are missed, and full-gene duplications
//! and deletions are not promoted to `transcript_amplification` /
//! `transcript_ablation`. [`AnnotationCorrector`] repairs all of these with
//! a fixed, ordered rule set and finally copies caller-side columns (INFO
//! by default) from the variant table into the prediction table.
//!
//! Consequences are manipulated as token lists and `Extra` as a sub-field
//! map, never as raw substrings, so each rule's effect is auditable in
//! isolation.

use crate::{
    error::VarTableError,
    expand::INSERTION_PLACEHOLDER,
    info::InfoField,
    reporting::Report,
    table::{Record, VariantTable, ALT_COLUMN, INFO_COLUMN},
};

pub const UPLOADED_VARIATION_COLUMN: &str = "Uploaded_variation";
pub const ALLELE_COLUMN: &str = "Allele";
pub const CONSEQUENCE_COLUMN: &str = "Consequence";
pub const EXTRA_COLUMN: &str = "Extra";

/// The `Extra` sub-field holding the severity token.
pub const IMPACT_KEY: &str = "IMPACT";
/// The `Extra` sub-field with the percentage of a transcript covered by
/// the variant.
pub const OVERLAP_PC_KEY: &str = "OverlapPC";

const ALLELE_INSERTION: &str = "insertion";
const ALLELE_DELETION: &str = "deletion";
const ALLELE_DUPLICATION: &str = "duplication";

/// A comma-joined set of predicted consequence terms, manipulated as
/// whole tokens.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Consequence {
    terms: Vec<String>,
}

impl Consequence {
    pub fn parse(cell: &str) -> Self {
        let terms = cell
            .split(',')
            .filter(|term| !term.is_empty())
            .map(|term| term.to_string())
            .collect();
        Self { terms }
    }

    /// Whole-token membership, not substring containment.
    pub fn contains(&self, term: &str) -> bool {
        self.terms.iter().any(|existing| existing == term)
    }

    pub fn push(&mut self, term: &str) {
        self.terms.push(term.to_string());
    }

    pub fn remove(&mut self, term: &str) {
        self.terms.retain(|existing| existing != term);
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().map(|term| term.as_str())
    }
}

impl std::fmt::Display for Consequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.terms.join(","))
    }
}

/// The predictor's severity scale, in increasing order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Impact {
    Modifier,
    Low,
    Moderate,
    High,
}

impl Impact {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "MODIFIER" => Some(Impact::Modifier),
            "LOW" => Some(Impact::Low),
            "MODERATE" => Some(Impact::Moderate),
            "HIGH" => Some(Impact::High),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Impact::Modifier => "MODIFIER",
            Impact::Low => "LOW",
            Impact::Moderate => "MODERATE",
            Impact::High => "HIGH",
        }
    }
}

/// Raise the record's `IMPACT` sub-field to at least `floor`. Severities
/// above the floor are never downgraded; records without an impact
/// sub-field are left alone.
fn raise_impact(record: &mut Record, floor: Impact) {
    let Some(cell) = record.get(EXTRA_COLUMN) else {
        return;
    };
    let mut extra = InfoField::parse(cell);
    if let Some(current) = extra.get(IMPACT_KEY).and_then(Impact::from_name) {
        if current < floor {
            extra.insert(IMPACT_KEY, floor.as_str());
            record.set(EXTRA_COLUMN, extra.to_string());
        }
    }
}

/// Does the record's `Extra` report the variant covering the whole
/// transcript? Accepts both `OverlapPC=100` and `OverlapPC=100.00`.
fn full_overlap(record: &Record) -> bool {
    record
        .get(EXTRA_COLUMN)
        .map(InfoField::parse)
        .and_then(|extra| extra.get(OVERLAP_PC_KEY).and_then(|pc| pc.parse::<f64>().ok()))
        == Some(100.0)
}

/// The ordered correction rule set, with a variant (VCF-origin) table as
/// read-only lookup for insertion alleles and propagated columns.
pub struct AnnotationCorrector<'a> {
    variants: &'a VariantTable,
    prediction_id_column: String,
    copy_columns: Vec<String>,
}

impl<'a> AnnotationCorrector<'a> {
    /// `variants` must be keyed by the variant identifier the prediction
    /// table refers to (the VCF ID column, by default).
    pub fn new(variants: &'a VariantTable) -> Self {
        Self {
            variants,
            prediction_id_column: UPLOADED_VARIATION_COLUMN.to_string(),
            copy_columns: vec![INFO_COLUMN.to_string()],
        }
    }

    /// Use a different prediction-table identifier column.
    pub fn prediction_id_column(mut self, name: impl Into<String>) -> Self {
        self.prediction_id_column = name.into();
        self
    }

    /// Propagate a different set of variant-table columns (default: INFO).
    pub fn copy_columns(mut self, columns: Vec<String>) -> Self {
        self.copy_columns = columns;
        self
    }

    /// Apply the rules to every record of `predictions`, in a fixed order
    /// per record (the rules add and remove the same tokens, so order
    /// matters):
    ///
    /// 1. insertion frameshift/inframe,
    /// 2. start-codon correction,
    /// 3. transcript amplification,
    /// 4. transcript ablation,
    /// 5. column propagation from the variant table.
    ///
    /// Finally the `##<column>` metadata lines for every propagated column
    /// are appended to the prediction table's metadata, in original order.
    ///
    /// Prediction records whose ID has no match in the variant table get
    /// empty propagated fields and a warning in `report`; this is expected
    /// when the predictor could not parse certain variants.
    pub fn correct(
        &self,
        predictions: &mut VariantTable,
        report: &mut Report,
    ) -> Result<(), VarTableError> {
        for column in &self.copy_columns {
            predictions.add_column(column.clone());
        }

        for (_, record) in predictions.records_mut() {
            let variant_id = record
                .get(&self.prediction_id_column)
                .map(|id| id.to_string());
            let variant = variant_id.as_deref().and_then(|id| self.variants.get(id));

            self.check_insertion(variant, record);
            check_start_codon(record);
            check_full_overlap(record);

            if variant.is_none() {
                let message = format!(
                    "ID '{}' was not found in the variant table; the predictor may not have \
                     recognized it, or the wrong variant file was given",
                    variant_id.as_deref().unwrap_or("<missing>")
                );
                log::warn!("{}", message);
                report.add_issue(message);
            }
            for column in &self.copy_columns {
                let value = variant
                    .and_then(|variant| variant.get(column))
                    .unwrap_or("");
                record.set(column.clone(), value.to_string());
            }
        }

        for column in &self.copy_columns {
            let prefix = format!("##{}", column);
            let lines: Vec<String> = self
                .variants
                .metadata
                .iter()
                .filter(|line| line.starts_with(&prefix))
                .cloned()
                .collect();
            predictions.metadata.extend(lines);
        }
        Ok(())
    }

    /// Rule 1: a coding insertion shifts the reading frame unless the
    /// inserted length is a multiple of three. The stored allele carries a
    /// leading placeholder base, hence the `- 1`. Placeholder alleles
    /// (`<INS>`) have unknown length and are skipped.
    fn check_insertion(&self, variant: Option<&Record>, record: &mut Record) {
        if record.get(ALLELE_COLUMN) != Some(ALLELE_INSERTION) {
            return;
        }
        let Some(cell) = record.get(CONSEQUENCE_COLUMN) else {
            return;
        };
        let mut consequence = Consequence::parse(cell);
        if !consequence.contains("coding_sequence_variant") {
            return;
        }
        let Some(allele) = variant.and_then(|variant| variant.get(ALT_COLUMN)) else {
            return;
        };
        if allele == INSERTION_PLACEHOLDER || allele.is_empty() {
            return;
        }
        let (term, floor) = if (allele.len() - 1) % 3 != 0 {
            ("frameshift_variant", Impact::High)
        } else {
            ("inframe_insertion", Impact::Moderate)
        };
        consequence.push(term);
        record.set(CONSEQUENCE_COLUMN, consequence.to_string());
        raise_impact(record, floor);
    }
}

/// Rule 2: a deletion reaching from the 5' UTR into coding sequence takes
/// out the start codon, which the predictor misses; a duplication can
/// never lose a start codon, so its `start_lost` calls are false positives
/// to be stripped (along with the accompanying `start_retained_variant`).
fn check_start_codon(record: &mut Record) {
    let Some(cell) = record.get(CONSEQUENCE_COLUMN) else {
        return;
    };
    let mut consequence = Consequence::parse(cell);
    let allele = record.get(ALLELE_COLUMN).map(|allele| allele.to_string());
    match allele.as_deref() {
        Some(ALLELE_DELETION) => {
            if consequence.contains("5_prime_UTR_variant")
                && (consequence.contains("coding_sequence_variant")
                    || consequence.contains("frameshift_variant"))
                && !consequence.contains("start_lost")
            {
                consequence.push("start_lost");
                record.set(CONSEQUENCE_COLUMN, consequence.to_string());
                raise_impact(record, Impact::High);
            }
        }
        Some(ALLELE_DUPLICATION) => {
            if consequence.contains("start_lost") {
                consequence.remove("start_lost");
                consequence.remove("start_retained_variant");
                record.set(CONSEQUENCE_COLUMN, consequence.to_string());
            }
        }
        _ => {}
    }
}

/// Rules 3 and 4: a variant covering 100% of a transcript supersedes any
/// finer-grained consequences: `transcript_amplification` for
/// duplications, `transcript_ablation` for deletions.
fn check_full_overlap(record: &mut Record) {
    let replacement = match record.get(ALLELE_COLUMN) {
        Some(ALLELE_DUPLICATION) => "transcript_amplification",
        Some(ALLELE_DELETION) => "transcript_ablation",
        _ => return,
    };
    let Some(cell) = record.get(CONSEQUENCE_COLUMN) else {
        return;
    };
    if !full_overlap(record) || Consequence::parse(cell).contains(replacement) {
        return;
    }
    record.set(CONSEQUENCE_COLUMN, replacement);
}

#[cfg(test)]
mod tests {
    use super::{AnnotationCorrector, Consequence, Impact};
    use crate::expand::expand_dispersed_duplications;
    use crate::info::InfoField;
    use crate::reporting::Report;
    use crate::table::VariantTable;
    use crate::test_utilities::{sample_vcf_text, sample_vep_text};

    fn corrected_tables() -> (VariantTable, Report) {
        let mut variants = VariantTable::parse(&sample_vcf_text(), Some("ID")).unwrap();
        let mut report = Report::new();
        expand_dispersed_duplications(&mut variants, &mut report).unwrap();

        let mut predictions = VariantTable::parse(&sample_vep_text(), None).unwrap();
        AnnotationCorrector::new(&variants)
            .correct(&mut predictions, &mut report)
            .unwrap();
        (predictions, report)
    }

    fn extra(predictions: &VariantTable, key: &str) -> InfoField {
        InfoField::parse(predictions.get(key).unwrap().get("Extra").unwrap())
    }

    #[test]
    fn test_consequence_token_handling() {
        let mut consequence = Consequence::parse("a,b,c");
        assert!(consequence.contains("b"));
        assert!(!consequence.contains("ab"));
        consequence.remove("b");
        assert_eq!(consequence.to_string(), "a,c");
    }

    #[test]
    fn test_impact_ordering() {
        assert!(Impact::Modifier < Impact::Low);
        assert!(Impact::Moderate < Impact::High);
        assert_eq!(Impact::from_name("LOW"), Some(Impact::Low));
        assert_eq!(Impact::from_name("bogus"), None);
    }

    #[test]
    fn test_insertion_frameshift_upgrades_to_high() {
        // variant 3 has allele ACGTA: (5 - 1) % 3 != 0
        let (predictions, _) = corrected_tables();
        let record = predictions.get("4").unwrap();
        let consequence = Consequence::parse(record.get("Consequence").unwrap());
        assert!(consequence.contains("frameshift_variant"));
        assert_eq!(extra(&predictions, "4").get("IMPACT"), Some("HIGH"));
    }

    #[test]
    fn test_insertion_inframe_capped_at_moderate() {
        // variant 5 has allele ACGT: (4 - 1) % 3 == 0
        let (predictions, _) = corrected_tables();
        let record = predictions.get("5").unwrap();
        let consequence = Consequence::parse(record.get("Consequence").unwrap());
        assert!(consequence.contains("inframe_insertion"));
        assert!(!consequence.contains("frameshift_variant"));
        assert_eq!(extra(&predictions, "5").get("IMPACT"), Some("MODERATE"));
    }

    #[test]
    fn test_placeholder_insertion_is_skipped() {
        // the synthesized 2.i record has the <INS> placeholder allele
        let (predictions, _) = corrected_tables();
        let record = predictions.get("6").unwrap();
        let consequence = Consequence::parse(record.get("Consequence").unwrap());
        assert!(!consequence.contains("frameshift_variant"));
        assert!(!consequence.contains("inframe_insertion"));
    }

    #[test]
    fn test_deletion_into_coding_gains_start_lost() {
        let (predictions, _) = corrected_tables();
        let record = predictions.get("0").unwrap();
        let consequence = Consequence::parse(record.get("Consequence").unwrap());
        assert!(consequence.contains("start_lost"));
        assert_eq!(extra(&predictions, "0").get("IMPACT"), Some("HIGH"));
    }

    #[test]
    fn test_duplication_start_lost_stripped() {
        let (predictions, _) = corrected_tables();
        let record = predictions.get("2").unwrap();
        let consequence = Consequence::parse(record.get("Consequence").unwrap());
        assert!(!consequence.contains("start_lost"));
        assert!(!consequence.contains("start_retained_variant"));
        assert!(consequence.contains("coding_sequence_variant"));
    }

    #[test]
    fn test_full_overlap_duplication_becomes_amplification() {
        let (predictions, _) = corrected_tables();
        let record = predictions.get("3").unwrap();
        assert_eq!(record.get("Consequence"), Some("transcript_amplification"));
    }

    #[test]
    fn test_full_overlap_deletion_becomes_ablation() {
        let (predictions, _) = corrected_tables();
        let record = predictions.get("1").unwrap();
        assert_eq!(record.get("Consequence"), Some("transcript_ablation"));
    }

    #[test]
    fn test_info_propagation_and_unmatched_warning() {
        let (predictions, report) = corrected_tables();
        assert!(predictions.columns.iter().any(|column| column == "INFO"));
        // matched records carry the variant table's INFO verbatim
        assert_eq!(
            predictions.get("0").unwrap().get("INFO"),
            Some("SVTYPE=DEL;END=1500")
        );
        // the synthesized record resolves against the expanded table
        assert!(predictions
            .get("6")
            .unwrap()
            .get("INFO")
            .unwrap()
            .contains("INS:DISPERSED"));
        // the unmatched record gets an empty field and a warning
        assert_eq!(predictions.get("7").unwrap().get("INFO"), Some(""));
        assert!(report
            .entries()
            .iter()
            .any(|entry| entry.contains("'99'")));
    }

    #[test]
    fn test_info_metadata_appended() {
        let (predictions, _) = corrected_tables();
        let info_lines: Vec<&String> = predictions
            .metadata
            .iter()
            .filter(|line| line.starts_with("##INFO"))
            .collect();
        assert_eq!(info_lines.len(), 2);
        // appended after the original prediction metadata, in VCF order
        assert!(info_lines[0].contains("ID=END"));
        assert!(info_lines[1].contains("ID=SVTYPE"));
    }

    #[test]
    fn test_corrected_table_renders() {
        let (predictions, _) = corrected_tables();
        let rendered = predictions.render("Extra").unwrap();
        assert!(rendered.contains("transcript_amplification"));
        assert!(rendered.ends_with('\n'));
    }
}
