//! Test cases and test utility functions.
//!

use std::io::Write;

use rand::{thread_rng, Rng};
use tempfile::NamedTempFile;

use crate::{coordinate::Coordinate, Position};

// Stochastic test defaults
//
// Number of autosomes to draw from; named chromosomes are mixed in
// separately to exercise the numbered-before-named ordering.
pub const NCHROM: u64 = 22;

// position bounds
pub const MAX_POSITION: Position = 250_000_000;
pub const MAX_LEN: Position = 10_000;

/// Sample a random chromosome name, numbered or named.
pub fn random_chrom() -> String {
    let mut rng = thread_rng();
    if rng.gen_bool(0.8) {
        format!("{}", rng.gen_range(1..NCHROM + 1))
    } else {
        ["X", "Y", "MT"][rng.gen_range(0..3)].to_string()
    }
}

/// Build a random coordinate; occasionally a point feature
/// (`start == end`), like an insertion site.
pub fn random_coordinate() -> Coordinate {
    let mut rng = thread_rng();
    let start = rng.gen_range(1..MAX_POSITION);
    let end = if rng.gen_bool(0.2) {
        start
    } else {
        start + rng.gen_range(0..MAX_LEN)
    };
    Coordinate::new(random_chrom(), start, end)
}

/// A small structural-variant call table: a deletion, a dispersed
/// duplication (with insertion site on chromosome 2), two sequence-resolved
/// insertions (lengths 5 and 4, for the frameshift/inframe cases), and a
/// tandem duplication.
pub fn sample_vcf_text() -> String {
    "\
##fileformat=VCFv4.2
##ALT=<ID=DEL,Description=\"Deletion\">
##ALT=<ID=DUP:TANDEM,Description=\"Tandem Duplication\">
##INFO=<ID=END,Number=1,Type=Integer,Description=\"End position of the variant described in this record\">
##INFO=<ID=SVTYPE,Number=1,Type=String,Description=\"Type of structural variant\">
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO
1\t1000\t1\tN\t<DEL>\t.\tPASS\tSVTYPE=DEL;END=1500
1\t5000\t2\tN\t<DUP>\t.\tPASS\tSVTYPE=DUP:DISPERSED;END=5400;INSCHROM=2;INSPOS=800
2\t300\t3\tN\tACGTA\t.\tPASS\tSVTYPE=INS
2\t600\t5\tN\tACGT\t.\tPASS\tSVTYPE=INS
X\t700\t4\tN\t<DUP>\t.\tPASS\tSVTYPE=DUP:TANDEM;END=900
"
    .to_string()
}

/// Effect-predictor output for [`sample_vcf_text`] after expansion: one row
/// per (variant, transcript) pair, exercising every correction rule, plus
/// an ID (`99`) the variant table does not know.
pub fn sample_vep_text() -> String {
    "\
## ENSEMBL VARIANT EFFECT PREDICTOR v99.2
## Output produced at 2020-01-01 10:00:00
#Uploaded_variation\tLocation\tAllele\tGene\tFeature\tFeature_type\tConsequence\tExtra
1\t1:1000-1500\tdeletion\tg1\tt1\tTranscript\t5_prime_UTR_variant,coding_sequence_variant\tIMPACT=MODIFIER
1\t1:1000-1500\tdeletion\tg2\tt2\tTranscript\tcoding_sequence_variant\tIMPACT=MODIFIER;OverlapPC=100
2\t1:5000-5400\tduplication\tg3\tt3\tTranscript\tstart_lost,start_retained_variant,coding_sequence_variant\tIMPACT=HIGH
4\tX:700-900\tduplication\tg4\tt4\tTranscript\tcoding_sequence_variant\tIMPACT=MODIFIER;OverlapPC=100.00
3\t2:300\tinsertion\tg5\tt5\tTranscript\tcoding_sequence_variant\tIMPACT=MODIFIER
5\t2:600-600\tinsertion\tg6\tt6\tTranscript\tcoding_sequence_variant,5_prime_UTR_variant\tIMPACT=LOW
2.i\t2:800\tinsertion\tg7\tt7\tTranscript\tcoding_sequence_variant\tIMPACT=MODIFIER
99\t9:10-20\tdeletion\tg8\tt8\tTranscript\tintron_variant\tIMPACT=MODIFIER
"
    .to_string()
}

/// Write table text to a temporary file for command-level tests.
pub fn temp_table_file(text: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("could not create temporary file");
    file.write_all(text.as_bytes())
        .expect("could not write temporary table");
    file.flush().expect("could not flush temporary table");
    file
}
