use std::io::Write;
use std::path::PathBuf;

use crate::{
    correct::{AnnotationCorrector, EXTRA_COLUMN},
    expand::expand_dispersed_duplications,
    io::OutputFile,
    prelude::*,
    query::{Filter, QueryEngine, SortKey, GENE_COLUMN},
    reporting::{CommandOutput, Report},
    table::{ID_COLUMN, INFO_COLUMN},
};

/// Output shape of the `query` command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum QueryFormat {
    /// One page of tab-separated records.
    Tsv,
    /// The full filtered set, comma-separated.
    Csv,
    /// The distinct gene identifiers of the filtered set.
    Genes,
}

fn duplicate_policy(strict: bool) -> DuplicateKeys {
    if strict {
        DuplicateKeys::Reject
    } else {
        DuplicateKeys::LastWins
    }
}

fn output_writer(output: Option<&PathBuf>) -> Result<Box<dyn Write>, VarTableError> {
    let output_stream = output.map_or(OutputFile::new_stdout(), OutputFile::new);
    Ok(output_stream.writer()?)
}

/// Add the insertion-site records implied by the dispersed duplications in
/// a variant call file, and write the result sorted by location.
pub fn vartable_expand(
    variants_path: &PathBuf,
    output: Option<&PathBuf>,
    strict: bool,
) -> Result<CommandOutput<()>, VarTableError> {
    let mut table =
        VariantTable::from_path(variants_path, Some(ID_COLUMN), duplicate_policy(strict))?;

    // For reporting stuff to the user.
    let mut report = Report::new();

    let added = expand_dispersed_duplications(&mut table, &mut report)?;
    log::info!("synthesized {} insertion record(s)", added);

    table.add_locations()?;
    let rendered = table.render(INFO_COLUMN)?;
    let mut writer = output_writer(output)?;
    writer.write_all(rendered.as_bytes())?;

    Ok(CommandOutput::new((), report))
}

/// Correct the consequence annotations of an effect-predictor output file
/// against the variant call file it was generated from, carrying the
/// requested variant columns across, and write the result sorted by
/// location.
#[allow(clippy::too_many_arguments)]
pub fn vartable_correct(
    variants_path: &PathBuf,
    predictions_path: &PathBuf,
    output: Option<&PathBuf>,
    variant_id_column: &str,
    prediction_id_column: &str,
    copy_columns: &[String],
    strict: bool,
) -> Result<CommandOutput<()>, VarTableError> {
    let variants =
        VariantTable::from_path(variants_path, Some(variant_id_column), duplicate_policy(strict))?;
    let mut predictions =
        VariantTable::from_path(predictions_path, None, duplicate_policy(strict))?;

    let mut report = Report::new();

    AnnotationCorrector::new(&variants)
        .prediction_id_column(prediction_id_column)
        .copy_columns(copy_columns.to_vec())
        .correct(&mut predictions, &mut report)?;

    let rendered = predictions.render(EXTRA_COLUMN)?;
    let mut writer = output_writer(output)?;
    writer.write_all(rendered.as_bytes())?;

    Ok(CommandOutput::new((), report))
}

/// Filter, sort, and page an annotation table; `format` selects one page
/// of TSV, the full filtered set as CSV, or the distinct gene identifiers
/// (a study set for enrichment tools).
pub fn vartable_query(
    input: &PathBuf,
    filter_expression: &str,
    sort_specs: &[String],
    page: usize,
    page_size: usize,
    format: QueryFormat,
    output: Option<&PathBuf>,
) -> Result<CommandOutput<()>, VarTableError> {
    let table = VariantTable::from_path(input, None, DuplicateKeys::LastWins)?;
    let filter = Filter::parse(filter_expression);
    let sort = sort_specs
        .iter()
        .map(|spec| SortKey::parse(spec))
        .collect::<Result<Vec<_>, _>>()?;

    let engine = QueryEngine::new(&table);
    let report = Report::new();
    let mut writer = output_writer(output)?;

    match format {
        QueryFormat::Tsv => {
            let result = engine.query(&filter, &sort, page, page_size);
            writeln!(writer, "#{}", table.columns.join("\t"))?;
            for record in &result.records {
                for column in &table.columns {
                    write!(writer, "{}\t", record.get(column).unwrap_or(""))?;
                }
                writeln!(writer)?;
            }
            log::info!(
                "{} of {} records matched; page {} holds {} of them",
                result.total,
                table.len(),
                page,
                result.records.len()
            );
        }
        QueryFormat::Csv => {
            engine.export_csv(&filter, &sort, &mut writer)?;
        }
        QueryFormat::Genes => {
            for gene in engine.unique_values(&filter, GENE_COLUMN) {
                writeln!(writer, "{}", gene)?;
            }
        }
    }
    writer.flush()?;

    Ok(CommandOutput::new((), report))
}
