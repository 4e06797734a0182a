use std::path::PathBuf;

use clap::{Parser, Subcommand};
use vartable::{
    commands::{vartable_correct, vartable_expand, vartable_query, QueryFormat},
    prelude::VarTableError,
};

const INFO: &str = "\
vartable: structural-variant annotation table operations
usage: vartable [--help] <subcommand>

Subcommands:

  expand: add the insertion-site records implied by dispersed duplications.

  correct: repair predictor consequence annotations and carry variant-file
           columns into the prediction table.

  query: filter, sort, and page an annotation table.

";

#[derive(Parser)]
#[clap(name = "vartable")]
#[clap(about = INFO)]
struct Cli {
    #[arg(short, long, action = clap::ArgAction::Count)]
    debug: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    Expand {
        /// an input structural-variant call TSV file (VCF-like)
        #[arg(required = true)]
        vcf: PathBuf,

        /// an optional output file (standard output will be used if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// fail on duplicate record IDs instead of keeping the last row
        #[arg(long)]
        strict: bool,
    },
    Correct {
        /// the structural-variant call TSV file the predictions were made from
        #[arg(long, required = true)]
        vcf: PathBuf,

        /// the effect-predictor output TSV file
        #[arg(long, required = true)]
        vep: PathBuf,

        /// an optional output file (standard output will be used if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// name of the variant-file identifier column
        #[arg(long, default_value = "ID")]
        vcf_id: String,

        /// name of the prediction-file identifier column
        #[arg(long, default_value = "Uploaded_variation")]
        vep_id: String,

        /// variant-file column(s) to copy into the prediction table
        #[arg(long, num_args = 1.., default_value = "INFO")]
        columns: Vec<String>,

        /// fail on duplicate record IDs instead of keeping the last row
        #[arg(long)]
        strict: bool,
    },
    Query {
        /// an annotation TSV file (typically corrected predictor output)
        #[arg(required = true)]
        input: PathBuf,

        /// filter expression, e.g. '{Consequence} contains missense_variant,stop_gained'
        #[arg(long, default_value = "")]
        filter: String,

        /// chained sort keys, e.g. 'Location' or 'Location:desc'
        #[arg(long)]
        sort: Vec<String>,

        /// which page of the filtered set to return
        #[arg(long, default_value_t = 0)]
        page: usize,

        /// number of records per page
        #[arg(long, default_value_t = 100)]
        page_size: usize,

        /// output shape: a TSV page, the full filtered set as CSV, or gene identifiers
        #[arg(long, value_enum, default_value_t = QueryFormat::Tsv)]
        format: QueryFormat,

        /// an optional output file (standard output will be used if not specified)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn run() -> Result<(), VarTableError> {
    let cli = Cli::parse();
    let result = match &cli.command {
        Some(Commands::Expand {
            vcf,
            output,
            strict,
        }) => vartable_expand(vcf, output.as_ref(), *strict),
        Some(Commands::Correct {
            vcf,
            vep,
            output,
            vcf_id,
            vep_id,
            columns,
            strict,
        }) => vartable_correct(vcf, vep, output.as_ref(), vcf_id, vep_id, columns, *strict),
        Some(Commands::Query {
            input,
            filter,
            sort,
            page,
            page_size,
            format,
            output,
        }) => vartable_query(
            input,
            filter,
            sort,
            *page,
            *page_size,
            *format,
            output.as_ref(),
        ),
        None => {
            println!("{}\n", INFO);
            std::process::exit(1);
        }
    };
    let output = result?;
    for issue in output.report.entries() {
        eprintln!("WARNING: {}", issue);
    }
    Ok(())
}

fn main() {
    env_logger::init();
    match run() {
        Ok(_) => {}
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
