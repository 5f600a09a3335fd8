use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::analysis::cohort::CohortAnalyzer;
use crate::analysis::summary::write_summary;
use crate::cli::Args;
use crate::config::ToolConfig;
use crate::data_handling::discovery::{check_hla_coverage, find_hla_files, find_mutation_files};
use crate::data_handling::mutation_file::ScriptMutationLoader;
use crate::models::{CohortResult, HlaTyping, MutationLoader, PatientMap, PredictorFactory};
use crate::prediction_tools::ScriptPredictors;

mod analysis;
mod cli;
mod config;
mod data_handling;
mod errors;
mod helper_functions;
mod models;
mod prediction_tools;

fn init_logging(quiet: bool) {
    let default_level = if quiet { "warn" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();
}

/// Finds every patient's mutation and HLA files and checks they pair up.
fn discover_patients(args: &Args) -> Result<(PatientMap<PathBuf>, PatientMap<HlaTyping>)> {
    let mutation_files = find_mutation_files(&args.input_dir)?;
    // if no HLA input dir is specified then .hla files sit next to the .maf/.vcf files
    let hla_types = find_hla_files(args.hla_dirs())?;
    check_hla_coverage(&mutation_files, &hla_types)?;
    Ok((mutation_files, hla_types))
}

fn analyze_cohort(
    args: &Args,
    mutation_files: &PatientMap<PathBuf>,
    hla_types: &PatientMap<HlaTyping>,
    loader: &dyn MutationLoader,
    predictors: &dyn PredictorFactory,
    out: &mut impl Write,
) -> Result<CohortResult> {
    let analyzer = CohortAnalyzer {
        loader,
        predictors,
        binding_threshold: args.binding_threshold,
        print_reports: !args.quiet,
    };
    let mutation_counts = analyzer.generate_mutation_counts(mutation_files, hla_types, out)?;
    write_summary(&mutation_counts, args.output.as_deref(), out)?;
    Ok(mutation_counts)
}

/// Discovers the cohort, scores it and writes the summary to `out`. The
/// external tools are only resolved when there is at least one patient.
fn run(args: &Args, out: &mut impl Write) -> Result<CohortResult> {
    let (mutation_files, hla_types) = discover_patients(args)?;
    if mutation_files.is_empty() {
        warn!("No .maf or .vcf files found in {:?}", args.input_dir);
        let empty = CohortResult::new();
        write_summary(&empty, args.output.as_deref(), out)?;
        return Ok(empty);
    }

    info!("Found {} patients", mutation_files.len());
    let config = ToolConfig::load(args.tools_config.as_deref())?;
    let loader = ScriptMutationLoader::from_config(&config)?;
    let predictors = ScriptPredictors::from_config(&config)?;
    analyze_cohort(args, &mutation_files, &hla_types, &loader, &predictors, out)
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.quiet);
    info!("Starting the cohort immunogenicity analysis");

    let stdout = io::stdout();
    let mut out = stdout.lock();
    run(&args, &mut out)?;
    out.flush()?;
    Ok(())
}
