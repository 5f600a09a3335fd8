use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::analysis::mutation_counts::DEFAULT_BINDING_THRESHOLD;

/// Count coding, MHC-binding and immunogenic mutations for every patient in a
/// directory of MAF/VCF files. Each mutation file needs a matching `.hla` file
/// with the patient's HLA alleles.
#[derive(Debug, Parser)]
#[command(name = "immuno_cohort", version)]
pub struct Args {
    #[arg(
        long = "input-dir",
        required = true,
        value_name = "DIRS",
        value_delimiter = ',',
        num_args = 1..,
        help = "Directories containing MAF or VCF input files"
    )]
    pub input_dir: Vec<PathBuf>,

    #[arg(
        long = "hla-input-dir",
        value_name = "DIRS",
        value_delimiter = ',',
        num_args = 1..,
        help = "Directories containing HLA allele files (.hla); defaults to --input-dir"
    )]
    pub hla_input_dir: Vec<PathBuf>,

    #[arg(long = "output", value_name = "PATH", help = "Path to output CSV file")]
    pub output: Option<PathBuf>,

    #[arg(
        long = "quiet",
        action = ArgAction::SetTrue,
        help = "Suppress per-variant reports and INFO log messages"
    )]
    pub quiet: bool,

    #[arg(
        long = "binding-threshold",
        value_name = "IC50",
        default_value_t = DEFAULT_BINDING_THRESHOLD,
        help = "Cutoff IC50 score for epitope MHC binding"
    )]
    pub binding_threshold: u32,

    #[arg(
        long = "tools-config",
        value_name = "PATH",
        help = "JSON file locating the mutation loader and predictor scripts"
    )]
    pub tools_config: Option<PathBuf>,
}

impl Args {
    /// HLA directories, falling back to the mutation directories.
    pub fn hla_dirs(&self) -> &[PathBuf] {
        if self.hla_input_dir.is_empty() {
            &self.input_dir
        } else {
            &self.hla_input_dir
        }
    }
}
