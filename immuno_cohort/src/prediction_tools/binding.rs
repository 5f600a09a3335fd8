use anyhow::{Context, Result};
use polars::prelude::*;
use tracing::info;

use crate::helper_functions::{read_csv, write_csv};
use crate::models::{
    require_columns, BindingPredictor, EPITOPE_COL, EPITOPE_END_COL, EPITOPE_START_COL, GENE_COL,
    IC50_COL, MUTATION_END_COL, MUTATION_INFO_COL, MUTATION_START_COL,
};
use crate::prediction_tools::ExternalTool;

/// Columns every binding prediction must carry.
pub const BINDING_COLUMNS: [&str; 8] = [
    GENE_COL,
    MUTATION_INFO_COL,
    EPITOPE_START_COL,
    EPITOPE_END_COL,
    MUTATION_START_COL,
    MUTATION_END_COL,
    EPITOPE_COL,
    IC50_COL,
];

/// Pan-allele MHC binding prediction through an external script.
///
/// The script is called as
/// `<script> --input <transcripts.csv> --alleles A,B,... --output <epitopes.csv>`
/// and must write one row per transcript/epitope/allele combination.
pub struct ScriptBindingPredictor<'a> {
    tool: &'a ExternalTool,
    alleles: Vec<String>,
}

impl<'a> ScriptBindingPredictor<'a> {
    pub fn new(tool: &'a ExternalTool, alleles: &[String]) -> Self {
        Self {
            tool,
            alleles: alleles.to_vec(),
        }
    }
}

impl BindingPredictor for ScriptBindingPredictor<'_> {
    fn predict(&self, transcripts: &DataFrame) -> Result<DataFrame> {
        let workdir = tempfile::tempdir()?;
        let input_path = workdir.path().join("transcripts.csv");
        let output_path = workdir.path().join("scored_epitopes.csv");
        write_csv(transcripts, &input_path)?;

        info!(
            "Predicting MHC binding for {} transcript mutations with {} alleles",
            transcripts.height(),
            self.alleles.len()
        );
        let mut command = self.tool.command();
        command
            .arg("--input")
            .arg(&input_path)
            .arg("--alleles")
            .arg(self.alleles.join(","))
            .arg("--output")
            .arg(&output_path);
        self.tool.run(command)?;

        let scored = read_csv(&output_path)
            .with_context(|| format!("reading {} output", self.tool.name))?;
        require_columns(&scored, "binding prediction", &BINDING_COLUMNS)?;
        Ok(scored)
    }
}
