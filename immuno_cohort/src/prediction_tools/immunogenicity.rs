use anyhow::{Context, Result};
use polars::prelude::*;
use tracing::info;

use crate::helper_functions::{read_csv, write_csv};
use crate::models::{require_columns, ImmunogenicityPredictor, ScoredEpitope};
use crate::prediction_tools::ExternalTool;

/// Immunogenicity scoring through an external script.
///
/// Called as `<script> --input <epitopes.csv> --alleles A,B,... --binding-threshold N
/// --output <epitopes.csv>`. The output keeps every input column and adds
/// `ThymicDeletion` plus, optionally, an `immunogenicity` probability.
pub struct ScriptImmunogenicityPredictor<'a> {
    tool: &'a ExternalTool,
    alleles: Vec<String>,
    binding_threshold: u32,
}

impl<'a> ScriptImmunogenicityPredictor<'a> {
    pub fn new(tool: &'a ExternalTool, alleles: &[String], binding_threshold: u32) -> Self {
        Self {
            tool,
            alleles: alleles.to_vec(),
            binding_threshold,
        }
    }
}

impl ImmunogenicityPredictor for ScriptImmunogenicityPredictor<'_> {
    fn predict(&self, scored_epitopes: DataFrame) -> Result<DataFrame> {
        let workdir = tempfile::tempdir()?;
        let input_path = workdir.path().join("scored_epitopes.csv");
        let output_path = workdir.path().join("immunogenicity.csv");
        write_csv(&scored_epitopes, &input_path)?;

        info!(
            "Scoring immunogenicity of {} epitopes (binding threshold {})",
            scored_epitopes.height(),
            self.binding_threshold
        );
        let mut command = self.tool.command();
        command
            .arg("--input")
            .arg(&input_path)
            .arg("--alleles")
            .arg(self.alleles.join(","))
            .arg("--binding-threshold")
            .arg(self.binding_threshold.to_string())
            .arg("--output")
            .arg(&output_path);
        self.tool.run(command)?;

        let enriched = read_csv(&output_path)
            .with_context(|| format!("reading {} output", self.tool.name))?;
        require_columns(&enriched, "immunogenicity prediction", &ScoredEpitope::REQUIRED_COLUMNS)?;
        Ok(enriched)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::prediction_tools::test_scripts::{emitting_tool, recorded_args};
    use polars::df;

    #[test]
    fn threshold_is_passed_and_flags_come_back() {
        let dir = tempfile::tempdir().unwrap();
        let tool = emitting_tool(
            dir.path(),
            "imm",
            "Gene,GeneMutationInfo,EpitopeStart,EpitopeEnd,MutationStart,MutationEnd,Epitope,MHC_IC50,immunogenicity,ThymicDeletion\n\
             TP53,p.R175H,1,9,5,5,HMTEVVRHC,312.5,0.71,false\n",
        );
        let scored = df![
            "Gene" => &["TP53"],
            "GeneMutationInfo" => &["p.R175H"],
            "EpitopeStart" => &[1i64],
            "EpitopeEnd" => &[9i64],
            "MutationStart" => &[5i64],
            "MutationEnd" => &[5i64],
            "Epitope" => &["HMTEVVRHC"],
            "MHC_IC50" => &[312.5f64]
        ]
        .unwrap();
        let alleles = vec!["HLA-A*02:01".to_string()];

        let enriched = ScriptImmunogenicityPredictor::new(&tool, &alleles, 250)
            .predict(scored)
            .unwrap();
        let records = ScoredEpitope::from_frame(&enriched).unwrap();
        assert_eq!(records.len(), 1);
        assert!(!records[0].thymic_deletion);
        assert_eq!(records[0].immunogenicity, Some(0.71));
        assert!(recorded_args(dir.path(), "imm").contains("--binding-threshold 250"));
    }
}
