use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::analysis::mutation_counts::count_mutations;
use crate::data_handling::mutation_file::print_mutation_report;
use crate::errors::CohortError;
use crate::models::{
    CohortResult, HlaTyping, MutationCounts, MutationLoader, PatientMap, PredictorFactory,
    ScoredEpitope,
};

/// Drives loading and scoring for every patient in a cohort.
pub struct CohortAnalyzer<'a> {
    pub loader: &'a dyn MutationLoader,
    pub predictors: &'a dyn PredictorFactory,
    pub binding_threshold: u32,
    /// Print the loader's per-variant report for each file.
    pub print_reports: bool,
}

impl CohortAnalyzer<'_> {
    /// Scores one patient's mutation file against its HLA alleles.
    pub fn score_patient(
        &self,
        path: &Path,
        alleles: &[String],
        report_out: &mut impl Write,
    ) -> Result<MutationCounts> {
        info!("Processing {} with HLA alleles {:?}", path.display(), alleles);
        let loaded = self
            .loader
            .load(path)
            .with_context(|| format!("loading {}", path.display()))?;

        if self.print_reports {
            print_mutation_report(path, &loaded, report_out)?;
        }

        if loaded.transcripts.height() == 0 {
            debug!("{} has no transcript mutations", path.display());
            return Ok(MutationCounts::default());
        }

        let mhc = self.predictors.binding_predictor(alleles);
        let imm = self
            .predictors
            .immunogenicity_predictor(alleles, self.binding_threshold);

        let scored = mhc
            .predict(&loaded.transcripts)
            .with_context(|| format!("predicting MHC binding for {}", path.display()))?;
        let scored = imm
            .predict(scored)
            .with_context(|| format!("predicting immunogenicity for {}", path.display()))?;

        let epitopes = ScoredEpitope::from_frame(&scored)?;
        Ok(count_mutations(&epitopes, self.binding_threshold))
    }

    /// Maps each patient to its counts, in the order of `mutation_files`.
    ///
    /// Nothing is returned for any patient if one of them fails.
    pub fn generate_mutation_counts(
        &self,
        mutation_files: &PatientMap<PathBuf>,
        hla_types: &PatientMap<HlaTyping>,
        report_out: &mut impl Write,
    ) -> Result<CohortResult> {
        let mut mutation_counts = CohortResult::new();
        for (patient_id, path) in mutation_files.iter() {
            let typing = hla_types
                .get(patient_id)
                .ok_or_else(|| CohortError::MissingHlaData {
                    patient_id: patient_id.to_string(),
                    path: path.clone(),
                })?;
            let counts = self.score_patient(path, &typing.alleles, report_out)?;
            mutation_counts.insert(patient_id.to_string(), counts);
        }
        Ok(mutation_counts)
    }
}
