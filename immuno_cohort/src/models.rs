use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::errors::CohortError;

// ─── Column names shared with the external tools ─────────────────────────────
pub const GENE_COL: &str = "Gene";
pub const MUTATION_INFO_COL: &str = "GeneMutationInfo";
pub const TRANSCRIPT_COL: &str = "stable_id_transcript";
pub const EPITOPE_START_COL: &str = "EpitopeStart";
pub const EPITOPE_END_COL: &str = "EpitopeEnd";
pub const MUTATION_START_COL: &str = "MutationStart";
pub const MUTATION_END_COL: &str = "MutationEnd";
pub const EPITOPE_COL: &str = "Epitope";
pub const IC50_COL: &str = "MHC_IC50";
pub const IMMUNOGENICITY_COL: &str = "immunogenicity";
pub const THYMIC_DELETION_COL: &str = "ThymicDeletion";

/// Insertion-ordered map keyed by patient id.
///
/// Iteration follows the order in which patients were first inserted, which for
/// every map built by discovery is the order mutation files were found.
#[derive(Debug, Clone, PartialEq)]
pub struct PatientMap<V> {
    entries: Vec<(String, V)>,
    index: HashMap<String, usize>,
}

impl<V> Default for PatientMap<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<V> PatientMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `value` under `patient_id`. An existing entry keeps its position
    /// and its previous value is returned.
    pub fn insert(&mut self, patient_id: String, value: V) -> Option<V> {
        match self.index.get(&patient_id) {
            Some(&i) => Some(std::mem::replace(&mut self.entries[i].1, value)),
            None => {
                self.index.insert(patient_id.clone(), self.entries.len());
                self.entries.push((patient_id, value));
                None
            }
        }
    }

    pub fn get(&self, patient_id: &str) -> Option<&V> {
        self.index.get(patient_id).map(|&i| &self.entries[i].1)
    }

    pub fn contains_key(&self, patient_id: &str) -> bool {
        self.index.contains_key(patient_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

impl<V> FromIterator<(String, V)> for PatientMap<V> {
    fn from_iter<I: IntoIterator<Item = (String, V)>>(iter: I) -> Self {
        let mut map = PatientMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

/// HLA typing of one patient as read from its `.hla` file.
#[derive(Debug, Clone, PartialEq)]
pub struct HlaTyping {
    pub path: std::path::PathBuf,
    pub alleles: Vec<String>,
}

/// Per-patient counters reported in the cohort summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MutationCounts {
    pub n_coding_mutations: usize,
    pub n_ligand_mutations: usize,
    pub n_immunogenic_mutations: usize,
}

pub type CohortResult = PatientMap<MutationCounts>;

/// One coding mutation from the loader's transcript table, as shown in the
/// mutation report.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationRecord {
    pub gene: Option<String>,
    pub transcript_id: Option<String>,
    pub mutation_start: Option<i64>,
    pub mutation_end: Option<i64>,
    pub description: Option<String>,
}

/// One line of the loader's per-variant report: what happened when a genomic
/// variant was applied to a transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantReportEntry {
    pub chr: String,
    pub pos: i64,
    #[serde(rename = "ref")]
    pub ref_allele: String,
    #[serde(rename = "alt")]
    pub alt_allele: String,
    #[serde(default)]
    pub transcript_id: Option<String>,
    pub outcome: String,
}

/// A predicted epitope after binding and immunogenicity scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredEpitope {
    pub gene: String,
    pub gene_mutation_info: String,
    pub epitope_start: i64,
    pub epitope_end: i64,
    pub mutation_start: i64,
    pub mutation_end: i64,
    pub epitope: String,
    pub mhc_ic50: f64,
    pub immunogenicity: Option<f64>,
    pub thymic_deletion: bool,
}

pub(crate) fn require_columns(df: &DataFrame, table: &str, columns: &[&str]) -> Result<(), CohortError> {
    let missing: Vec<&str> = columns
        .iter()
        .copied()
        .filter(|c| !df.schema().contains(c))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(CohortError::malformed(
            table,
            format!("missing column(s) {}", missing.join(", ")),
        ))
    }
}

fn null_cell(table: &str, column: &str, row: usize) -> CohortError {
    CohortError::malformed(table, format!("null {column} at row {row}"))
}

/// Textual `ThymicDeletion` flags must read `true` or `false` in any case.
fn check_textual_flags(df: &DataFrame, table: &str) -> Result<()> {
    if df.schema().get(THYMIC_DELETION_COL) != Some(&DataType::String) {
        return Ok(());
    }
    for (row, flag) in df.column(THYMIC_DELETION_COL)?.str()?.into_iter().enumerate() {
        if let Some(flag) = flag {
            if !flag.eq_ignore_ascii_case("true") && !flag.eq_ignore_ascii_case("false") {
                return Err(CohortError::malformed(
                    table,
                    format!("{THYMIC_DELETION_COL} {flag:?} at row {row} is not true/false"),
                )
                .into());
            }
        }
    }
    Ok(())
}

/// `ThymicDeletion` as a boolean expression; tools that write the flag as text
/// ("True"/"false") are accepted as well as native booleans.
fn thymic_deletion_expr(df: &DataFrame) -> Expr {
    match df.schema().get(THYMIC_DELETION_COL) {
        Some(DataType::String) => col(THYMIC_DELETION_COL)
            .str()
            .to_lowercase()
            .eq(lit("true"))
            .alias(THYMIC_DELETION_COL),
        _ => col(THYMIC_DELETION_COL).cast(DataType::Boolean),
    }
}

impl ScoredEpitope {
    pub const REQUIRED_COLUMNS: [&'static str; 9] = [
        GENE_COL,
        MUTATION_INFO_COL,
        EPITOPE_START_COL,
        EPITOPE_END_COL,
        MUTATION_START_COL,
        MUTATION_END_COL,
        EPITOPE_COL,
        IC50_COL,
        THYMIC_DELETION_COL,
    ];

    /// Converts a scored epitope table into typed records, casting every column
    /// to the type the aggregation expects.
    pub fn from_frame(df: &DataFrame) -> Result<Vec<ScoredEpitope>> {
        const TABLE: &str = "scored epitope";
        require_columns(df, TABLE, &Self::REQUIRED_COLUMNS)?;
        check_textual_flags(df, TABLE)?;
        let has_immunogenicity = df.schema().contains(IMMUNOGENICITY_COL);

        let mut exprs = vec![
            col(GENE_COL).cast(DataType::String),
            col(MUTATION_INFO_COL).cast(DataType::String),
            col(EPITOPE_START_COL).cast(DataType::Int64),
            col(EPITOPE_END_COL).cast(DataType::Int64),
            col(MUTATION_START_COL).cast(DataType::Int64),
            col(MUTATION_END_COL).cast(DataType::Int64),
            col(EPITOPE_COL).cast(DataType::String),
            col(IC50_COL).cast(DataType::Float64),
            thymic_deletion_expr(df),
        ];
        if has_immunogenicity {
            exprs.push(col(IMMUNOGENICITY_COL).cast(DataType::Float64));
        }
        let typed = df.clone().lazy().select(exprs).collect()?;

        let genes = typed.column(GENE_COL)?.str()?;
        let infos = typed.column(MUTATION_INFO_COL)?.str()?;
        let epitope_starts = typed.column(EPITOPE_START_COL)?.i64()?;
        let epitope_ends = typed.column(EPITOPE_END_COL)?.i64()?;
        let mutation_starts = typed.column(MUTATION_START_COL)?.i64()?;
        let mutation_ends = typed.column(MUTATION_END_COL)?.i64()?;
        let epitopes = typed.column(EPITOPE_COL)?.str()?;
        let ic50s = typed.column(IC50_COL)?.f64()?;
        let deletions = typed.column(THYMIC_DELETION_COL)?.bool()?;
        let scores = if has_immunogenicity {
            Some(typed.column(IMMUNOGENICITY_COL)?.f64()?)
        } else {
            None
        };

        let mut records = Vec::with_capacity(typed.height());
        for i in 0..typed.height() {
            records.push(ScoredEpitope {
                gene: genes.get(i).ok_or_else(|| null_cell(TABLE, GENE_COL, i))?.to_string(),
                gene_mutation_info: infos
                    .get(i)
                    .ok_or_else(|| null_cell(TABLE, MUTATION_INFO_COL, i))?
                    .to_string(),
                epitope_start: epitope_starts
                    .get(i)
                    .ok_or_else(|| null_cell(TABLE, EPITOPE_START_COL, i))?,
                epitope_end: epitope_ends
                    .get(i)
                    .ok_or_else(|| null_cell(TABLE, EPITOPE_END_COL, i))?,
                mutation_start: mutation_starts
                    .get(i)
                    .ok_or_else(|| null_cell(TABLE, MUTATION_START_COL, i))?,
                mutation_end: mutation_ends
                    .get(i)
                    .ok_or_else(|| null_cell(TABLE, MUTATION_END_COL, i))?,
                epitope: epitopes
                    .get(i)
                    .ok_or_else(|| null_cell(TABLE, EPITOPE_COL, i))?
                    .to_string(),
                mhc_ic50: ic50s.get(i).ok_or_else(|| null_cell(TABLE, IC50_COL, i))?,
                immunogenicity: scores.and_then(|s| s.get(i)),
                thymic_deletion: deletions
                    .get(i)
                    .ok_or_else(|| null_cell(TABLE, THYMIC_DELETION_COL, i))?,
            });
        }
        Ok(records)
    }
}

/// Column `name` cast to text, one entry per row. Missing columns and null or
/// uncastable cells come back as `None`.
fn text_cells(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<String>>> {
    if !df.schema().contains(name) {
        return Ok(vec![None; df.height()]);
    }
    let column = df.column(name)?.cast(&DataType::String)?;
    Ok(column
        .str()?
        .into_iter()
        .map(|cell| cell.map(str::to_string))
        .collect())
}

fn int_cells(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<i64>>> {
    if !df.schema().contains(name) {
        return Ok(vec![None; df.height()]);
    }
    let column = df.column(name)?.cast(&DataType::Int64)?;
    Ok(column.i64()?.into_iter().collect())
}

impl MutationRecord {
    /// Reads the transcript table for display. Unlike the scoring path this
    /// never rejects a table; absent values stay `None`.
    pub fn from_frame(df: &DataFrame) -> Result<Vec<MutationRecord>> {
        let genes = text_cells(df, GENE_COL)?;
        let transcripts = text_cells(df, TRANSCRIPT_COL)?;
        let starts = int_cells(df, MUTATION_START_COL)?;
        let ends = int_cells(df, MUTATION_END_COL)?;
        let infos = text_cells(df, MUTATION_INFO_COL)?;

        Ok(genes
            .into_iter()
            .zip(transcripts)
            .zip(starts.into_iter().zip(ends))
            .zip(infos)
            .map(
                |(((gene, transcript_id), (mutation_start, mutation_end)), description)| {
                    MutationRecord {
                        gene,
                        transcript_id,
                        mutation_start,
                        mutation_end,
                        description,
                    }
                },
            )
            .collect())
    }
}

// ─── Collaborator seams ──────────────────────────────────────────────────────

/// Everything the mutation loader produces for one MAF/VCF file.
pub struct LoadedMutations {
    pub transcripts: DataFrame,
    pub raw_variants: DataFrame,
    pub report: Vec<VariantReportEntry>,
}

pub trait MutationLoader {
    fn load(&self, path: &Path) -> Result<LoadedMutations>;
}

pub trait BindingPredictor {
    fn predict(&self, transcripts: &DataFrame) -> Result<DataFrame>;
}

pub trait ImmunogenicityPredictor {
    fn predict(&self, scored_epitopes: DataFrame) -> Result<DataFrame>;
}

/// Builds the per-patient predictors, which are configured with that
/// patient's HLA alleles.
pub trait PredictorFactory {
    fn binding_predictor(&self, alleles: &[String]) -> Box<dyn BindingPredictor + '_>;

    fn immunogenicity_predictor(
        &self,
        alleles: &[String],
        binding_threshold: u32,
    ) -> Box<dyn ImmunogenicityPredictor + '_>;
}
