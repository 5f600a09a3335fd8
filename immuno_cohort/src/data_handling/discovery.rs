//! Finds the per-patient input files.
//!
//! A patient id is the file name without its extension, so `P1.maf` and
//! `P1.hla` belong to the same patient. Directories are scanned in the order
//! given and their entries in file-name order.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::data_handling::hla::{normalize_hla_allele_name, split_allele_tokens};
use crate::errors::CohortError;
use crate::models::{HlaTyping, PatientMap};

pub const MUTATION_FILE_EXTENSIONS: [&str; 2] = ["maf", "vcf"];
pub const HLA_FILE_EXTENSION: &str = "hla";

/// Regular files in `dir` as `(patient_id, extension, path)`, sorted by file name.
fn list_patient_files(dir: &Path) -> Result<Vec<(String, String, PathBuf)>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("listing {}", dir.display()))? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let (Some(stem), Some(ext)) = (path.file_stem(), path.extension()) else {
            continue;
        };
        files.push((
            stem.to_string_lossy().into_owned(),
            ext.to_string_lossy().into_owned(),
            path.clone(),
        ));
    }
    files.sort_by(|a, b| a.2.file_name().cmp(&b.2.file_name()));
    Ok(files)
}

fn duplicate(patient_id: &str, first: &Path, second: &Path) -> CohortError {
    CohortError::DuplicateFile {
        patient_id: patient_id.to_string(),
        first: first.to_path_buf(),
        second: second.to_path_buf(),
    }
}

/// Collects every `.maf`/`.vcf` file in `dirs`, keyed by patient id.
pub fn find_mutation_files(dirs: &[PathBuf]) -> Result<PatientMap<PathBuf>> {
    let mut mutation_files: PatientMap<PathBuf> = PatientMap::new();
    for dir in dirs {
        for (patient_id, ext, path) in list_patient_files(dir)? {
            if !MUTATION_FILE_EXTENSIONS.contains(&ext.as_str()) {
                continue;
            }
            info!("Reading mutation file {}", path.display());
            if let Some(existing) = mutation_files.get(&patient_id) {
                return Err(duplicate(&patient_id, existing, &path).into());
            }
            mutation_files.insert(patient_id, path);
        }
    }
    Ok(mutation_files)
}

/// Reads one `.hla` file into its normalized allele list.
pub fn read_hla_file(path: &Path) -> Result<Vec<String>> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("reading HLA file {}", path.display()))?;
    split_allele_tokens(&contents)
        .map(|token| {
            normalize_hla_allele_name(token).ok_or_else(|| {
                anyhow::Error::from(CohortError::InvalidAllele {
                    token: token.to_string(),
                    path: path.to_path_buf(),
                })
            })
        })
        .collect()
}

/// Collects every `.hla` file in `dirs` and reads its alleles, keyed by
/// patient id.
pub fn find_hla_files(dirs: &[PathBuf]) -> Result<PatientMap<HlaTyping>> {
    let mut hla_types: PatientMap<HlaTyping> = PatientMap::new();
    for dir in dirs {
        for (patient_id, ext, path) in list_patient_files(dir)? {
            if ext != HLA_FILE_EXTENSION {
                continue;
            }
            info!("Reading HLA file {}", path.display());
            if let Some(existing) = hla_types.get(&patient_id) {
                return Err(duplicate(&patient_id, &existing.path, &path).into());
            }
            let alleles = read_hla_file(&path)?;
            hla_types.insert(patient_id, HlaTyping { path, alleles });
        }
    }
    Ok(hla_types)
}

/// Every patient with a mutation file must also have HLA types.
pub fn check_hla_coverage(
    mutation_files: &PatientMap<PathBuf>,
    hla_types: &PatientMap<HlaTyping>,
) -> Result<(), CohortError> {
    for (patient_id, path) in mutation_files.iter() {
        if !hla_types.contains_key(patient_id) {
            return Err(CohortError::MissingHlaData {
                patient_id: patient_id.to_string(),
                path: path.clone(),
            });
        }
    }
    Ok(())
}
