use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CohortError {
    #[error("duplicate files for {patient_id}: {first} and {second}")]
    DuplicateFile {
        patient_id: String,
        first: PathBuf,
        second: PathBuf,
    },
    #[error("missing HLA types for {patient_id} ({path})")]
    MissingHlaData { patient_id: String, path: PathBuf },
    #[error("invalid HLA allele name {token:?} in {path}")]
    InvalidAllele { token: String, path: PathBuf },
    #[error("{tool} exited with {status}: {stderr}")]
    ToolFailed {
        tool: String,
        status: ExitStatus,
        stderr: String,
    },
    #[error("malformed {table} table: {reason}")]
    MalformedTable { table: String, reason: String },
}

impl CohortError {
    pub fn malformed(table: &str, reason: impl Into<String>) -> Self {
        CohortError::MalformedTable {
            table: table.to_string(),
            reason: reason.into(),
        }
    }
}
