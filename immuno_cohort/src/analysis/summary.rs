use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::models::{CohortResult, MutationCounts};

/// One line of the cohort CSV. Written without a header row.
#[derive(Debug, Serialize)]
struct CohortCsvRow<'a> {
    patient_id: &'a str,
    n_coding_mutations: usize,
    n_ligand_mutations: usize,
    n_immunogenic_mutations: usize,
}

pub fn summary_line(patient_id: &str, counts: &MutationCounts) -> String {
    format!(
        "{}: # mutations {}, # mutations with ligands {}, # immunogenic mutations {}",
        patient_id,
        counts.n_coding_mutations,
        counts.n_ligand_mutations,
        counts.n_immunogenic_mutations
    )
}

/// Prints the `SUMMARY` block to `out` and, when `output` is given, writes one
/// CSV row per patient in the same order.
pub fn write_summary(
    mutation_counts: &CohortResult,
    output: Option<&Path>,
    out: &mut impl Write,
) -> Result<()> {
    let mut csv_writer = match output {
        Some(path) => Some(
            csv::WriterBuilder::new()
                .has_headers(false)
                .from_path(path)
                .with_context(|| format!("creating {}", path.display()))?,
        ),
        None => None,
    };

    writeln!(out)?;
    writeln!(out, "SUMMARY")?;
    for (patient_id, counts) in mutation_counts.iter() {
        writeln!(out, "{}", summary_line(patient_id, counts))?;
        if let Some(wtr) = csv_writer.as_mut() {
            wtr.serialize(CohortCsvRow {
                patient_id,
                n_coding_mutations: counts.n_coding_mutations,
                n_ligand_mutations: counts.n_ligand_mutations,
                n_immunogenic_mutations: counts.n_immunogenic_mutations,
            })?;
        }
    }

    if let (Some(mut wtr), Some(path)) = (csv_writer, output) {
        wtr.flush()?;
        info!("Wrote {} patients to {}", mutation_counts.len(), path.display());
    }
    Ok(())
}
