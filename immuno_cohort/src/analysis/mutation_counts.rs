//! Reduces a patient's scored epitopes to mutation-level counts.
//!
//! Epitopes are grouped by originating coding mutation (gene plus mutation
//! description). Within a group only epitopes overlapping the mutated residues
//! are kept, identical peptides reached through different transcripts are
//! collapsed, and the group then counts as a ligand mutation if any epitope
//! binds at or below the IC50 threshold, and as an immunogenic mutation if any
//! of those binders escapes thymic deletion.

use std::collections::{BTreeMap, HashSet};

use tracing::info;

use crate::models::{MutationCounts, ScoredEpitope};

pub const DEFAULT_BINDING_THRESHOLD: u32 = 500;

/// Per-mutation tallies, kept for logging and inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationGroupSummary {
    pub gene: String,
    pub mutation: String,
    pub n_epitopes: usize,
    pub n_ligands: usize,
    pub n_immunogenic: usize,
}

/// Both bounds inclusive, compared exactly as the predictor reports them.
fn overlaps_mutation(e: &ScoredEpitope) -> bool {
    e.epitope_start <= e.mutation_end && e.epitope_end >= e.mutation_start
}

/// Groups epitopes by `(gene, mutation)` in key order.
pub fn group_by_mutation(
    epitopes: &[ScoredEpitope],
) -> BTreeMap<(&str, &str), Vec<&ScoredEpitope>> {
    let mut groups: BTreeMap<(&str, &str), Vec<&ScoredEpitope>> = BTreeMap::new();
    for e in epitopes {
        groups
            .entry((e.gene.as_str(), e.gene_mutation_info.as_str()))
            .or_default()
            .push(e);
    }
    groups
}

/// Scores one mutation group.
pub fn summarize_group(
    gene: &str,
    mutation: &str,
    group: &[&ScoredEpitope],
    binding_threshold: u32,
) -> MutationGroupSummary {
    // first occurrence wins when several transcripts yield the same peptide
    let mut seen = HashSet::new();
    let mutated: Vec<&ScoredEpitope> = group
        .iter()
        .copied()
        .filter(|e| overlaps_mutation(e))
        .filter(|e| seen.insert(e.epitope.as_str()))
        .collect();

    let threshold = f64::from(binding_threshold);
    let ligands: Vec<&ScoredEpitope> = mutated
        .iter()
        .copied()
        .filter(|e| e.mhc_ic50 <= threshold)
        .collect();
    let n_immunogenic = ligands.iter().filter(|e| !e.thymic_deletion).count();

    MutationGroupSummary {
        gene: gene.to_string(),
        mutation: mutation.to_string(),
        n_epitopes: mutated.len(),
        n_ligands: ligands.len(),
        n_immunogenic,
    }
}

/// Counts coding, ligand and immunogenic mutations for one patient.
pub fn count_mutations(epitopes: &[ScoredEpitope], binding_threshold: u32) -> MutationCounts {
    let groups = group_by_mutation(epitopes);
    let mut counts = MutationCounts {
        n_coding_mutations: groups.len(),
        ..MutationCounts::default()
    };

    for ((gene, mutation), group) in &groups {
        let summary = summarize_group(gene, mutation, group, binding_threshold);
        if summary.n_ligands > 0 {
            counts.n_ligand_mutations += 1;
        }
        if summary.n_immunogenic > 0 {
            counts.n_immunogenic_mutations += 1;
        }
        info!(
            "{} {}: epitopes {}, ligands {}, imm {}",
            summary.gene,
            summary.mutation,
            summary.n_epitopes,
            summary.n_ligands,
            summary.n_immunogenic
        );
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn epitope(gene: &str, mutation: &str, seq: &str, start: i64, ic50: f64, deleted: bool) -> ScoredEpitope {
        ScoredEpitope {
            gene: gene.to_string(),
            gene_mutation_info: mutation.to_string(),
            epitope_start: start,
            epitope_end: start + seq.len() as i64 - 1,
            mutation_start: 10,
            mutation_end: 10,
            epitope: seq.to_string(),
            mhc_ic50: ic50,
            immunogenicity: None,
            thymic_deletion: deleted,
        }
    }

    fn counts(c: usize, l: usize, i: usize) -> MutationCounts {
        MutationCounts {
            n_coding_mutations: c,
            n_ligand_mutations: l,
            n_immunogenic_mutations: i,
        }
    }

    #[test]
    fn binder_and_non_binder_in_one_mutation() {
        let epitopes = vec![
            epitope("TP53", "R175H", "HMTEVVRHC", 5, 300.0, false),
            epitope("TP53", "R175H", "MTEVVRHCP", 6, 800.0, false),
        ];
        assert_eq!(count_mutations(&epitopes, 500), counts(1, 1, 1));
    }

    #[test]
    fn thymic_deletion_removes_the_only_binder() {
        let epitopes = vec![
            epitope("TP53", "R175H", "HMTEVVRHC", 5, 300.0, true),
            epitope("TP53", "R175H", "MTEVVRHCP", 6, 800.0, false),
        ];
        assert_eq!(count_mutations(&epitopes, 500), counts(1, 1, 0));
    }

    #[test]
    fn no_epitopes_means_no_mutations() {
        assert_eq!(count_mutations(&[], 500), counts(0, 0, 0));
    }

    #[test]
    fn epitopes_outside_the_mutation_only_count_as_coding() {
        // mutation at residue 10; epitope covers 11..=19
        let epitopes = vec![epitope("KRAS", "G12D", "VVGADGVGK", 11, 50.0, false)];
        assert_eq!(count_mutations(&epitopes, 500), counts(1, 0, 0));
    }

    #[test]
    fn overlap_bounds_are_inclusive() {
        // ends exactly on the mutated residue
        let ending = epitope("KRAS", "G12D", "VVGADGVGK", 2, 50.0, false);
        assert_eq!(ending.epitope_end, 10);
        // starts exactly on it
        let starting = epitope("KRAS", "G12V", "VVGAVGVGK", 10, 50.0, false);
        assert_eq!(count_mutations(&[ending, starting], 500), counts(2, 2, 2));
    }

    #[test]
    fn ic50_equal_to_threshold_is_a_ligand() {
        let epitopes = vec![epitope("TP53", "R175H", "HMTEVVRHC", 5, 500.0, false)];
        assert_eq!(count_mutations(&epitopes, 500), counts(1, 1, 1));
        assert_eq!(count_mutations(&epitopes, 499), counts(1, 0, 0));
    }

    #[test]
    fn non_binding_non_deleted_epitope_is_not_immunogenic() {
        let epitopes = vec![epitope("TP53", "R175H", "HMTEVVRHC", 5, 5000.0, false)];
        assert_eq!(count_mutations(&epitopes, 500), counts(1, 0, 0));
    }

    #[test]
    fn coding_mutations_are_distinct_gene_mutation_pairs() {
        let epitopes = vec![
            epitope("TP53", "R175H", "HMTEVVRHC", 5, 9000.0, false),
            epitope("TP53", "R175H", "MTEVVRHCP", 6, 9000.0, false),
            epitope("TP53", "R248Q", "MNQRPILTI", 5, 9000.0, false),
            epitope("KRAS", "R175H", "VVGADGVGK", 5, 9000.0, false),
        ];
        assert_eq!(count_mutations(&epitopes, 500).n_coding_mutations, 3);
    }

    #[test]
    fn duplicate_transcript_epitopes_do_not_change_counts() {
        let base = vec![
            epitope("TP53", "R175H", "HMTEVVRHC", 5, 300.0, false),
            epitope("KRAS", "G12D", "VVGADGVGK", 4, 900.0, false),
        ];
        let mut with_duplicate = base.clone();
        with_duplicate.push(epitope("TP53", "R175H", "HMTEVVRHC", 5, 300.0, false));
        assert_eq!(count_mutations(&base, 500), count_mutations(&with_duplicate, 500));

        let groups = group_by_mutation(&with_duplicate);
        let tp53 = &groups[&("TP53", "R175H")];
        assert_eq!(tp53.len(), 2);
        assert_eq!(summarize_group("TP53", "R175H", tp53, 500).n_epitopes, 1);
    }

    #[test]
    fn first_occurrence_of_a_duplicate_is_the_one_scored() {
        // same peptide seen through two transcripts with different affinities
        let epitopes = vec![
            epitope("TP53", "R175H", "HMTEVVRHC", 5, 900.0, false),
            epitope("TP53", "R175H", "HMTEVVRHC", 5, 100.0, false),
        ];
        assert_eq!(count_mutations(&epitopes, 500), counts(1, 0, 0));
    }

    #[test]
    fn overlap_is_checked_before_duplicates_are_dropped() {
        // the first copy lies outside the mutation, so the overlapping one is scored
        let epitopes = vec![
            epitope("TP53", "R175H", "HMTEVVRHC", 20, 900.0, true),
            epitope("TP53", "R175H", "HMTEVVRHC", 5, 300.0, false),
        ];
        assert_eq!(count_mutations(&epitopes, 500), counts(1, 1, 1));
    }

    #[test]
    fn counts_are_nested_and_monotone_in_threshold() {
        let epitopes = vec![
            epitope("TP53", "R175H", "HMTEVVRHC", 5, 120.0, true),
            epitope("TP53", "R175H", "MTEVVRHCP", 6, 640.0, false),
            epitope("KRAS", "G12D", "VVGADGVGK", 4, 480.0, false),
            epitope("KRAS", "G12D", "LVVVGADGV", 3, 2200.0, true),
            epitope("EGFR", "L858R", "KITDFGRAK", 6, 9100.0, false),
            epitope("BRAF", "V600E", "GLATEKSRW", 20, 30.0, false),
        ];
        let mut previous = counts(0, 0, 0);
        for threshold in [0, 50, 120, 480, 500, 640, 2200, 10_000] {
            let c = count_mutations(&epitopes, threshold);
            assert_eq!(c.n_coding_mutations, 4);
            assert!(c.n_ligand_mutations <= c.n_coding_mutations);
            assert!(c.n_immunogenic_mutations <= c.n_ligand_mutations);
            assert!(c.n_ligand_mutations >= previous.n_ligand_mutations);
            assert!(c.n_immunogenic_mutations >= previous.n_immunogenic_mutations);
            previous = c;
        }
        assert_eq!(count_mutations(&epitopes, 500), counts(4, 2, 1));
        assert_eq!(count_mutations(&epitopes, 10_000), counts(4, 3, 3));
    }
}
