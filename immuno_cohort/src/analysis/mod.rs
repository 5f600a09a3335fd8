pub mod cohort;
pub mod mutation_counts;
pub mod summary;
