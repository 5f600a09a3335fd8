pub mod discovery;
pub mod hla;
pub mod mutation_file;
