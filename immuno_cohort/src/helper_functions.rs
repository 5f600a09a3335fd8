use std::env;
use std::fs::File;
use std::path::{Path, PathBuf};

use polars::prelude::*;

pub fn project_root() -> PathBuf {
    match env::var_os("PROJECT_ROOT") {
        Some(val) => PathBuf::from(val),
        None => {
            // Fall back to current directory if PROJECT_ROOT not set
            env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
        }
    }
}

/// Resolves `path` against the project root unless it is already absolute.
pub fn resolve_from_root(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        project_root().join(path)
    }
}

pub fn read_csv(file_path: &Path) -> PolarsResult<DataFrame> {
    CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(file_path.to_path_buf()))?
        .finish()
}

pub fn write_csv(df: &DataFrame, file_path: &Path) -> PolarsResult<()> {
    let mut f = File::create(file_path)?;
    CsvWriter::new(&mut f)
        .include_header(true)
        .finish(&mut df.clone())
}
