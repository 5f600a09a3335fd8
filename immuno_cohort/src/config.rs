//! Locations of the external tools the pipeline shells out to.
//!
//! Looked up, in order, from `--tools-config`, `<project root>/immuno_tools.json`
//! and finally the defaults under `<project root>/scripts/`. Every field of the
//! JSON file is optional:
//!
//! ```json
//! {
//!   "python": "/opt/immuno/env/bin/python",
//!   "mutation_loader": "scripts/load_mutations.py",
//!   "binding_predictor": "scripts/predict_binding.py",
//!   "immunogenicity_predictor": "scripts/predict_immunogenicity.py"
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::helper_functions::{project_root, resolve_from_root};

pub const CONFIG_FILE_NAME: &str = "immuno_tools.json";
const DEFAULT_INTERPRETER: &str = "python3";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    /// Interpreter used to run every script; `python3` from `PATH` when unset.
    pub python: Option<PathBuf>,
    pub mutation_loader: PathBuf,
    pub binding_predictor: PathBuf,
    pub immunogenicity_predictor: PathBuf,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            python: None,
            mutation_loader: PathBuf::from("scripts/load_mutations.py"),
            binding_predictor: PathBuf::from("scripts/predict_binding.py"),
            immunogenicity_predictor: PathBuf::from("scripts/predict_immunogenicity.py"),
        }
    }
}

impl ToolConfig {
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(p) => Some(p.to_path_buf()),
            None => {
                let candidate = project_root().join(CONFIG_FILE_NAME);
                candidate.is_file().then_some(candidate)
            }
        };

        let config = match path {
            Some(path) => {
                info!("Reading tool configuration from {}", path.display());
                let contents = fs::read_to_string(&path)
                    .with_context(|| format!("reading tool configuration {}", path.display()))?;
                serde_json::from_str(&contents)
                    .with_context(|| format!("parsing tool configuration {}", path.display()))?
            }
            None => {
                debug!("No {} found, using default tool locations", CONFIG_FILE_NAME);
                ToolConfig::default()
            }
        };
        Ok(config.resolved())
    }

    /// Rebases relative script paths onto the project root.
    pub fn resolved(self) -> Self {
        Self {
            python: self.python.map(|p| {
                if p.components().count() > 1 {
                    resolve_from_root(&p)
                } else {
                    p
                }
            }),
            mutation_loader: resolve_from_root(&self.mutation_loader),
            binding_predictor: resolve_from_root(&self.binding_predictor),
            immunogenicity_predictor: resolve_from_root(&self.immunogenicity_predictor),
        }
    }

    /// The interpreter to launch scripts with. A bare program name is looked up
    /// on `PATH`.
    pub fn interpreter(&self) -> Result<PathBuf> {
        match &self.python {
            Some(p) if p.components().count() > 1 => Ok(p.clone()),
            Some(p) => which::which(p).with_context(|| format!("{} not found on PATH", p.display())),
            None => which::which(DEFAULT_INTERPRETER)
                .with_context(|| format!("{DEFAULT_INTERPRETER} not found on PATH")),
        }
    }
}
