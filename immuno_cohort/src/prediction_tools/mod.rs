pub mod binding;
pub mod immunogenicity;

use std::path::PathBuf;
use std::process::Command;

use anyhow::{Context, Result};
use tracing::{debug, error};

use crate::config::ToolConfig;
use crate::errors::CohortError;
use crate::models::{BindingPredictor, ImmunogenicityPredictor, PredictorFactory};
use crate::prediction_tools::binding::ScriptBindingPredictor;
use crate::prediction_tools::immunogenicity::ScriptImmunogenicityPredictor;

/// A helper script run through an interpreter, e.g. a Python wrapper around
/// netMHCpan.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalTool {
    pub name: String,
    pub interpreter: PathBuf,
    pub script: PathBuf,
}

impl ExternalTool {
    pub fn new(name: &str, interpreter: PathBuf, script: PathBuf) -> Self {
        Self {
            name: name.to_string(),
            interpreter,
            script,
        }
    }

    /// A command with the interpreter and script already set; callers append
    /// the tool-specific arguments.
    pub fn command(&self) -> Command {
        let mut command = Command::new(&self.interpreter);
        command.arg(&self.script);
        command
    }

    /// Runs `command` to completion. A non-zero exit becomes
    /// [`CohortError::ToolFailed`] carrying the tool's stderr.
    pub fn run(&self, mut command: Command) -> Result<()> {
        debug!("Executing {}: {:?}", self.name, command);
        let output = command
            .output()
            .with_context(|| format!("launching {} ({})", self.name, self.script.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            error!("{} STDERR: {}", self.name, stderr);
            return Err(CohortError::ToolFailed {
                tool: self.name.clone(),
                status: output.status,
                stderr,
            }
            .into());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            debug!("{} STDOUT: {}", self.name, stdout.trim());
        }
        Ok(())
    }
}

/// Builds binding and immunogenicity predictors backed by external scripts.
pub struct ScriptPredictors {
    binding: ExternalTool,
    immunogenicity: ExternalTool,
}

impl ScriptPredictors {
    pub fn new(binding: ExternalTool, immunogenicity: ExternalTool) -> Self {
        Self {
            binding,
            immunogenicity,
        }
    }

    pub fn from_config(config: &ToolConfig) -> Result<Self> {
        let python = config.interpreter()?;
        Ok(Self::new(
            ExternalTool::new(
                "binding predictor",
                python.clone(),
                config.binding_predictor.clone(),
            ),
            ExternalTool::new(
                "immunogenicity predictor",
                python,
                config.immunogenicity_predictor.clone(),
            ),
        ))
    }
}

impl PredictorFactory for ScriptPredictors {
    fn binding_predictor(&self, alleles: &[String]) -> Box<dyn BindingPredictor + '_> {
        Box::new(ScriptBindingPredictor::new(&self.binding, alleles))
    }

    fn immunogenicity_predictor(
        &self,
        alleles: &[String],
        binding_threshold: u32,
    ) -> Box<dyn ImmunogenicityPredictor + '_> {
        Box::new(ScriptImmunogenicityPredictor::new(
            &self.immunogenicity,
            alleles,
            binding_threshold,
        ))
    }
}


#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn failing_tool_reports_status_and_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fail.sh");
        fs::write(&script, "echo 'netMHCpan not installed' >&2\nexit 3\n").unwrap();
        let tool = ExternalTool::new("binding predictor", PathBuf::from("/bin/sh"), script);

        let err = tool.run(tool.command()).unwrap_err();
        match err.downcast::<CohortError>().unwrap() {
            CohortError::ToolFailed {
                tool,
                status,
                stderr,
            } => {
                assert_eq!(tool, "binding predictor");
                assert_eq!(status.code(), Some(3));
                assert_eq!(stderr, "netMHCpan not installed");
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn missing_interpreter_is_an_error() {
        let tool = ExternalTool::new(
            "loader",
            PathBuf::from("/nonexistent/python"),
            PathBuf::from("load.py"),
        );
        assert!(tool.run(tool.command()).is_err());
    }
}
