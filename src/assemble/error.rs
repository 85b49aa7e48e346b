//! Pipeline errors and stages

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::plugin::{PluginAction, PluginError};

/// Fatal errors that abort one stack's assembly
#[derive(Debug, Error)]
pub enum AssembleError {
    #[error("No base compose file for stack '{stack}' (searched {})", display_paths(searched))]
    MissingBaseFragment { stack: String, searched: Vec<PathBuf> },

    #[error("Plugin evaluation failed for {} ({action}): {message}", path.display())]
    PluginEvaluationFailed {
        path: PathBuf,
        action: PluginAction,
        message: String,
    },

    #[error("Compose engine failed on [{}]: {diagnostic}", display_paths(fragments))]
    ComposeEngineFailed {
        fragments: Vec<PathBuf>,
        diagnostic: String,
    },

    #[error("Invalid YAML in {}: {message}", path.display())]
    InvalidYaml { path: PathBuf, message: String },

    #[error("Failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<PluginError> for AssembleError {
    fn from(err: PluginError) -> Self {
        match err {
            PluginError::EvaluationFailed {
                path,
                action,
                message,
            } => AssembleError::PluginEvaluationFailed {
                path,
                action,
                message,
            },
        }
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// States of one assemble run, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Plan,
    Vars,
    Merge,
    Override,
    Write,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Plan => "plan",
            Stage::Vars => "vars",
            Stage::Merge => "merge",
            Stage::Override => "override",
            Stage::Write => "write",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// A stack that reached the failed state
#[derive(Debug, Error)]
#[error("Stack '{stack}' failed during {stage}: {error}")]
pub struct StackFailure {
    pub stack: String,
    pub stage: Stage,
    #[source]
    pub error: AssembleError,
}
