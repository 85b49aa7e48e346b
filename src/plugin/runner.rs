//! Plugin evaluation
//!
//! [`PluginRunner`] speaks the protocol; an [`Interpreter`] does the actual
//! evaluation. The default interpreter runs the `jsonnet` binary, passing
//! every external variable as `--ext-str name=<json>`, so plugins read them with
//! `std.parseJson(std.extVar(name))`.

use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;

use super::protocol::{parse_response, PluginAction, PluginRequest, DOCKER_FILE, USER_DATA};
use crate::domain::{ComposeDocument, VarMap};

/// Failure reported by an interpreter
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{0}")]
pub struct InterpreterError(pub String);

/// Evaluates a plugin file for one request and returns its raw JSON output
pub trait Interpreter: Send + Sync {
    fn evaluate(&self, file: &Path, request: &PluginRequest) -> Result<String, InterpreterError>;
}

/// Runs an external jsonnet binary
#[derive(Debug, Clone)]
pub struct JsonnetInterpreter {
    binary: PathBuf,
    lib_paths: Vec<PathBuf>,
}

impl JsonnetInterpreter {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            lib_paths: Vec::new(),
        }
    }

    /// Adds a library search path (`-J`)
    pub fn with_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.lib_paths.push(path.into());
        self
    }

    fn command(&self, file: &Path, request: &PluginRequest) -> Command {
        let mut cmd = Command::new(&self.binary);
        for path in &self.lib_paths {
            cmd.arg("-J").arg(path);
        }
        for (name, json) in request.ext_vars() {
            cmd.arg("--ext-str").arg(format!("{}={}", name, json));
        }
        cmd.arg(file);
        cmd
    }
}

impl Interpreter for JsonnetInterpreter {
    fn evaluate(&self, file: &Path, request: &PluginRequest) -> Result<String, InterpreterError> {
        let output = self.command(file, request).output().map_err(|e| {
            InterpreterError(format!(
                "Failed to run {}: {}",
                self.binary.display(),
                e
            ))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(InterpreterError(stderr.trim().to_string()));
        }

        String::from_utf8(output.stdout)
            .map_err(|e| InterpreterError(format!("Interpreter output is not UTF-8: {}", e)))
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum PluginError {
    #[error("Plugin evaluation failed for {} ({action}): {message}", path.display())]
    EvaluationFailed {
        path: PathBuf,
        action: PluginAction,
        message: String,
    },
}

/// Invokes plugins through an interpreter. Failures are never retried.
pub struct PluginRunner {
    interpreter: Box<dyn Interpreter>,
}

impl PluginRunner {
    pub fn new(interpreter: impl Interpreter + 'static) -> Self {
        Self {
            interpreter: Box::new(interpreter),
        }
    }

    /// Sends `payload` to the plugin and returns the action's result object
    pub fn invoke(
        &self,
        file: &Path,
        action: PluginAction,
        payload: VarMap,
    ) -> Result<VarMap, PluginError> {
        let request = PluginRequest { action, payload };
        let failed = |message: String| PluginError::EvaluationFailed {
            path: file.to_path_buf(),
            action,
            message,
        };

        tracing::debug!("Evaluating plugin {} ({})", file.display(), action);

        let output = self
            .interpreter
            .evaluate(file, &request)
            .map_err(|e| failed(e.0))?;

        parse_response(action, &output).map_err(|e| failed(e.to_string()))
    }

    /// The plugin's self-description
    pub fn metadata(&self, file: &Path) -> Result<VarMap, PluginError> {
        self.invoke(file, PluginAction::Metadata, VarMap::new())
    }

    /// Default variables, given the variables known so far
    pub fn vars_default(&self, file: &Path, vars: &VarMap) -> Result<VarMap, PluginError> {
        self.invoke(file, PluginAction::VarsDefault, user_data(vars))
    }

    /// Gap-filling variables, given the explicit variables
    pub fn vars_override(&self, file: &Path, vars: &VarMap) -> Result<VarMap, PluginError> {
        self.invoke(file, PluginAction::VarsOverride, user_data(vars))
    }

    /// Rewrites `document`, returning its replacement
    pub fn docker_override(
        &self,
        file: &Path,
        vars: &VarMap,
        document: &ComposeDocument,
    ) -> Result<ComposeDocument, PluginError> {
        let mut payload = user_data(vars);
        payload.insert(DOCKER_FILE.to_string(), document.as_value().clone());

        let result = self.invoke(file, PluginAction::DockerOverride, payload)?;

        ComposeDocument::from_value(serde_json::Value::Object(result)).map_err(|e| {
            PluginError::EvaluationFailed {
                path: file.to_path_buf(),
                action: PluginAction::DockerOverride,
                message: e.to_string(),
            }
        })
    }
}

fn user_data(vars: &VarMap) -> VarMap {
    let mut payload = VarMap::new();
    payload.insert(USER_DATA.to_string(), serde_json::Value::Object(vars.clone()));
    payload
}
