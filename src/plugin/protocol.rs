//! Plugin protocol types
//!
//! A plugin is evaluated with a set of external variables, each holding a
//! JSON value: `action` plus the payload keys (`user_data`, and
//! `docker_file` for document rewrites). It must answer with a JSON object
//! holding exactly one key, the action name, whose value is the result.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::domain::VarMap;

/// Payload key carrying the variable mapping
pub const USER_DATA: &str = "user_data";

/// Payload key carrying the current compose document
pub const DOCKER_FILE: &str = "docker_file";

/// Operations a plugin can be asked to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginAction {
    /// Self-description of the plugin
    Metadata,

    /// Default variables, merged fill-only before the static layers
    VarsDefault,

    /// Variables filling gaps left by the explicit layers
    VarsOverride,

    /// Full replacement of the merged compose document
    DockerOverride,
}

impl PluginAction {
    pub const ALL: [PluginAction; 4] = [
        PluginAction::Metadata,
        PluginAction::VarsDefault,
        PluginAction::VarsOverride,
        PluginAction::DockerOverride,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PluginAction::Metadata => "metadata",
            PluginAction::VarsDefault => "vars_default",
            PluginAction::VarsOverride => "vars_override",
            PluginAction::DockerOverride => "docker_override",
        }
    }
}

impl fmt::Display for PluginAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PluginAction {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| ProtocolError::UnknownAction(s.to_string()))
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    #[error("Unknown plugin action: {0}")]
    UnknownAction(String),

    #[error("Plugin output is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("Plugin output must be a JSON object")]
    NotAnObject,

    #[error("Plugin output must contain exactly the key '{expected}', got [{found}]")]
    UnexpectedKeys { expected: String, found: String },

    #[error("Plugin result for '{0}' must be a JSON object")]
    ResultNotAnObject(String),
}

/// A request sent to a plugin
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PluginRequest {
    pub action: PluginAction,

    /// External variables besides `action`
    pub payload: VarMap,
}

impl PluginRequest {
    pub fn new(action: PluginAction) -> Self {
        Self {
            action,
            payload: VarMap::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    /// `(name, json)` pairs for every external variable, `action` first
    pub fn ext_vars(&self) -> Vec<(String, String)> {
        let mut vars = Vec::with_capacity(self.payload.len() + 1);
        vars.push((
            "action".to_string(),
            Value::String(self.action.as_str().to_string()).to_string(),
        ));
        for (key, value) in &self.payload {
            vars.push((key.clone(), value.to_string()));
        }
        vars
    }
}

/// Parses interpreter output and extracts the action's result object
pub fn parse_response(action: PluginAction, output: &str) -> Result<VarMap, ProtocolError> {
    let value: Value =
        serde_json::from_str(output).map_err(|e| ProtocolError::InvalidJson(e.to_string()))?;

    let mut object = match value {
        Value::Object(o) => o,
        _ => return Err(ProtocolError::NotAnObject),
    };

    if object.len() != 1 || !object.contains_key(action.as_str()) {
        return Err(ProtocolError::UnexpectedKeys {
            expected: action.as_str().to_string(),
            found: object.keys().cloned().collect::<Vec<_>>().join(", "),
        });
    }

    match object.shift_remove(action.as_str()) {
        Some(Value::Object(result)) => Ok(result),
        _ => Err(ProtocolError::ResultNotAnObject(action.as_str().to_string())),
    }
}
