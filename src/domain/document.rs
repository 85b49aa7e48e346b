//! In-memory compose document
//!
//! Documents are only ever replaced as a whole; there is no patch API.

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Compose document must be a mapping, got {0}")]
    NotAMapping(&'static str),
}

/// A merged compose document (a YAML mapping held as JSON values, key order kept)
#[derive(Debug, Clone, PartialEq)]
pub struct ComposeDocument {
    root: Value,
}

impl ComposeDocument {
    /// Wraps a value, rejecting anything that is not a mapping
    pub fn from_value(root: Value) -> Result<Self, DocumentError> {
        match root {
            Value::Object(_) => Ok(Self { root }),
            other => Err(DocumentError::NotAMapping(kind(&other))),
        }
    }

    /// Parses YAML text. An empty document is an empty mapping.
    pub fn from_yaml(text: &str) -> Result<Self, DocumentError> {
        let root: Option<Value> = serde_yaml::from_str(text)?;
        Self::from_value(root.unwrap_or_else(|| Value::Object(Default::default())))
    }

    pub fn to_yaml(&self) -> Result<String, DocumentError> {
        Ok(serde_yaml::to_string(&self.root)?)
    }

    pub fn as_value(&self) -> &Value {
        &self.root
    }

    /// First key of a top-level section such as `services` or `networks`
    pub fn first_key(&self, section: &str) -> Option<&str> {
        self.root
            .get(section)
            .and_then(Value::as_object)
            .and_then(|m| m.keys().next())
            .map(String::as_str)
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}
