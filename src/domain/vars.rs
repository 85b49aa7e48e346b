//! Variables, interpolation and the resolved environment
//!
//! Variable layers are ordered lists, not maps: a later entry may reference
//! an earlier one through `$name` / `${name}` substitution.

use std::fmt;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Insertion-ordered variable mapping (serde_json is built with `preserve_order`)
pub type VarMap = serde_json::Map<String, Value>;

/// A scalar value a configuration file may assign to a variable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VarValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl VarValue {
    pub fn to_json(&self) -> Value {
        match self {
            VarValue::Bool(b) => Value::Bool(*b),
            VarValue::Int(i) => Value::from(*i),
            VarValue::Str(s) => Value::String(s.clone()),
        }
    }
}

impl From<&str> for VarValue {
    fn from(s: &str) -> Self {
        VarValue::Str(s.to_string())
    }
}

/// One `{name: value}` declaration. `None` unsets the variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableEntry {
    pub name: String,
    pub value: Option<VarValue>,
}

impl VariableEntry {
    pub fn new(name: impl Into<String>, value: Option<VarValue>) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    /// Returns true if `name` is a valid variable identifier
    pub fn is_valid_name(name: &str) -> bool {
        let mut chars = name.chars();
        match chars.next() {
            Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
            _ => return false,
        }
        chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
    }
}

/// Ordered list of variable declarations (project, stack or tag layer)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VarList {
    entries: Vec<VariableEntry>,
}

impl VarList {
    pub fn new(entries: Vec<VariableEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[VariableEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Exports the raw declarations as an ordered mapping, without interpolation.
    /// Unset entries are exported as `null`.
    pub fn to_map(&self) -> VarMap {
        let mut map = VarMap::new();
        for entry in &self.entries {
            let value = entry.value.as_ref().map(VarValue::to_json).unwrap_or(Value::Null);
            map.insert(entry.name.clone(), value);
        }
        map
    }

    /// Interpolates every entry against `current` and writes it over the mapping.
    ///
    /// Each entry sees the values written by the entries before it. A string
    /// that cannot be fully substituted is written verbatim and reported in
    /// `warnings`. Unset entries remove the key.
    pub fn apply(&self, current: &mut VarMap, warnings: &mut Vec<UnresolvedVariable>) {
        for entry in &self.entries {
            let value = match &entry.value {
                None => {
                    current.shift_remove(&entry.name);
                    continue;
                }
                Some(VarValue::Str(template)) => match interpolate(template, current) {
                    Ok(expanded) => Value::String(expanded),
                    Err(reason) => {
                        warnings.push(UnresolvedVariable {
                            name: entry.name.clone(),
                            template: template.clone(),
                            reason,
                        });
                        Value::String(template.clone())
                    }
                },
                Some(other) => other.to_json(),
            };
            current.insert(entry.name.clone(), value);
        }
    }
}

/// Why a template could not be substituted
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InterpolationError {
    #[error("variable '{name}' is not defined")]
    Missing { name: String },

    #[error("invalid placeholder at offset {offset}")]
    InvalidPlaceholder { offset: usize },
}

/// A variable whose value kept its literal template (non-fatal)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedVariable {
    pub name: String,
    pub template: String,
    pub reason: InterpolationError,
}

impl fmt::Display for UnresolvedVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}='{}': {}", self.name, self.template, self.reason)
    }
}

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"\$(?:(?P<escaped>\$)|(?P<named>[_A-Za-z][_A-Za-z0-9]*)|\{(?P<braced>[_A-Za-z][_A-Za-z0-9]*)\}|(?P<invalid>))",
        )
        .expect("placeholder pattern is valid")
    })
}

/// Substitutes `$name`, `${name}` and `$$` in `template` from `vars`.
///
/// All or nothing: the first missing name or malformed placeholder fails the
/// whole template.
pub fn interpolate(template: &str, vars: &VarMap) -> Result<String, InterpolationError> {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;

    for caps in placeholder_pattern().captures_iter(template) {
        let whole = caps.get(0).map(|m| (m.start(), m.end())).unwrap_or((last, last));
        out.push_str(&template[last..whole.0]);
        out.push_str(&expand(&caps, whole.0, vars)?);
        last = whole.1;
    }

    out.push_str(&template[last..]);
    Ok(out)
}

fn expand(caps: &Captures<'_>, offset: usize, vars: &VarMap) -> Result<String, InterpolationError> {
    if caps.name("escaped").is_some() {
        return Ok("$".to_string());
    }

    let name = caps
        .name("named")
        .or_else(|| caps.name("braced"))
        .map(|m| m.as_str())
        .ok_or(InterpolationError::InvalidPlaceholder { offset })?;

    vars.get(name)
        .map(render_value)
        .ok_or_else(|| InterpolationError::Missing {
            name: name.to_string(),
        })
}

/// Renders a value the way it is substituted into strings and exported to
/// the compose engine
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Falsy values can be filled by a fill-only merge
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Fill-only merge: writes each incoming key whose current value is absent or
/// falsy. Returns the names that were written.
pub fn fill_missing(target: &mut VarMap, incoming: VarMap) -> Vec<String> {
    let mut filled = Vec::new();
    for (key, value) in incoming {
        let occupied = target.get(&key).map(is_truthy).unwrap_or(false);
        if !occupied {
            target.insert(key.clone(), value);
            filled.push(key);
        }
    }
    filled
}

/// The fully resolved variables of one stack
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VariableEnvironment {
    vars: VarMap,
    warnings: Vec<UnresolvedVariable>,
}

impl VariableEnvironment {
    pub fn new(vars: VarMap, warnings: Vec<UnresolvedVariable>) -> Self {
        Self { vars, warnings }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    /// Returns the value rendered as a string
    pub fn get_str(&self, name: &str) -> Option<String> {
        self.vars.get(name).map(render_value)
    }

    pub fn vars(&self) -> &VarMap {
        &self.vars
    }

    pub fn warnings(&self) -> &[UnresolvedVariable] {
        &self.warnings
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Flat `KEY=value` pairs for a child process environment, nulls dropped
    pub fn to_process_env(&self) -> Vec<(String, String)> {
        self.vars
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| (k.clone(), render_value(v)))
            .collect()
    }
}
