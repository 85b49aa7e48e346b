//! Raw `stackweave.yml` schema
//!
//! Every entity accepts several shapes in YAML. Each shape is a variant of an
//! untagged enum here and is normalized into one domain struct before any
//! resolution runs.

use std::path::{Component, Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::domain::{Tag, VarList, VarMap, VarValue, VariableEntry};

#[derive(Debug, Error, PartialEq)]
pub enum ManifestError {
    #[error("Invalid variable name: '{0}'")]
    InvalidVarName(String),

    #[error("Variable '{name}' must be a string, boolean, integer or null")]
    InvalidVarValue { name: String },

    #[error("Variable declaration must have exactly one key, got {0}")]
    VarArity(usize),

    #[error("Variable declaration '{0}' must have the form NAME=value")]
    InvalidAssignment(String),

    #[error("Tag declaration must have exactly one key, got {0}")]
    TagArity(usize),

    #[error("Invalid tag name: '{0}'")]
    InvalidTagName(String),

    #[error("Stack declaration needs a path, a name or an app")]
    AnonymousStack,

    #[error("Invalid stack path '{0}': must be relative and stay inside the project")]
    InvalidStackPath(String),
}

/// Top-level project file
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawProject {
    pub config: Option<RawProjectConfig>,

    /// Source definitions are consumed by the installer, not by assembly
    pub sources: Option<serde_yaml::Value>,

    pub stacks: Option<Vec<RawStack>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawProjectConfig {
    pub namespace: Option<String>,
    pub vars: Option<RawVars>,
    pub tags: Option<Vec<RawTag>>,
    pub tags_prefix: Option<Vec<RawTag>>,
    pub tags_suffix: Option<Vec<RawTag>>,
}

/// A stack given as a bare string or as a mapping
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawStack {
    Short(String),
    Full(RawStackFields),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawStackFields {
    pub path: Option<String>,
    pub name: Option<String>,
    pub app: Option<String>,
    pub service: Option<String>,
    pub network: Option<String>,
    pub tags: Option<Vec<RawTag>>,
    pub tags_prefix: Option<Vec<RawTag>>,
    pub tags_suffix: Option<Vec<RawTag>>,
    pub vars: Option<RawVars>,
}

impl RawStack {
    /// A short string containing `:` names an app, anything else a path
    pub fn into_fields(self) -> RawStackFields {
        match self {
            RawStack::Short(s) if s.contains(':') => RawStackFields {
                app: Some(s),
                ..Default::default()
            },
            RawStack::Short(s) => RawStackFields {
                path: Some(s),
                ..Default::default()
            },
            RawStack::Full(fields) => fields,
        }
    }
}

/// A tag given as a name or as `{name: vars}`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawTag {
    Name(String),
    WithVars(serde_json::Map<String, Value>),
}

/// Variables given as a list (preferred, ordered) or a mapping
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawVars {
    List(Vec<RawVar>),
    Map(VarMap),
}

/// One list item: `{NAME: value}` or `"NAME=value"`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawVar {
    Assignment(String),
    Pair(VarMap),
}

/// Normalizes an optional raw variable block
pub fn normalize_vars(raw: Option<RawVars>) -> Result<VarList, ManifestError> {
    let mut entries = Vec::new();

    match raw {
        None => {}
        Some(RawVars::Map(map)) => {
            for (name, value) in map {
                entries.push(entry(name, value)?);
            }
        }
        Some(RawVars::List(items)) => {
            for item in items {
                entries.push(normalize_var(item)?);
            }
        }
    }

    Ok(VarList::new(entries))
}

fn normalize_var(raw: RawVar) -> Result<VariableEntry, ManifestError> {
    match raw {
        RawVar::Assignment(s) => {
            let (name, value) = s
                .split_once('=')
                .ok_or_else(|| ManifestError::InvalidAssignment(s.clone()))?;
            entry(name.to_string(), Value::String(value.to_string()))
        }
        RawVar::Pair(map) => {
            if map.len() != 1 {
                return Err(ManifestError::VarArity(map.len()));
            }
            let (name, value) = map
                .into_iter()
                .next()
                .ok_or(ManifestError::VarArity(0))?;
            entry(name, value)
        }
    }
}

fn entry(name: String, value: Value) -> Result<VariableEntry, ManifestError> {
    if !VariableEntry::is_valid_name(&name) {
        return Err(ManifestError::InvalidVarName(name));
    }

    let value = match value {
        Value::Null => None,
        Value::Bool(b) => Some(VarValue::Bool(b)),
        Value::String(s) => Some(VarValue::Str(s)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Some(VarValue::Int(i)),
            None => return Err(ManifestError::InvalidVarValue { name }),
        },
        Value::Array(_) | Value::Object(_) => return Err(ManifestError::InvalidVarValue { name }),
    };

    Ok(VariableEntry::new(name, value))
}

/// A tag before it gets its position
#[derive(Debug, Clone, PartialEq)]
pub struct TagDecl {
    pub name: String,
    pub vars: VarList,
}

pub fn normalize_tags(raw: Option<Vec<RawTag>>) -> Result<Vec<TagDecl>, ManifestError> {
    raw.unwrap_or_default()
        .into_iter()
        .map(normalize_tag)
        .collect()
}

fn normalize_tag(raw: RawTag) -> Result<TagDecl, ManifestError> {
    let (name, vars) = match raw {
        RawTag::Name(name) => (name, VarList::default()),
        RawTag::WithVars(map) => {
            if map.len() != 1 {
                return Err(ManifestError::TagArity(map.len()));
            }
            let (name, value) = map
                .into_iter()
                .next()
                .ok_or(ManifestError::TagArity(0))?;
            let vars = match value {
                Value::Null => VarList::default(),
                Value::Object(m) => normalize_vars(Some(RawVars::Map(m)))?,
                Value::Array(items) => {
                    let items: Vec<RawVar> = items
                        .into_iter()
                        .map(|item| match item {
                            Value::String(s) => Ok(RawVar::Assignment(s)),
                            Value::Object(m) => Ok(RawVar::Pair(m)),
                            _ => Err(ManifestError::InvalidVarValue { name: name.clone() }),
                        })
                        .collect::<Result<_, _>>()?;
                    normalize_vars(Some(RawVars::List(items)))?
                }
                _ => return Err(ManifestError::InvalidVarValue { name }),
            };
            (name, vars)
        }
    };

    if !Tag::is_valid_name(&name) {
        return Err(ManifestError::InvalidTagName(name));
    }

    Ok(TagDecl { name, vars })
}

/// Builds the effective tag list of a stack.
///
/// Project prefix, stack prefix, stack tags (or the project's when the stack
/// declares none), stack suffix, project suffix. Repeated names keep their
/// first occurrence. Positions start at 1.
pub fn compose_tags(
    project_prefix: &[TagDecl],
    project_tags: &[TagDecl],
    project_suffix: &[TagDecl],
    stack_prefix: &[TagDecl],
    stack_tags: &[TagDecl],
    stack_suffix: &[TagDecl],
) -> Vec<Tag> {
    let middle = if stack_tags.is_empty() {
        project_tags
    } else {
        stack_tags
    };

    let mut tags: Vec<Tag> = Vec::new();
    let all = project_prefix
        .iter()
        .chain(stack_prefix)
        .chain(middle)
        .chain(stack_suffix)
        .chain(project_suffix);

    for decl in all {
        if tags.iter().any(|t| t.name() == decl.name) {
            tracing::debug!("Skipping repeated tag '{}'", decl.name);
            continue;
        }
        tags.push(Tag::new(decl.name.clone(), tags.len() + 1, decl.vars.clone()));
    }

    tags
}

/// Lexical form of a stack path: `.` segments dropped, no root, no `..`.
///
/// Two declarations naming the same directory normalize to the same path.
pub fn normalize_stack_path(raw: &str) -> Result<PathBuf, ManifestError> {
    let invalid = || ManifestError::InvalidStackPath(raw.to_string());
    let mut path = PathBuf::new();

    for component in Path::new(raw.trim()).components() {
        match component {
            Component::Normal(part) => path.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(invalid())
            }
        }
    }

    if path.as_os_str().is_empty() {
        return Err(invalid());
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(yaml: &str) -> Result<VarList, ManifestError> {
        let raw: Option<RawVars> = serde_yaml::from_str(yaml).unwrap();
        normalize_vars(raw)
    }

    fn decl(name: &str) -> TagDecl {
        TagDecl {
            name: name.to_string(),
            vars: VarList::default(),
        }
    }

    #[test]
    fn vars_as_list_of_pairs_and_assignments() {
        let list = vars(
            r#"
- MYSQL_USER: admin
- MYSQL_BACKUP: true
- MYSQL_NODES: 3
- MYSQL_REPLICA: null
- "WELCOME=Is always=a string"
"#,
        )
        .unwrap();

        let entries = list.entries();
        assert_eq!(entries.len(), 5);
        assert_eq!(entries[0].value, Some(VarValue::Str("admin".into())));
        assert_eq!(entries[1].value, Some(VarValue::Bool(true)));
        assert_eq!(entries[2].value, Some(VarValue::Int(3)));
        assert_eq!(entries[3].value, None);
        assert_eq!(entries[4].name, "WELCOME");
        assert_eq!(entries[4].value, Some(VarValue::Str("Is always=a string".into())));
    }

    #[test]
    fn vars_as_map_keep_order() {
        let list = vars("zeta: 1\nalpha: 2\n").unwrap();
        let names: Vec<_> = list.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
    }

    #[test]
    fn vars_null_or_empty() {
        assert!(vars("~").unwrap().is_empty());
        assert!(vars("[]").unwrap().is_empty());
        assert!(vars("{}").unwrap().is_empty());
    }

    #[test]
    fn vars_reject_bad_input() {
        assert_eq!(
            vars("- {a: 1, b: 2}").unwrap_err(),
            ManifestError::VarArity(2)
        );
        assert!(matches!(
            vars("- 1bad: x").unwrap_err(),
            ManifestError::InvalidVarName(_)
        ));
        assert!(matches!(
            vars("- nested: {a: 1}").unwrap_err(),
            ManifestError::InvalidVarValue { .. }
        ));
        assert!(matches!(
            vars("- NOEQUALS").unwrap_err(),
            ManifestError::InvalidAssignment(_)
        ));
        assert!(matches!(
            vars("- ratio: 1.5").unwrap_err(),
            ManifestError::InvalidVarValue { .. }
        ));
    }

    #[test]
    fn tags_in_both_shapes() {
        let raw: Option<Vec<RawTag>> = serde_yaml::from_str(
            r#"
- traefik
- mysql:
    db_name: blog
- redis: ~
"#,
        )
        .unwrap();
        let tags = normalize_tags(raw).unwrap();

        assert_eq!(tags.len(), 3);
        assert_eq!(tags[0].name, "traefik");
        assert_eq!(tags[1].vars.entries()[0].name, "db_name");
        assert!(tags[2].vars.is_empty());
    }

    #[test]
    fn tags_reject_invalid_names() {
        let raw: Option<Vec<RawTag>> = serde_yaml::from_str("- ../escape").unwrap();
        assert!(matches!(
            normalize_tags(raw).unwrap_err(),
            ManifestError::InvalidTagName(_)
        ));
    }

    #[test]
    fn short_stack_forms() {
        let app = RawStack::Short("default:wordpress".into()).into_fields();
        assert_eq!(app.app.as_deref(), Some("default:wordpress"));
        assert!(app.path.is_none());

        let path = RawStack::Short("web".into()).into_fields();
        assert_eq!(path.path.as_deref(), Some("web"));
    }

    #[test]
    fn compose_tags_order_and_positions() {
        let tags = compose_tags(
            &[decl("pre")],
            &[decl("p1")],
            &[decl("post")],
            &[decl("spre")],
            &[decl("s1"), decl("s2")],
            &[decl("ssuf")],
        );
        let names: Vec<_> = tags.iter().map(|t| t.name()).collect();
        assert_eq!(names, vec!["pre", "spre", "s1", "s2", "ssuf", "post"]);
        let positions: Vec<_> = tags.iter().map(|t| t.position()).collect();
        assert_eq!(positions, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn compose_tags_falls_back_to_project_tags() {
        let tags = compose_tags(&[], &[decl("p1"), decl("p2")], &[], &[], &[], &[]);
        let names: Vec<_> = tags.iter().map(|t| t.name()).collect();
        assert_eq!(names, vec!["p1", "p2"]);
    }

    #[test]
    fn compose_tags_dedupes_keeping_first() {
        let tags = compose_tags(&[decl("a")], &[], &[decl("a")], &[], &[decl("b"), decl("a")], &[]);
        let names: Vec<_> = tags.iter().map(|t| t.name()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn stack_paths_are_normalized_lexically() {
        assert_eq!(normalize_stack_path("app").unwrap(), PathBuf::from("app"));
        assert_eq!(normalize_stack_path("./app/").unwrap(), PathBuf::from("app"));
        assert_eq!(
            normalize_stack_path("front/./web").unwrap(),
            PathBuf::from("front/web")
        );
    }

    #[test]
    fn stack_paths_must_stay_inside_project() {
        for raw in ["../outside", "/tmp/abs_stack", "app/../app", ".", ""] {
            assert_eq!(
                normalize_stack_path(raw),
                Err(ManifestError::InvalidStackPath(raw.to_string())),
                "{raw}"
            );
        }
    }
}
