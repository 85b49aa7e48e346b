//! Stacks, tags and app references
//!
//! These are the canonical, already-normalized forms. Every accepted
//! configuration shape is converted into them by the project loader.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

use super::vars::VarList;

/// Default collection used when an app reference has no `collection:` prefix
pub const DEFAULT_COLLECTION: &str = "default";

#[derive(Debug, Error, PartialEq)]
pub enum StackError {
    #[error("Invalid app reference: expected '[collection:]app', got '{0}'")]
    InvalidAppRef(String),

    #[error("Invalid tag name: '{0}'")]
    InvalidTagName(String),
}

/// A named overlay with its position in the stack's tag list (1-based)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag {
    name: String,
    position: usize,
    #[serde(skip)]
    vars: VarList,
}

impl Tag {
    pub fn new(name: impl Into<String>, position: usize, vars: VarList) -> Self {
        Self {
            name: name.into(),
            position,
            vars,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Variables attached to this tag in the project file
    pub fn vars(&self) -> &VarList {
        &self.vars
    }

    /// Tag names become file names, so path separators and dots are rejected
    pub fn is_valid_name(name: &str) -> bool {
        !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Reference to an app template inside an installed collection
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct AppRef {
    pub collection: String,
    pub name: String,
}

impl fmt::Display for AppRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.collection, self.name)
    }
}

impl FromStr for AppRef {
    type Err = StackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (collection, name) = match s.split_once(':') {
            Some((c, n)) => (c.trim(), n.trim()),
            None => (DEFAULT_COLLECTION, s),
        };

        let valid = |part: &str| !part.is_empty() && !part.contains(['/', '\\']) && part != "..";
        if !valid(collection) || !valid(name) {
            return Err(StackError::InvalidAppRef(s.to_string()));
        }

        Ok(Self {
            collection: collection.to_string(),
            name: name.to_string(),
        })
    }
}

/// An app resolved against the project's collection directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct App {
    reference: AppRef,
    collection_dir: PathBuf,
}

impl App {
    pub fn new(reference: AppRef, collections_root: &Path) -> Self {
        let collection_dir = collections_root.join(&reference.collection);
        Self {
            reference,
            collection_dir,
        }
    }

    pub fn reference(&self) -> &AppRef {
        &self.reference
    }

    pub fn name(&self) -> &str {
        &self.reference.name
    }

    /// `<collections>/<collection>`
    pub fn collection_dir(&self) -> &Path {
        &self.collection_dir
    }

    /// `<collections>/<collection>/<app>`
    pub fn dir(&self) -> PathBuf {
        self.collection_dir.join(&self.reference.name)
    }

    /// Plugins shipped with the collection
    pub fn tags_dir(&self) -> PathBuf {
        self.collection_dir.join(".stackweave").join("plugins")
    }
}

/// A deployable stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stack {
    name: String,
    path: PathBuf,
    dir: PathBuf,
    app: Option<App>,
    service: Option<String>,
    network: Option<String>,
    tags: Vec<Tag>,
    #[serde(skip)]
    vars: VarList,
}

/// Output file written by a successful assemble
pub const OUTPUT_FILE: &str = "docker-compose.run.yml";

impl Stack {
    /// Creates a stack rooted at `project_root/path`
    pub fn new(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        project_root: &Path,
    ) -> Self {
        let path = path.into();
        Self {
            name: name.into(),
            dir: project_root.join(&path),
            path,
            app: None,
            service: None,
            network: None,
            tags: Vec::new(),
            vars: VarList::default(),
        }
    }

    pub fn with_app(mut self, app: Option<App>) -> Self {
        self.app = app;
        self
    }

    pub fn with_service(mut self, service: Option<String>) -> Self {
        self.service = service;
        self
    }

    pub fn with_network(mut self, network: Option<String>) -> Self {
        self.network = network;
        self
    }

    pub fn with_tags(mut self, tags: Vec<Tag>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_vars(mut self, vars: VarList) -> Self {
        self.vars = vars;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path relative to the project root; unique within a project
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Absolute stack directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn app(&self) -> Option<&App> {
        self.app.as_ref()
    }

    pub fn service(&self) -> Option<&str> {
        self.service.as_deref()
    }

    pub fn network(&self) -> Option<&str> {
        self.network.as_deref()
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn vars(&self) -> &VarList {
        &self.vars
    }

    pub fn output_path(&self) -> PathBuf {
        self.dir.join(OUTPUT_FILE)
    }

    /// Returns true if `key` is this stack's name or path
    pub fn matches(&self, key: &str) -> bool {
        self.name == key || self.path == Path::new(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_app_ref_with_collection() {
        let app: AppRef = "community:wordpress".parse().unwrap();
        assert_eq!(app.collection, "community");
        assert_eq!(app.name, "wordpress");
        assert_eq!(app.to_string(), "community:wordpress");
    }

    #[test]
    fn parse_app_ref_default_collection() {
        let app: AppRef = "traefik".parse().unwrap();
        assert_eq!(app.collection, DEFAULT_COLLECTION);
        assert_eq!(app.name, "traefik");
    }

    #[test]
    fn parse_app_ref_rejects_bad_input() {
        assert!("".parse::<AppRef>().is_err());
        assert!(":app".parse::<AppRef>().is_err());
        assert!("col:".parse::<AppRef>().is_err());
        assert!("col:../etc".parse::<AppRef>().is_err());
    }

    #[test]
    fn app_directories() {
        let app = App::new("c:web".parse().unwrap(), Path::new("/prj/.stackweave/collections"));
        assert_eq!(app.dir(), PathBuf::from("/prj/.stackweave/collections/c/web"));
        assert_eq!(
            app.tags_dir(),
            PathBuf::from("/prj/.stackweave/collections/c/.stackweave/plugins")
        );
    }

    #[test]
    fn stack_paths() {
        let stack = Stack::new("front_web", "front/web", Path::new("/prj"));
        assert_eq!(stack.dir(), Path::new("/prj/front/web"));
        assert_eq!(stack.output_path(), PathBuf::from("/prj/front/web/docker-compose.run.yml"));
        assert!(stack.matches("front_web"));
        assert!(stack.matches("front/web"));
        assert!(!stack.matches("web"));
    }

    #[test]
    fn tag_names() {
        assert!(Tag::is_valid_name("traefik-svc"));
        assert!(Tag::is_valid_name("db_2"));
        assert!(!Tag::is_valid_name("a/b"));
        assert!(!Tag::is_valid_name("a.b"));
        assert!(!Tag::is_valid_name(""));
    }
}
