//! Project loading
//!
//! A project is a directory holding `stackweave.yml`. Loading parses the file,
//! normalizes every stack and rejects duplicate stack paths before any
//! resolution can run.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::lookup::find_in;
use super::manifest::{
    compose_tags, normalize_stack_path, normalize_tags, normalize_vars, ManifestError, RawProject,
    RawStack,
};
use crate::domain::{App, AppRef, Stack, StackError, VarList};

/// Project file names, in preference order
pub const PROJECT_FILE_NAMES: [&str; 2] = ["stackweave.yml", "stackweave.yaml"];

/// Private directory under the project root
pub const PRIVATE_DIR: &str = ".stackweave";

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("Not in a stackweave project: no stackweave.yml in {0} or its parents")]
    NotFound(PathBuf),

    #[error("Failed to read project file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse project file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid project file {path}: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: ManifestError,
    },

    #[error("Invalid stack #{index} in {path}: {source}")]
    InvalidStack {
        path: PathBuf,
        index: usize,
        #[source]
        source: StackError,
    },

    #[error("Duplicate stack path '{}' (stacks #{first} and #{second})", stack_path.display())]
    DuplicateStackPath {
        stack_path: PathBuf,
        first: usize,
        second: usize,
    },

    #[error("Stack not found: {0}")]
    StackNotFound(String),
}

/// A loaded project
#[derive(Debug, Clone)]
pub struct Project {
    root: PathBuf,
    config_file: PathBuf,
    namespace: String,
    vars: VarList,
    stacks: Vec<Stack>,
}

impl Project {
    /// Finds the project root by walking up from `start`
    pub fn find_root(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();

        loop {
            if find_in(&current, &PROJECT_FILE_NAMES).is_some() {
                return Some(current);
            }

            if !current.pop() {
                return None;
            }
        }
    }

    /// Loads the project enclosing `start`
    pub fn discover(start: &Path) -> Result<Self, ProjectError> {
        let root = Self::find_root(start).ok_or_else(|| ProjectError::NotFound(start.to_path_buf()))?;
        Self::load(root)
    }

    /// Loads the project rooted at `root`
    pub fn load(root: impl Into<PathBuf>) -> Result<Self, ProjectError> {
        let root = root.into();
        let config_file = find_in(&root, &PROJECT_FILE_NAMES)
            .ok_or_else(|| ProjectError::NotFound(root.clone()))?;

        let content = fs::read_to_string(&config_file).map_err(|source| ProjectError::Read {
            path: config_file.clone(),
            source,
        })?;

        Self::from_yaml(root, config_file, &content)
    }

    /// Builds a project from project file content
    pub fn from_yaml(
        root: PathBuf,
        config_file: PathBuf,
        content: &str,
    ) -> Result<Self, ProjectError> {
        let raw: Option<RawProject> =
            serde_yaml::from_str(content).map_err(|source| ProjectError::Parse {
                path: config_file.clone(),
                source,
            })?;
        let raw = raw.unwrap_or_default();

        let invalid = |source: ManifestError| ProjectError::Invalid {
            path: config_file.clone(),
            source,
        };

        let config = raw.config.unwrap_or_default();
        let namespace = config
            .namespace
            .filter(|ns| !ns.trim().is_empty())
            .unwrap_or_else(|| dir_name(&root));
        let vars = normalize_vars(config.vars).map_err(invalid)?;
        let tags_prefix = normalize_tags(config.tags_prefix).map_err(invalid)?;
        let tags = normalize_tags(config.tags).map_err(invalid)?;
        let tags_suffix = normalize_tags(config.tags_suffix).map_err(invalid)?;

        let collections_root = collections_dir(&root);
        let mut stacks = Vec::new();

        for (index, raw_stack) in raw.stacks.unwrap_or_default().into_iter().enumerate() {
            let fields = RawStack::into_fields(raw_stack);

            let app = fields
                .app
                .as_deref()
                .map(str::parse::<AppRef>)
                .transpose()
                .map_err(|source| ProjectError::InvalidStack {
                    path: config_file.clone(),
                    index,
                    source,
                })?
                .map(|reference| App::new(reference, &collections_root));

            let path = fields
                .path
                .clone()
                .or_else(|| fields.name.clone())
                .or_else(|| app.as_ref().map(|a| a.name().to_string()))
                .ok_or_else(|| invalid(ManifestError::AnonymousStack))?;
            let path = normalize_stack_path(&path).map_err(invalid)?;
            let name = fields.name.clone().unwrap_or_else(|| {
                path.to_string_lossy()
                    .replace(std::path::MAIN_SEPARATOR, "_")
                    .replace('/', "_")
            });

            let stack_tags = compose_tags(
                &tags_prefix,
                &tags,
                &tags_suffix,
                &normalize_tags(fields.tags_prefix).map_err(invalid)?,
                &normalize_tags(fields.tags).map_err(invalid)?,
                &normalize_tags(fields.tags_suffix).map_err(invalid)?,
            );

            let stack = Stack::new(name, path, &root)
                .with_app(app)
                .with_service(fields.service)
                .with_network(fields.network)
                .with_tags(stack_tags)
                .with_vars(normalize_vars(fields.vars).map_err(invalid)?);

            stacks.push(stack);
        }

        check_unique_paths(&stacks)?;

        tracing::debug!(
            "Loaded project '{}' from {} with {} stack(s)",
            namespace,
            config_file.display(),
            stacks.len()
        );

        Ok(Self {
            root,
            config_file,
            namespace,
            vars,
            stacks,
        })
    }

    /// Returns the project root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Project-level variable layer
    pub fn vars(&self) -> &VarList {
        &self.vars
    }

    pub fn stacks(&self) -> &[Stack] {
        &self.stacks
    }

    /// Looks a stack up by name or path
    pub fn stack(&self, key: &str) -> Result<&Stack, ProjectError> {
        self.stacks
            .iter()
            .find(|s| s.matches(key))
            .ok_or_else(|| ProjectError::StackNotFound(key.to_string()))
    }

    /// Returns the .stackweave directory path
    pub fn private_dir(&self) -> PathBuf {
        self.root.join(PRIVATE_DIR)
    }

    /// Returns the project plugins directory
    pub fn plugins_dir(&self) -> PathBuf {
        self.private_dir().join("plugins")
    }
}

/// Installed collections live under the private directory
fn collections_dir(root: &Path) -> PathBuf {
    root.join(PRIVATE_DIR).join("collections")
}

fn check_unique_paths(stacks: &[Stack]) -> Result<(), ProjectError> {
    for (index, stack) in stacks.iter().enumerate() {
        if let Some(first) = stacks[..index].iter().position(|s| s.path() == stack.path()) {
            return Err(ProjectError::DuplicateStackPath {
                stack_path: stack.path().to_path_buf(),
                first,
                second: index,
            });
        }
    }

    Ok(())
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "default".to_string())
}
