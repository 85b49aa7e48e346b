//! Variable resolution
//!
//! Builds the environment of one stack in six ordered passes:
//!
//! 1. convenience variables derived from identity and paths
//! 2. `vars_default` plugin results, fill-only
//! 3. static `vars.yml` files, app directory then stack directory, overwrite
//! 4. project variables, interpolated, overwrite
//! 5. stack variables, interpolated, overwrite
//! 6. `vars_override` plugin results, fill-only
//!
//! A plugin failure aborts resolution; no partial environment is returned.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use super::error::AssembleError;
use crate::domain::{
    fill_missing, ComposeDocument, Plan, Stack, VarMap, VariableEnvironment,
};
use crate::plugin::PluginRunner;
use crate::storage::lookup::{find_all, VARS_FILE_NAMES};
use crate::storage::Project;

/// Separator used to build compound names
pub const STACK_SEP: &str = "_";

/// Fallback for the default service and network names
const DEFAULT_NAME: &str = "default";

pub struct VariableResolver<'a> {
    plugins: &'a PluginRunner,
}

impl<'a> VariableResolver<'a> {
    pub fn new(plugins: &'a PluginRunner) -> Self {
        Self { plugins }
    }

    pub fn resolve(
        &self,
        project: &Project,
        stack: &Stack,
        plan: &Plan,
    ) -> Result<VariableEnvironment, AssembleError> {
        let mut vars = convenience_vars(project, stack, plan)?;
        let mut warnings = Vec::new();

        for plugin in plan.plugins() {
            let defaults = self.plugins.vars_default(plugin, &vars)?;
            let filled = fill_missing(&mut vars, defaults);
            debug!("vars_default from {}: filled {:?}", plugin.display(), filled);
        }

        for file in static_vars_files(stack) {
            let layer = read_vars_file(&file)?;
            debug!("Static vars from {}: {} key(s)", file.display(), layer.len());
            overwrite(&mut vars, layer);
        }

        project.vars().apply(&mut vars, &mut warnings);
        stack.vars().apply(&mut vars, &mut warnings);

        for plugin in plan.plugins() {
            let overrides = self.plugins.vars_override(plugin, &vars)?;
            let filled = fill_missing(&mut vars, overrides);
            debug!("vars_override from {}: filled {:?}", plugin.display(), filled);
        }

        Ok(VariableEnvironment::new(vars, warnings))
    }
}

/// Seeds the mapping from project and stack identity
pub fn convenience_vars(
    project: &Project,
    stack: &Stack,
    plan: &Plan,
) -> Result<VarMap, AssembleError> {
    let base = match plan.base_fragment() {
        Some(path) => Some(read_document(path)?),
        None => None,
    };
    let sniff = |section: &str| {
        base.as_ref()
            .and_then(|doc| doc.first_key(section))
            .unwrap_or(DEFAULT_NAME)
            .to_string()
    };

    let network = stack.network().map(str::to_string).unwrap_or_else(|| sniff("networks"));
    let service = stack.service().map(str::to_string).unwrap_or_else(|| sniff("services"));

    let mut vars = VarMap::new();
    let mut set = |key: &str, value: String| {
        vars.insert(key.to_string(), Value::String(value));
    };

    set("stack_sep", STACK_SEP.to_string());
    set("prj_path", display(project.root()));
    set("prj_namespace", project.namespace().to_string());
    set("prj_domain", to_domain(project.namespace()));
    set("stack_name", stack.name().to_string());
    set("stack_network", network);
    set("stack_service", service);
    set("stack_path", display(stack.dir()));

    if let Some(app) = stack.app() {
        set("stack_app_path", display(&app.dir()));
        set("stack_collection_app_path", display(app.collection_dir()));
    }

    Ok(vars)
}

/// Lowercases and replaces everything outside `[a-z0-9.-]` with `-`
pub fn to_domain(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect()
}

fn static_vars_files(stack: &Stack) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Some(app) = stack.app() {
        dirs.push(app.dir());
    }
    dirs.push(stack.dir().to_path_buf());
    find_all(&dirs, &VARS_FILE_NAMES)
}

fn read_vars_file(path: &Path) -> Result<VarMap, AssembleError> {
    let content = fs::read_to_string(path).map_err(|source| AssembleError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let layer: Option<VarMap> =
        serde_yaml::from_str(&content).map_err(|e| AssembleError::InvalidYaml {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    Ok(layer.unwrap_or_default())
}

pub(crate) fn read_document(path: &Path) -> Result<ComposeDocument, AssembleError> {
    let content = fs::read_to_string(path).map_err(|source| AssembleError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    ComposeDocument::from_yaml(&content).map_err(|e| AssembleError::InvalidYaml {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Writes every key; `null` removes it
fn overwrite(target: &mut VarMap, layer: VarMap) {
    for (key, value) in layer {
        if value.is_null() {
            target.shift_remove(&key);
        } else {
            target.insert(key, value);
        }
    }
}

fn display(path: &Path) -> String {
    path.display().to_string()
}
