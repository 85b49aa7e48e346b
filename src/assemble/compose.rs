//! Document assembly
//!
//! The compose engine merges the fragment files; plugin-only tags then
//! rewrite the merged document one after another, in plan order.

use std::path::PathBuf;
use std::process::Command;

use thiserror::Error;
use tracing::{debug, info};

use super::error::AssembleError;
use crate::domain::{ComposeDocument, Plan, PlanEntry, Stack, VarMap, VariableEnvironment};
use crate::plugin::PluginRunner;
use crate::storage::{write_atomic, Project, WrittenArtifact};

/// Everything the engine needs to merge one stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineRequest {
    pub project_name: String,

    /// Project root; relative paths in fragments resolve against it
    pub project_dir: PathBuf,
    pub fragments: Vec<PathBuf>,
    pub env: Vec<(String, String)>,
}

/// Diagnostic text of a failed merge
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{diagnostic}")]
pub struct EngineError {
    pub diagnostic: String,
}

/// Merges fragment files into one document text
pub trait ComposeEngine: Send + Sync {
    fn assemble(&self, request: &EngineRequest) -> Result<String, EngineError>;
}

/// `docker compose ... config`
#[derive(Debug, Clone)]
pub struct DockerCompose {
    command: Vec<String>,
}

impl DockerCompose {
    /// `command` is the program followed by its leading arguments
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }

    fn command(&self, request: &EngineRequest) -> Result<Command, EngineError> {
        let (program, args) = self.command.split_first().ok_or_else(|| EngineError {
            diagnostic: "Compose command is empty".to_string(),
        })?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .arg("--project-name")
            .arg(&request.project_name)
            .arg("--project-directory")
            .arg(&request.project_dir);
        for fragment in &request.fragments {
            cmd.arg("-f").arg(fragment);
        }
        cmd.arg("config");
        cmd.envs(request.env.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        Ok(cmd)
    }
}

impl Default for DockerCompose {
    fn default() -> Self {
        Self::new(vec!["docker".to_string(), "compose".to_string()])
    }
}

impl ComposeEngine for DockerCompose {
    fn assemble(&self, request: &EngineRequest) -> Result<String, EngineError> {
        let output = self.command(request)?.output().map_err(|e| EngineError {
            diagnostic: format!("Failed to run {}: {}", self.command.join(" "), e),
        })?;

        if !output.status.success() {
            return Err(EngineError {
                diagnostic: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        String::from_utf8(output.stdout).map_err(|e| EngineError {
            diagnostic: format!("Compose output is not UTF-8: {}", e),
        })
    }
}

/// Produces and persists the final document of a stack
pub struct ComposeAssembler<'a> {
    plugins: &'a PluginRunner,
    engine: &'a dyn ComposeEngine,
}

impl<'a> ComposeAssembler<'a> {
    pub fn new(plugins: &'a PluginRunner, engine: &'a dyn ComposeEngine) -> Self {
        Self { plugins, engine }
    }

    /// Runs the engine over every fragment of the plan
    pub fn merge(
        &self,
        project: &Project,
        stack: &Stack,
        plan: &Plan,
        env: &VariableEnvironment,
    ) -> Result<ComposeDocument, AssembleError> {
        let request = EngineRequest {
            project_name: format!("{}_{}", project.namespace(), stack.name()),
            project_dir: project.root().to_path_buf(),
            fragments: plan.fragments(),
            env: env.to_process_env(),
        };
        debug!(
            "Merging {} fragment(s) as '{}'",
            request.fragments.len(),
            request.project_name
        );

        let failed = |diagnostic: String| AssembleError::ComposeEngineFailed {
            fragments: request.fragments.clone(),
            diagnostic,
        };

        let text = self
            .engine
            .assemble(&request)
            .map_err(|e| failed(e.diagnostic))?;

        ComposeDocument::from_yaml(&text)
            .map_err(|e| failed(format!("Unreadable engine output: {}", e)))
    }

    /// Folds every plugin-only entry over `document`, in plan order
    pub fn apply_overrides(
        &self,
        plan: &Plan,
        env: &VariableEnvironment,
        mut document: ComposeDocument,
    ) -> Result<ComposeDocument, AssembleError> {
        for entry in plan.overrides() {
            let Some(plugin) = entry.plugin.as_deref() else {
                continue;
            };
            info!("Applying docker_override from tag '{}'", entry.label());
            document = self
                .plugins
                .docker_override(plugin, &override_vars(entry, env), &document)?;
        }
        Ok(document)
    }

    /// Serializes `document` to the stack's output file
    pub fn write(
        &self,
        stack: &Stack,
        document: &ComposeDocument,
    ) -> Result<WrittenArtifact, AssembleError> {
        let path = stack.output_path();
        let yaml = document.to_yaml().map_err(|e| AssembleError::InvalidYaml {
            path: path.clone(),
            message: e.to_string(),
        })?;

        write_atomic(&path, &yaml).map_err(|source| AssembleError::Io { path, source })
    }

    /// Merge, override and write in one call
    pub fn assemble(
        &self,
        project: &Project,
        stack: &Stack,
        plan: &Plan,
        env: &VariableEnvironment,
    ) -> Result<WrittenArtifact, AssembleError> {
        let merged = self.merge(project, stack, plan, env)?;
        let document = self.apply_overrides(plan, env, merged)?;
        self.write(stack, &document)
    }
}

/// The tag's own variables merged over the environment, uninterpolated
fn override_vars(entry: &PlanEntry, env: &VariableEnvironment) -> VarMap {
    let mut vars = env.vars().clone();
    if let Some(tag) = &entry.tag {
        for (key, value) in tag.vars().to_map() {
            if value.is_null() {
                vars.shift_remove(&key);
            } else {
                vars.insert(key, value);
            }
        }
    }
    vars
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Tag, VarList, VarValue, VariableEntry};
    use serde_json::json;
    use std::path::Path;

    #[test]
    fn docker_compose_command_line() {
        let engine = DockerCompose::default();
        let request = EngineRequest {
            project_name: "prod_web".into(),
            project_dir: PathBuf::from("/prj"),
            fragments: vec![PathBuf::from("a.yml"), PathBuf::from("b.yml")],
            env: vec![("PORT".into(), "80".into())],
        };

        let cmd = engine.command(&request).unwrap();
        assert_eq!(cmd.get_program(), "docker");
        let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(
            args,
            vec![
                "compose",
                "--project-name",
                "prod_web",
                "--project-directory",
                "/prj",
                "-f",
                "a.yml",
                "-f",
                "b.yml",
                "config"
            ]
        );
        let envs: Vec<_> = cmd.get_envs().collect();
        assert_eq!(envs.len(), 1);
    }

    #[test]
    fn empty_command_is_an_engine_error() {
        let engine = DockerCompose::new(Vec::new());
        let request = EngineRequest {
            project_name: "p".into(),
            project_dir: PathBuf::from("."),
            fragments: vec![],
            env: vec![],
        };
        assert!(engine.assemble(&request).is_err());
    }

    #[test]
    fn override_vars_layer_tag_vars() {
        let tag = Tag::new(
            "proxy",
            1,
            VarList::new(vec![
                VariableEntry::new("HOST", Some(VarValue::Str("$domain".into()))),
                VariableEntry::new("GONE", None),
            ]),
        );
        let entry = PlanEntry::for_tag(tag, None, Some(Path::new("proxy.jsonnet").into()));
        let env = VariableEnvironment::new(
            json!({"HOST": "a", "GONE": "b", "KEEP": 1}).as_object().cloned().unwrap(),
            vec![],
        );

        let vars = override_vars(&entry, &env);
        assert_eq!(vars["HOST"], json!("$domain"));
        assert_eq!(vars["KEEP"], json!(1));
        assert!(!vars.contains_key("GONE"));
    }
}
