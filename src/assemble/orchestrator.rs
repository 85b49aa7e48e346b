//! Per-stack pipeline sequencing

use std::path::PathBuf;

use serde::Serialize;
use tracing::{info, warn};

use super::compose::{ComposeAssembler, ComposeEngine};
use super::error::{AssembleError, StackFailure, Stage};
use super::tags::TagResolver;
use super::vars::VariableResolver;
use crate::domain::{Plan, Stack, VarMap, VariableEnvironment};
use crate::plugin::PluginRunner;
use crate::storage::Project;

/// Outcome of a successful assemble
#[derive(Debug, Clone, Serialize)]
pub struct AssembleReport {
    pub stack: String,
    pub output: PathBuf,

    /// blake3 digest of the written document
    pub digest: String,

    pub fragments: Vec<PathBuf>,

    /// Tags whose plugin rewrote the merged document
    pub overrides: Vec<String>,

    pub environment: VariableEnvironment,
}

/// Plugin self-description for one plan entry
#[derive(Debug, Clone, Serialize)]
pub struct PluginMetadata {
    pub tag: String,
    pub plugin: PathBuf,
    pub metadata: VarMap,
}

/// Runs `PLAN -> VARS -> MERGE -> OVERRIDE -> WRITE` for stacks of a project
pub struct StackOrchestrator {
    plugins: PluginRunner,
    engine: Box<dyn ComposeEngine>,
}

impl StackOrchestrator {
    pub fn new(plugins: PluginRunner, engine: impl ComposeEngine + 'static) -> Self {
        Self {
            plugins,
            engine: Box::new(engine),
        }
    }

    pub fn plan(&self, project: &Project, stack: &Stack) -> Result<Plan, StackFailure> {
        TagResolver::new(project)
            .resolve(stack)
            .map_err(|e| failure(stack, Stage::Plan, e))
    }

    /// Plugin metadata of every plan entry that has a plugin
    pub fn metadata(&self, plan: &Plan) -> Result<Vec<PluginMetadata>, AssembleError> {
        plan.entries()
            .iter()
            .filter_map(|entry| entry.plugin.as_ref().map(|plugin| (entry, plugin)))
            .map(|(entry, plugin)| -> Result<PluginMetadata, AssembleError> {
                Ok(PluginMetadata {
                    tag: entry.label().to_string(),
                    plugin: plugin.clone(),
                    metadata: self.plugins.metadata(plugin)?,
                })
            })
            .collect()
    }

    /// Runs the plan and variable stages only
    pub fn resolve_vars(
        &self,
        project: &Project,
        stack: &Stack,
    ) -> Result<VariableEnvironment, StackFailure> {
        let plan = self.plan(project, stack)?;
        self.vars(project, stack, &plan)
    }

    fn vars(
        &self,
        project: &Project,
        stack: &Stack,
        plan: &Plan,
    ) -> Result<VariableEnvironment, StackFailure> {
        let env = VariableResolver::new(&self.plugins)
            .resolve(project, stack, plan)
            .map_err(|e| failure(stack, Stage::Vars, e))?;

        for warning in env.warnings() {
            warn!("Stack '{}': unresolved variable {}", stack.name(), warning);
        }

        Ok(env)
    }

    /// Assembles one stack and writes its output file
    pub fn assemble(&self, project: &Project, stack: &Stack) -> Result<AssembleReport, StackFailure> {
        info!("Stack '{}': {}", stack.name(), Stage::Plan);
        let plan = self.plan(project, stack)?;

        info!("Stack '{}': {} ({} entries)", stack.name(), Stage::Vars, plan.len());
        let env = self.vars(project, stack, &plan)?;

        let assembler = ComposeAssembler::new(&self.plugins, self.engine.as_ref());

        info!("Stack '{}': {}", stack.name(), Stage::Merge);
        let merged = assembler
            .merge(project, stack, &plan, &env)
            .map_err(|e| failure(stack, Stage::Merge, e))?;

        info!("Stack '{}': {}", stack.name(), Stage::Override);
        let document = assembler
            .apply_overrides(&plan, &env, merged)
            .map_err(|e| failure(stack, Stage::Override, e))?;

        info!("Stack '{}': {}", stack.name(), Stage::Write);
        let written = assembler
            .write(stack, &document)
            .map_err(|e| failure(stack, Stage::Write, e))?;

        info!(
            "Stack '{}': {} -> {}",
            stack.name(),
            Stage::Done,
            written.path.display()
        );

        Ok(AssembleReport {
            stack: stack.name().to_string(),
            output: written.path,
            digest: written.digest,
            fragments: plan.fragments(),
            overrides: plan.overrides().map(|e| e.label().to_string()).collect(),
            environment: env,
        })
    }

    /// Assembles every stack independently. One failure never stops the others.
    pub fn assemble_all<'s>(
        &self,
        project: &Project,
        stacks: impl IntoIterator<Item = &'s Stack>,
    ) -> Vec<Result<AssembleReport, StackFailure>> {
        stacks
            .into_iter()
            .map(|stack| self.assemble(project, stack))
            .collect()
    }
}

fn failure(stack: &Stack, stage: Stage, error: AssembleError) -> StackFailure {
    StackFailure {
        stack: stack.name().to_string(),
        stage,
        error,
    }
}
