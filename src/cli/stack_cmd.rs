//! Stack commands (plan, vars, assemble)

use anyhow::{bail, Context, Result};
use serde_json::json;

use super::output::Output;
use crate::assemble::StackOrchestrator;
use crate::domain::{render_value, Stack};
use crate::storage::Project;

/// Show the overlay plan of each stack
pub fn plan(
    output: &Output,
    orchestrator: &StackOrchestrator,
    project: &Project,
    stacks: &[&Stack],
    with_metadata: bool,
) -> Result<()> {
    let mut items = Vec::new();

    for stack in stacks {
        let plan = orchestrator.plan(project, stack)?;
        let metadata = if with_metadata {
            orchestrator
                .metadata(&plan)
                .with_context(|| format!("Failed to read plugin metadata of '{}'", stack.name()))?
        } else {
            Vec::new()
        };

        if output.is_json() {
            items.push(json!({
                "stack": stack.name(),
                "path": stack.path(),
                "entries": plan,
                "metadata": metadata,
            }));
            continue;
        }

        output.line(&format!("Stack {} ({} entries):", stack.name(), plan.len()));
        output.line(&format!("{:<4} {:<16} {:<40} PLUGIN", "#", "TAG", "FRAGMENT"));
        output.line(&"-".repeat(80));
        for (index, entry) in plan.entries().iter().enumerate() {
            let fragment = entry
                .fragment
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "-".to_string());
            let plugin = entry
                .plugin
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "-".to_string());
            output.line(&format!(
                "{:<4} {:<16} {:<40} {}",
                index,
                entry.label(),
                fragment,
                plugin
            ));
        }

        for item in &metadata {
            output.row(&[
                "metadata",
                &item.tag,
                &serde_json::Value::Object(item.metadata.clone()).to_string(),
            ]);
        }
        output.blank();
    }

    output.report(&items)?;

    Ok(())
}

/// Show the resolved variables of each stack
pub fn vars(
    output: &Output,
    orchestrator: &StackOrchestrator,
    project: &Project,
    stacks: &[&Stack],
) -> Result<()> {
    let mut items = Vec::new();

    for stack in stacks {
        let env = orchestrator.resolve_vars(project, stack)?;

        if output.is_json() {
            items.push(json!({
                "stack": stack.name(),
                "vars": env.vars(),
                "warnings": env.warnings(),
            }));
            continue;
        }

        output.line(&format!("# {}", stack.name()));
        for (key, value) in env.vars() {
            output.line(&format!("{}={}", key, render_value(value)));
        }
        output.blank();
    }

    output.report(&items)?;

    Ok(())
}

/// Assemble each stack, reporting every failure before giving up
pub fn assemble(
    output: &Output,
    orchestrator: &StackOrchestrator,
    project: &Project,
    stacks: &[&Stack],
) -> Result<()> {
    let results = orchestrator.assemble_all(project, stacks.iter().copied());
    let total = results.len();
    let mut failed = 0;
    let mut items = Vec::new();

    for result in results {
        match result {
            Ok(report) => {
                if output.is_json() {
                    items.push(json!({
                        "stack": report.stack,
                        "success": true,
                        "output": report.output,
                        "digest": report.digest,
                        "fragments": report.fragments,
                        "overrides": report.overrides,
                        "warnings": report.environment.warnings(),
                    }));
                } else {
                    output.line(&format!(
                        "Assembled {} -> {} ({})",
                        report.stack,
                        report.output.display(),
                        &report.digest[..12]
                    ));
                }
            }
            Err(failure) => {
                failed += 1;
                if output.is_json() {
                    items.push(json!({
                        "stack": failure.stack,
                        "success": false,
                        "stage": failure.stage,
                        "error": failure.error.to_string(),
                    }));
                } else {
                    output.failure(&failure.to_string());
                }
            }
        }
    }

    output.report(&items)?;

    if failed > 0 {
        bail!("{} of {} stack(s) failed to assemble", failed, total);
    }

    Ok(())
}
