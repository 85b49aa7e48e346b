//! Main CLI application structure

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use super::output::{Output, OutputFormat};
use super::stack_cmd;
use crate::assemble::{DockerCompose, StackOrchestrator};
use crate::plugin::{JsonnetInterpreter, PluginRunner};
use crate::storage::{Project, ToolConfig};

#[derive(Parser)]
#[command(name = "stackweave")]
#[command(author, version, about = "Layered docker compose stacks with tags and plugins")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Project directory (defaults to the enclosing project of the current directory)
    #[arg(long, short = 'p', global = true)]
    pub project: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// User configuration file
    #[arg(long, global = true, env = "STACKWEAVE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Jsonnet interpreter binary
    #[arg(long, global = true, env = "STACKWEAVE_JSONNET")]
    pub jsonnet: Option<String>,

    /// Compose engine command (e.g. "docker compose")
    #[arg(long, global = true, env = "STACKWEAVE_COMPOSE")]
    pub compose: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the overlay plan of stacks
    Plan {
        /// Stack name or path (all stacks if omitted)
        stack: Option<String>,

        /// Also query every plugin for its metadata
        #[arg(long)]
        metadata: bool,
    },

    /// Show the resolved variables of stacks
    Vars {
        /// Stack name or path (all stacks if omitted)
        stack: Option<String>,
    },

    /// Build docker-compose.run.yml for stacks
    Assemble {
        /// Stack names or paths (all stacks if omitted)
        stacks: Vec<String>,
    },
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let output = Output::new(cli.format);

    let config = load_config(cli.config.as_deref())?
        .with_overrides(cli.jsonnet, cli.compose)
        .context("Invalid tool configuration")?;
    tracing::debug!("Tool configuration: {:?}", config);

    let project = open_project(cli.project.as_deref())?;
    let orchestrator = orchestrator(&config);

    match cli.command {
        Commands::Plan { stack, metadata } => {
            let stacks = select(&project, stack.as_slice())?;
            stack_cmd::plan(&output, &orchestrator, &project, &stacks, metadata)?
        }
        Commands::Vars { stack } => {
            let stacks = select(&project, stack.as_slice())?;
            stack_cmd::vars(&output, &orchestrator, &project, &stacks)?
        }
        Commands::Assemble { stacks } => {
            let stacks = select(&project, &stacks)?;
            stack_cmd::assemble(&output, &orchestrator, &project, &stacks)?
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // Ignored when a subscriber is already installed
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_config(path: Option<&Path>) -> Result<ToolConfig> {
    let config = match path {
        Some(path) => ToolConfig::load_from(path),
        None => ToolConfig::load(),
    };
    config.context("Failed to load configuration")
}

fn open_project(dir: Option<&Path>) -> Result<Project> {
    let start = match dir {
        Some(dir) => dir.to_path_buf(),
        None => std::env::current_dir().context("Failed to read current directory")?,
    };
    let project = Project::discover(&start)?;
    tracing::debug!("Opened project at {}", project.root().display());
    Ok(project)
}

fn orchestrator(config: &ToolConfig) -> StackOrchestrator {
    let interpreter = config
        .jsonnet_paths
        .iter()
        .fold(JsonnetInterpreter::new(&config.jsonnet_bin), |interpreter, path| {
            interpreter.with_lib_path(path)
        });

    StackOrchestrator::new(
        PluginRunner::new(interpreter),
        DockerCompose::new(config.compose_command.clone()),
    )
}

/// Stacks named by `keys`, or every stack when empty
fn select<'p>(project: &'p Project, keys: &[String]) -> Result<Vec<&'p crate::domain::Stack>> {
    if keys.is_empty() {
        return Ok(project.stacks().iter().collect());
    }
    keys.iter()
        .map(|key| project.stack(key).map_err(anyhow::Error::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_assemble_with_stacks() {
        let cli = Cli::try_parse_from(["stackweave", "-f", "json", "assemble", "web", "db"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        match cli.command {
            Commands::Assemble { stacks } => assert_eq!(stacks, vec!["web", "db"]),
            _ => panic!("expected assemble"),
        }
    }

    #[test]
    fn parse_plan_flags() {
        let cli = Cli::try_parse_from(["stackweave", "plan", "--metadata", "-p", "/srv"]).unwrap();
        assert_eq!(cli.project, Some(PathBuf::from("/srv")));
        assert!(matches!(
            cli.command,
            Commands::Plan {
                stack: None,
                metadata: true
            }
        ));
    }
}
