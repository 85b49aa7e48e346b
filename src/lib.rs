//! stackweave - layered docker compose stacks
//!
//! A stack's runnable `docker-compose.run.yml` is built from a base compose
//! file and an ordered list of tags. Each tag may contribute a compose
//! fragment and a jsonnet plugin that supplies variables or rewrites the
//! merged document.

pub mod domain;
pub mod storage;
pub mod plugin;
pub mod assemble;
pub mod cli;

pub use assemble::{AssembleError, AssembleReport, StackFailure, StackOrchestrator};
pub use domain::{Plan, PlanEntry, Stack, Tag, VariableEnvironment};
pub use storage::{Project, ProjectError};
