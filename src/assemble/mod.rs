//! # Assemble Pipeline
//!
//! Produces `docker-compose.run.yml` for a stack from its base fragment and
//! its ordered tags.
//!
//! ```text
//! PLAN ──► VARS ──► MERGE ──► OVERRIDE* ──► WRITE ──► DONE
//!   │        │        │           │            │
//!   └────────┴────────┴───────────┴────────────┴──► FAILED
//! ```
//!
//! | Stage | Component | Fatal errors |
//! |-------|-----------|--------------|
//! | plan | [`TagResolver`] | missing base fragment |
//! | vars | [`VariableResolver`] | plugin failure, unreadable vars file |
//! | merge | [`ComposeAssembler::merge`] | engine failure |
//! | override | [`ComposeAssembler::apply_overrides`] | plugin failure |
//! | write | [`ComposeAssembler::write`] | I/O |
//!
//! Nothing is retried. A failure reports the stage it happened in through
//! [`StackFailure`].

mod compose;
mod error;
mod orchestrator;
mod tags;
mod vars;

pub use compose::{ComposeAssembler, ComposeEngine, DockerCompose, EngineError, EngineRequest};
pub use error::{AssembleError, StackFailure, Stage};
pub use orchestrator::{AssembleReport, PluginMetadata, StackOrchestrator};
pub use tags::TagResolver;
pub use vars::{convenience_vars, to_domain, VariableResolver, STACK_SEP};
