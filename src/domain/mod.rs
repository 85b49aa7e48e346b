//! Domain models for stackweave
//!
//! Stacks, tags, variables, plans and documents, without any I/O concerns.

mod document;
mod plan;
mod stack;
mod vars;

pub use document::{ComposeDocument, DocumentError};
pub use plan::{Plan, PlanEntry};
pub use stack::{App, AppRef, Stack, StackError, Tag, DEFAULT_COLLECTION, OUTPUT_FILE};
pub use vars::{
    fill_missing, interpolate, is_truthy, render_value, InterpolationError, UnresolvedVariable,
    VarList, VarMap, VarValue, VariableEntry, VariableEnvironment,
};
