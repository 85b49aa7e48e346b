//! # Plugin System
//!
//! Tags may ship a transform plugin (`<tag>.jsonnet`) that supplies default
//! variables, fills missing ones, or rewrites the merged compose document.
//!
//! ## Protocol
//!
//! ```text
//! stackweave                       Interpreter
//!  │                                   │
//!  ├── evaluate tag.jsonnet            │
//!  │     --ext-str action="vars_default"
//!  │     --ext-str user_data={...}     │
//!  │                                   │
//!  └── stdout: {"vars_default": {...}} │
//! ```
//!
//! | Action | Payload | Result |
//! |--------|---------|--------|
//! | `metadata` | none | plugin description |
//! | `vars_default` | `user_data` | variables, merged fill-only |
//! | `vars_override` | `user_data` | variables, merged fill-only |
//! | `docker_override` | `user_data`, `docker_file` | replacement document |
//!
//! Any interpreter failure or malformed answer is fatal for the stack being
//! assembled and is never retried.
//!
//! ## Key Types
//!
//! - [`PluginRunner`] - Speaks the protocol
//! - [`Interpreter`] - Evaluation backend seam
//! - [`JsonnetInterpreter`] - Runs the `jsonnet` binary

mod protocol;
mod runner;

pub use protocol::{
    parse_response, PluginAction, PluginRequest, ProtocolError, DOCKER_FILE, USER_DATA,
};
pub use runner::{Interpreter, InterpreterError, JsonnetInterpreter, PluginError, PluginRunner};
