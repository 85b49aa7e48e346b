//! # Command-Line Interface
//!
//! User-facing commands and output formatting.
//!
//! ## Commands
//!
//! | Command | Purpose |
//! |---------|---------|
//! | `plan [STACK] [--metadata]` | Show base fragment, tag fragments and plugins |
//! | `vars [STACK]` | Show the resolved variable environment |
//! | `assemble [STACK...]` | Write `docker-compose.run.yml` |
//!
//! Without a stack argument every stack of the project is processed.
//!
//! ## Output Formats
//!
//! All commands support `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! ## Logging
//!
//! Logs go to stderr. `--verbose` (or `-v`) enables debug logs and
//! `RUST_LOG` overrides the filter entirely:
//! ```bash
//! RUST_LOG=stackweave=info stackweave assemble
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod output;
mod stack_cmd;

pub use app::{run, Cli, Commands};
pub use output::{Output, OutputFormat};
