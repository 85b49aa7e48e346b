//! # Storage Layer
//!
//! Everything stackweave reads from or writes to disk.
//!
//! ## Files
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Project | YAML | `stackweave.yml` |
//! | Project plugins | Jsonnet | `.stackweave/plugins/<tag>.jsonnet` |
//! | Collections | Directories | `.stackweave/collections/<collection>/<app>/` |
//! | Static vars | YAML | `<app or stack>/vars.yml` |
//! | Output | YAML | `<stack>/docker-compose.run.yml` |
//! | User config | TOML | `~/.config/stackweave/config.toml` |
//!
//! ## Project Structure
//!
//! ```text
//! project/
//! ├── stackweave.yml
//! ├── .stackweave/
//! │   ├── plugins/              # Project plugins
//! │   └── collections/
//! │       └── default/
//! │           ├── .stackweave/plugins/
//! │           └── wordpress/    # App templates
//! └── wordpress/                # Stack directory
//!     ├── docker-compose.yml
//!     ├── vars.yml
//!     └── docker-compose.run.yml
//! ```
//!
//! ## Key Types
//!
//! - [`Project`] - Loaded, validated project
//! - [`SearchRoots`] - Ordered lookup directories for tag files
//! - [`ToolConfig`] - External tool locations

mod artifact;
mod config;
pub mod lookup;
mod manifest;
mod project;

pub use artifact::{digest, write_atomic, WrittenArtifact};
pub use config::{ConfigError, ToolConfig};
pub use lookup::SearchRoots;
pub use manifest::ManifestError;
pub use project::{Project, ProjectError, PRIVATE_DIR, PROJECT_FILE_NAMES};
