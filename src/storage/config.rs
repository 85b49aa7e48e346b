//! User configuration for stackweave
//!
//! Tool locations are read from `config.toml` in the user config directory
//! (`~/.config/stackweave/config.toml` on Linux). Command-line flags and
//! environment variables override it.

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// External tools used by the pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    /// Jsonnet interpreter binary
    pub jsonnet_bin: String,

    /// Library search paths passed to the interpreter (`-J`)
    pub jsonnet_paths: Vec<PathBuf>,

    /// Compose engine command, program first
    pub compose_command: Vec<String>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            jsonnet_bin: "jsonnet".to_string(),
            jsonnet_paths: Vec::new(),
            compose_command: vec!["docker".to_string(), "compose".to_string()],
        }
    }
}

impl ToolConfig {
    /// Returns the user config directory
    pub fn config_dir() -> Option<PathBuf> {
        ProjectDirs::from("dev", "stackweave", "stackweave").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Loads the user configuration, or defaults when there is none
    pub fn load() -> Result<Self, ConfigError> {
        match Self::config_dir() {
            Some(dir) => Self::load_from(&dir.join("config.toml")),
            None => Ok(Self::default()),
        }
    }

    /// Loads configuration from a specific file; a missing file means defaults
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Applies command-line / environment overrides.
    /// `compose` is split on whitespace (`"podman compose"`).
    pub fn with_overrides(mut self, jsonnet: Option<String>, compose: Option<String>) -> Result<Self, ConfigError> {
        if let Some(bin) = jsonnet {
            self.jsonnet_bin = bin;
        }
        if let Some(cmd) = compose {
            self.compose_command = cmd.split_whitespace().map(str::to_string).collect();
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.jsonnet_bin.trim().is_empty() {
            return Err(ConfigError::Invalid("jsonnet_bin must not be empty".to_string()));
        }
        if self.compose_command.is_empty() {
            return Err(ConfigError::Invalid("compose_command must not be empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults() {
        let config = ToolConfig::default();
        assert_eq!(config.jsonnet_bin, "jsonnet");
        assert_eq!(config.compose_command, vec!["docker", "compose"]);
    }

    #[test]
    fn parse_config_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
jsonnet_bin = "/usr/local/bin/jsonnet"
jsonnet_paths = ["/opt/lib"]
compose_command = ["docker-compose"]
"#,
        )
        .unwrap();

        let config = ToolConfig::load_from(&path).unwrap();
        assert_eq!(config.jsonnet_bin, "/usr/local/bin/jsonnet");
        assert_eq!(config.jsonnet_paths, vec![PathBuf::from("/opt/lib")]);
        assert_eq!(config.compose_command, vec!["docker-compose"]);
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = ToolConfig::load_from(&dir.path().join("none.toml")).unwrap();
        assert_eq!(config, ToolConfig::default());
    }

    #[test]
    fn invalid_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "compose_command = []\n").unwrap();
        assert!(matches!(
            ToolConfig::load_from(&path),
            Err(ConfigError::Invalid(_))
        ));

        fs::write(&path, "jsonnet_bin = [\n").unwrap();
        assert!(matches!(
            ToolConfig::load_from(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn overrides_win() {
        let config = ToolConfig::default()
            .with_overrides(Some("gojsonnet".into()), Some("podman compose".into()))
            .unwrap();
        assert_eq!(config.jsonnet_bin, "gojsonnet");
        assert_eq!(config.compose_command, vec!["podman", "compose"]);

        assert!(ToolConfig::default().with_overrides(None, Some("  ".into())).is_err());
    }
}
