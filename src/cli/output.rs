//! Output formatting for CLI commands
//!
//! Text mode prints human-readable lines as they come. JSON mode stays quiet
//! until the command hands over its collected report.

use serde::Serialize;

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

pub struct Output {
    format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Prints a line (text only)
    pub fn line(&self, message: &str) {
        if self.format == OutputFormat::Text {
            println!("{}", message);
        }
    }

    /// Prints a stack failure to stderr (text only; JSON reports carry it)
    pub fn failure(&self, message: &str) {
        if self.format == OutputFormat::Text {
            eprintln!("Error: {}", message);
        }
    }

    /// Prints tab-separated columns (text only)
    pub fn row(&self, columns: &[&str]) {
        if self.format == OutputFormat::Text {
            println!("{}", columns.join("\t"));
        }
    }

    /// Prints a blank line (text only)
    pub fn blank(&self) {
        if self.format == OutputFormat::Text {
            println!();
        }
    }

    /// Prints a command report as one JSON document (JSON only)
    pub fn report<T: Serialize>(&self, report: &T) -> serde_json::Result<()> {
        if self.format == OutputFormat::Json {
            println!("{}", serde_json::to_string(report)?);
        }
        Ok(())
    }

    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }
}
