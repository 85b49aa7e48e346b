//! Writing the assembled compose file
//!
//! Writes are atomic (locked temp file + rename) so a concurrent reader never
//! sees a half-written document.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::Serialize;

/// A persisted artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WrittenArtifact {
    pub path: PathBuf,

    /// blake3 hex digest of the written bytes
    pub digest: String,

    pub bytes: usize,
}

/// Writes `content` to `path`, creating the parent directory if needed
pub fn write_atomic(path: &Path, content: &str) -> std::io::Result<WrittenArtifact> {
    if let Some(parent) = path.parent() {
        if !parent.is_dir() {
            tracing::info!("Create missing directory: {}", parent.display());
            fs::create_dir_all(parent)?;
        }
    }

    let temp_path = path.with_extension("yml.tmp");

    {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)?;

        file.lock_exclusive()?;

        let mut writer = BufWriter::new(&file);
        writer.write_all(content.as_bytes())?;
        writer.flush()?;
        file.sync_all()?;
        // Lock is released when file is dropped
    }

    fs::rename(&temp_path, path)?;

    Ok(WrittenArtifact {
        path: path.to_path_buf(),
        digest: digest(content),
        bytes: content.len(),
    })
}

/// blake3 hex digest of a rendered document
pub fn digest(content: &str) -> String {
    blake3::hash(content.as_bytes()).to_hex().to_string()
}
