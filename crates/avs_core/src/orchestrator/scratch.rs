//! Per-task scratch directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use uuid::Uuid;

/// Directory owned by one task, removed when dropped.
///
/// Named `avs-<uuid>` under the temp root so concurrent tasks never share
/// scratch files.
#[derive(Debug)]
pub struct ScratchDir {
    id: String,
    path: PathBuf,
}

impl ScratchDir {
    /// Create a fresh scratch directory under `temp_root`.
    pub fn create(temp_root: impl AsRef<Path>) -> io::Result<Self> {
        let id = Uuid::new_v4().simple().to_string();
        let path = temp_root.as_ref().join(format!("avs-{}", id));
        fs::create_dir_all(&path)?;
        tracing::debug!("Created scratch directory {}", path.display());
        Ok(Self { id, path })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// First 8 characters of the id, for log file names.
    pub fn short_id(&self) -> &str {
        &self.id[..8]
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of a file inside the scratch directory.
    pub fn file(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if !self.path.exists() {
            return;
        }
        if let Err(e) = fs::remove_dir_all(&self.path) {
            tracing::warn!(
                "Failed to remove scratch directory {}: {}",
                self.path.display(),
                e
            );
        }
    }
}
