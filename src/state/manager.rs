//! Checkpoint store implementation
//!
//! Provides file-based checkpoint persistence with atomic writes.

use super::types::{CheckpointRecord, CheckpointRef};
use crate::error::{Error, Result};
use crate::types::Record;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Reads and writes the checkpoint of one logical fetch
///
/// A store without a path is disabled: `load` finds nothing and `save` is a
/// no-op. Two fetches must never share a path.
#[derive(Debug, Clone, Default)]
pub struct CheckpointStore {
    path: Option<PathBuf>,
}

impl CheckpointStore {
    /// Create a store persisting to `path`
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: Some(path.as_ref().to_path_buf()),
        }
    }

    /// Create a store that never touches the filesystem
    pub fn disabled() -> Self {
        Self { path: None }
    }

    /// Create a store from an optional path
    pub fn from_option(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    /// Checkpoint path, if persistence is enabled
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_enabled(&self) -> bool {
        self.path.is_some()
    }

    /// Sibling temp file the next snapshot is staged in
    pub(crate) fn temp_path(path: &Path) -> PathBuf {
        let mut name: OsString = path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }

    /// Load the last snapshot
    ///
    /// Missing, unreadable and unparseable files all yield `None`; only the
    /// last two are logged.
    pub async fn load(&self) -> Option<CheckpointRecord> {
        let path = self.path.as_ref()?;

        let contents = match tokio::fs::read_to_string(path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read checkpoint, starting fresh");
                return None;
            }
        };

        match serde_json::from_str::<CheckpointRecord>(&contents) {
            Ok(record) => {
                debug!(
                    path = %path.display(),
                    page = record.page,
                    count = record.items.len(),
                    finished = record.finished,
                    "Loaded checkpoint"
                );
                Some(record)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to parse checkpoint, starting fresh");
                None
            }
        }
    }

    /// Persist a full record
    pub async fn save(&self, record: &CheckpointRecord) -> Result<()> {
        self.write(&CheckpointRef::from(record)).await
    }

    /// Persist progress without copying the accumulated items
    pub async fn save_progress(
        &self,
        cursor: Option<&str>,
        page: u32,
        items: &[Record],
        finished: bool,
    ) -> Result<()> {
        self.write(&CheckpointRef::new(cursor, page, items, finished))
            .await
    }

    async fn write(&self, snapshot: &CheckpointRef<'_>) -> Result<()> {
        let Some(path) = self.path.as_ref() else {
            return Ok(()); // Persistence disabled
        };

        let contents = serde_json::to_vec_pretty(snapshot)
            .map_err(|e| Error::checkpoint(format!("Failed to serialize checkpoint: {e}")))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                Error::checkpoint(format!("Failed to create {}: {e}", parent.display()))
            })?;
        }

        // Stage in a sibling file, flush, then rename over the real one
        let temp_path = Self::temp_path(path);
        let staged: std::io::Result<()> = async {
            let mut file = tokio::fs::File::create(&temp_path).await?;
            file.write_all(&contents).await?;
            file.sync_all().await?;
            tokio::fs::rename(&temp_path, path).await
        }
        .await;

        if let Err(e) = staged {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(Error::checkpoint(format!(
                "Failed to write {}: {e}",
                path.display()
            )));
        }

        debug!(
            path = %path.display(),
            page = snapshot.page,
            count = snapshot.count,
            finished = snapshot.finished,
            "Checkpoint saved"
        );
        Ok(())
    }

    /// Delete the checkpoint file, if any
    pub async fn clear(&self) -> Result<()> {
        let Some(path) = self.path.as_ref() else {
            return Ok(());
        };

        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::checkpoint(format!(
                "Failed to remove {}: {e}",
                path.display()
            ))),
        }
    }
}
