//! services/api/src/adapters/export_store.rs
//!
//! Stores rendered exports as plain files in one shared directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use research_core::ports::{ExportStore, PortError, PortResult, StoredExport};
use tracing::info;

#[derive(Clone, Debug)]
pub struct FsExportStore {
    dir: PathBuf,
}

fn io_error(e: std::io::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

/// Rejects names that could escape the export directory.
fn checked_name(filename: &str) -> PortResult<&str> {
    let safe = !filename.is_empty()
        && !filename.contains(['/', '\\'])
        && filename != "."
        && !filename.contains("..");
    if safe {
        Ok(filename)
    } else {
        Err(PortError::NotFound(format!("Export {}", filename)))
    }
}

impl FsExportStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Creates the export directory if it does not exist yet.
    pub async fn ensure_dir(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        info!(dir = %self.dir.display(), "Export directory ready");
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn describe(&self, filename: &str) -> PortResult<StoredExport> {
        let metadata = tokio::fs::metadata(self.dir.join(filename))
            .await
            .map_err(io_error)?;
        let modified = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());
        Ok(StoredExport {
            filename: filename.to_string(),
            size: metadata.len(),
            modified,
        })
    }
}

#[async_trait]
impl ExportStore for FsExportStore {
    async fn write(&self, filename: &str, data: &[u8]) -> PortResult<StoredExport> {
        let filename = checked_name(filename)?;
        tokio::fs::create_dir_all(&self.dir).await.map_err(io_error)?;
        tokio::fs::write(self.dir.join(filename), data)
            .await
            .map_err(io_error)?;
        self.describe(filename).await
    }

    async fn list_by_prefix(&self, prefix: &str) -> PortResult<Vec<StoredExport>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error(e)),
        };

        let mut exports = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_error)? {
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if !name.starts_with(prefix) {
                continue;
            }
            if entry.file_type().await.map(|t| t.is_file()).unwrap_or(false) {
                exports.push(self.describe(&name).await?);
            }
        }
        Ok(exports)
    }

    async fn read(&self, filename: &str) -> PortResult<Bytes> {
        let filename = checked_name(filename)?;
        match tokio::fs::read(self.dir.join(filename)).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(PortError::NotFound(format!("Export {}", filename)))
            }
            Err(e) => Err(io_error(e)),
        }
    }
}
