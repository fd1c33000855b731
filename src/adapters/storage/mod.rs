//! File storage for export output and rollback snapshots

use crate::core::rollback::SnapshotRestorer;
use crate::domain::{FerryError, JobId, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Durable home for files a job staged locally
#[async_trait]
pub trait OutputStorage: Send + Sync {
    /// Store `staged` and return the reference it can be fetched by
    async fn store(&self, staged: &Path) -> Result<String>;
}

fn file_name(path: &Path) -> Result<&str> {
    path.file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| FerryError::Io(format!("No file name in {}", path.display())))
}

async fn copy_into(source: &Path, dir: &Path, name: &str) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await.map_err(|e| {
        FerryError::Io(format!("Failed to create directory {}: {}", dir.display(), e))
    })?;

    let destination = dir.join(name);
    tokio::fs::copy(source, &destination).await.map_err(|e| {
        FerryError::Io(format!(
            "Failed to copy {} to {}: {}",
            source.display(),
            destination.display(),
            e
        ))
    })?;
    Ok(destination)
}

/// Stores output files in a local directory
#[derive(Debug, Clone)]
pub struct LocalFileStorage {
    output_dir: PathBuf,
}

impl LocalFileStorage {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

#[async_trait]
impl OutputStorage for LocalFileStorage {
    async fn store(&self, staged: &Path) -> Result<String> {
        let name = file_name(staged)?;
        let stored = copy_into(staged, &self.output_dir, name).await?;

        tracing::debug!(staged = %staged.display(), stored = %stored.display(), "Stored output file");
        Ok(stored.display().to_string())
    }
}

/// Restores snapshot files into a local directory
///
/// A snapshot for job `J` named `items.csv` is restored as `<restore_dir>/J-items.csv`.
#[derive(Debug, Clone)]
pub struct FileSnapshotRestorer {
    restore_dir: PathBuf,
}

impl FileSnapshotRestorer {
    pub fn new(restore_dir: impl Into<PathBuf>) -> Self {
        Self {
            restore_dir: restore_dir.into(),
        }
    }
}

#[async_trait]
impl SnapshotRestorer for FileSnapshotRestorer {
    async fn restore(&self, job_id: &JobId, snapshot: &str) -> Result<String> {
        let source = Path::new(snapshot);
        if !tokio::fs::try_exists(source).await.unwrap_or(false) {
            return Err(FerryError::Rollback(format!("Snapshot {snapshot} does not exist")));
        }

        let name = format!("{}-{}", job_id, file_name(source)?);
        let restored = copy_into(source, &self.restore_dir, &name).await?;
        Ok(restored.display().to_string())
    }
}
