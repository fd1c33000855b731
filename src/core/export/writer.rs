//! Staged output files: JSON lines for records, CSV for skipped records

use crate::core::job::ItemWriter;
use crate::domain::{FerryError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};

const ERRORS_HEADER: [&str; 2] = ["record", "error"];

/// Writes records as JSON lines and skipped records as CSV rows
///
/// The records file is created up front, so an export of nothing still
/// produces an empty file. The errors file only appears once a record is
/// skipped.
pub struct StagedOutputWriter {
    records_path: PathBuf,
    records: BufWriter<File>,
    errors_path: PathBuf,
    errors: Option<BufWriter<File>>,
    written: u64,
    skipped: u64,
}

impl StagedOutputWriter {
    /// # Errors
    ///
    /// Returns [`FerryError::Io`] if the records file cannot be created
    pub async fn create(records_path: impl Into<PathBuf>, errors_path: impl Into<PathBuf>) -> Result<Self> {
        let records_path = records_path.into();
        if let Some(parent) = records_path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                FerryError::Io(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }

        let file = File::create(&records_path).await.map_err(|e| {
            FerryError::Io(format!("Failed to create {}: {}", records_path.display(), e))
        })?;

        Ok(Self {
            records_path,
            records: BufWriter::new(file),
            errors_path: errors_path.into(),
            errors: None,
            written: 0,
            skipped: 0,
        })
    }

    pub fn records_path(&self) -> &Path {
        &self.records_path
    }

    pub fn errors_path(&self) -> &Path {
        &self.errors_path
    }

    async fn errors_file(&mut self) -> Result<&mut BufWriter<File>> {
        if self.errors.is_none() {
            let file = File::create(&self.errors_path).await.map_err(|e| {
                FerryError::Io(format!("Failed to create {}: {}", self.errors_path.display(), e))
            })?;
            let mut writer = BufWriter::new(file);
            writer.write_all(&csv_row(&ERRORS_HEADER)?).await?;
            self.errors = Some(writer);
        }

        self.errors
            .as_mut()
            .ok_or_else(|| FerryError::Io("errors file unavailable".to_string()))
    }
}

fn csv_row(fields: &[&str]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(fields)
        .map_err(|e| FerryError::Serialization(format!("CSV write error: {e}")))?;
    writer
        .into_inner()
        .map_err(|e| FerryError::Serialization(format!("CSV flush error: {e}")))
}

#[async_trait]
impl ItemWriter<Value> for StagedOutputWriter {
    async fn write(&mut self, items: Vec<Value>) -> Result<()> {
        for item in &items {
            let mut line = serde_json::to_vec(item)?;
            line.push(b'\n');
            self.records.write_all(&line).await?;
        }
        self.written += items.len() as u64;
        Ok(())
    }

    async fn write_skipped(&mut self, failure: &FerryError) -> Result<()> {
        let (record, reason) = match failure {
            FerryError::PartialFailure { record, reason } => (record.clone(), reason.clone()),
            other => (String::new(), other.to_string()),
        };

        let row = csv_row(&[&record, &reason])?;
        self.errors_file().await?.write_all(&row).await?;
        self.skipped += 1;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.records.flush().await?;
        if let Some(errors) = self.errors.as_mut() {
            errors.flush().await?;
        }

        tracing::debug!(
            records = %self.records_path.display(),
            written = self.written,
            skipped = self.skipped,
            "Closed staged output"
        );
        Ok(())
    }
}
