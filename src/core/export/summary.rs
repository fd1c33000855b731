//! Export summary and reporting
//!
//! Condenses a finished [`JobExecution`] into the numbers an operator cares
//! about.

use crate::core::job::{keys, JobExecution};
use crate::core::lifecycle::{parse_output_files, root_cause};
use crate::domain::BatchStatus;
use std::error::Error as StdError;
use std::time::Duration;

/// Summary of one export execution
#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub status: BatchStatus,

    /// Records pulled from the source
    pub records_read: u64,

    /// Records written to the output file
    pub records_written: u64,

    /// Records dropped by the processor
    pub records_filtered: u64,

    /// Records written to the errors file
    pub records_skipped: u64,

    pub duration: Duration,

    /// Stored output file references
    pub files: Vec<String>,

    /// Root-cause messages of recorded failures
    pub errors: Vec<String>,
}

impl ExportSummary {
    pub fn from_execution(execution: &JobExecution) -> Self {
        let (read, written, filtered, skipped) = execution.step_executions.iter().fold(
            (0, 0, 0, 0),
            |(r, w, f, s), step| {
                (
                    r + step.read_count,
                    w + step.write_count,
                    f + step.filter_count,
                    s + step.skip_count,
                )
            },
        );

        let duration = match (execution.start_time, execution.end_time) {
            (Some(start), Some(end)) => (end - start).to_std().unwrap_or_default(),
            _ => Duration::ZERO,
        };

        let errors = execution
            .failures()
            .iter()
            .map(|failure| {
                let error: &(dyn StdError + 'static) = failure.as_ref();
                root_cause(error).to_string()
            })
            .collect();

        Self {
            status: execution.status,
            records_read: read,
            records_written: written,
            records_filtered: filtered,
            records_skipped: skipped,
            duration,
            files: execution
                .context
                .get_string(keys::OUTPUT_FILES_IN_STORAGE)
                .map(parse_output_files)
                .unwrap_or_default(),
            errors,
        }
    }

    /// Completed with every record written
    pub fn is_successful(&self) -> bool {
        self.status == BatchStatus::Completed && self.records_skipped == 0
    }

    /// Share of read records that were written, as a percentage
    pub fn success_rate(&self) -> f64 {
        if self.records_read == 0 {
            return 100.0;
        }
        (self.records_written as f64 / self.records_read as f64) * 100.0
    }

    /// Log the summary
    pub fn log_summary(&self) {
        tracing::info!(
            status = %self.status,
            read = self.records_read,
            written = self.records_written,
            filtered = self.records_filtered,
            skipped = self.records_skipped,
            files = self.files.len(),
            duration_secs = self.duration.as_secs(),
            success_rate = format!("{:.2}%", self.success_rate()),
            "Export finished"
        );

        for error in &self.errors {
            tracing::warn!(message = %error, "Export error");
        }
    }
}
