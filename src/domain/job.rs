//! Job status record published to the monitoring channel
//!
//! A [`Job`] is the snapshot of one execution that the completion notifier
//! sends before the job body runs and again after it finishes.

use crate::domain::ids::JobId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse lifecycle state of a job execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchStatus {
    /// Execution created, body not yet running
    Starting,
    /// Body is running
    Started,
    /// Stop requested, body winding down
    Stopping,
    /// Stopped before finishing
    Stopped,
    /// Finished successfully
    Completed,
    /// Finished with a failure
    Failed,
}

impl BatchStatus {
    /// Whether the execution has reached a final state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BatchStatus::Completed | BatchStatus::Failed | BatchStatus::Stopped
        )
    }

    /// Whether the execution is still in flight
    pub fn is_running(&self) -> bool {
        !self.is_terminal()
    }
}

impl Default for BatchStatus {
    fn default() -> Self {
        Self::Starting
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BatchStatus::Starting => "STARTING",
            BatchStatus::Started => "STARTED",
            BatchStatus::Stopping => "STOPPING",
            BatchStatus::Stopped => "STOPPED",
            BatchStatus::Completed => "COMPLETED",
            BatchStatus::Failed => "FAILED",
        };
        write!(f, "{s}")
    }
}

/// Exit code plus free-form description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExitStatus {
    /// Machine-readable exit code
    pub exit_code: String,
    /// Human-readable details, empty when there is nothing to add
    pub exit_description: String,
}

impl ExitStatus {
    fn with_code(code: &str) -> Self {
        Self {
            exit_code: code.to_string(),
            exit_description: String::new(),
        }
    }

    pub fn unknown() -> Self {
        Self::with_code("UNKNOWN")
    }

    pub fn executing() -> Self {
        Self::with_code("EXECUTING")
    }

    pub fn completed() -> Self {
        Self::with_code("COMPLETED")
    }

    pub fn failed() -> Self {
        Self::with_code("FAILED")
    }

    pub fn stopped() -> Self {
        Self::with_code("STOPPED")
    }

    /// Returns a copy with the given description appended
    pub fn add_description(mut self, description: impl AsRef<str>) -> Self {
        let description = description.as_ref();
        if description.is_empty() {
            return self;
        }
        if self.exit_description.is_empty() {
            self.exit_description = description.to_string();
        } else {
            self.exit_description.push_str("; ");
            self.exit_description.push_str(description);
        }
        self
    }

    /// Exit status matching a terminal batch status
    pub fn for_batch_status(status: BatchStatus) -> Self {
        match status {
            BatchStatus::Completed => Self::completed(),
            BatchStatus::Failed => Self::failed(),
            BatchStatus::Stopped => Self::stopped(),
            BatchStatus::Starting | BatchStatus::Started | BatchStatus::Stopping => {
                Self::executing()
            }
        }
    }
}

impl Default for ExitStatus {
    fn default() -> Self {
        Self::unknown()
    }
}

/// Status record for one job execution
///
/// # Examples
///
/// ```
/// use ferry::domain::ids::JobId;
/// use ferry::domain::job::{BatchStatus, JobBuilder};
///
/// let job = JobBuilder::new(JobId::new("J1").unwrap())
///     .batch_status(BatchStatus::Completed)
///     .files(vec!["a.csv".to_string()])
///     .build();
///
/// assert_eq!(job.files, vec!["a.csv"]);
/// assert!(job.batch_status.is_terminal());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    pub created_date: Option<DateTime<Utc>>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub updated_date: DateTime<Utc>,
    pub batch_status: BatchStatus,
    pub exit_status: ExitStatus,
    /// Output file references, in the order they were stored
    pub files: Vec<String>,
    /// Root-cause messages of recorded failures, newline separated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Job {
    /// Whether this record describes a finished execution
    pub fn is_terminal(&self) -> bool {
        self.batch_status.is_terminal()
    }
}

/// Builder for [`Job`] records
pub struct JobBuilder {
    id: JobId,
    created_date: Option<DateTime<Utc>>,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    batch_status: BatchStatus,
    exit_status: Option<ExitStatus>,
    files: Vec<String>,
    error_details: Option<String>,
    description: Option<String>,
    updated_date: Option<DateTime<Utc>>,
}

impl JobBuilder {
    pub fn new(id: JobId) -> Self {
        Self {
            id,
            created_date: None,
            start_time: None,
            end_time: None,
            batch_status: BatchStatus::Starting,
            exit_status: None,
            files: Vec::new(),
            error_details: None,
            description: None,
            updated_date: None,
        }
    }

    pub fn created_date(mut self, at: DateTime<Utc>) -> Self {
        self.created_date = Some(at);
        self
    }

    pub fn start_time(mut self, at: Option<DateTime<Utc>>) -> Self {
        self.start_time = at;
        self
    }

    pub fn end_time(mut self, at: Option<DateTime<Utc>>) -> Self {
        self.end_time = at;
        self
    }

    pub fn batch_status(mut self, status: BatchStatus) -> Self {
        self.batch_status = status;
        self
    }

    pub fn exit_status(mut self, status: ExitStatus) -> Self {
        self.exit_status = Some(status);
        self
    }

    pub fn files(mut self, files: Vec<String>) -> Self {
        self.files = files;
        self
    }

    /// Empty details are dropped
    pub fn error_details(mut self, details: impl Into<String>) -> Self {
        let details = details.into();
        self.error_details = if details.is_empty() {
            None
        } else {
            Some(details)
        };
        self
    }

    pub fn description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn updated_date(mut self, at: DateTime<Utc>) -> Self {
        self.updated_date = Some(at);
        self
    }

    /// Build the record; `updated_date` defaults to the current time
    pub fn build(self) -> Job {
        let exit_status = self
            .exit_status
            .unwrap_or_else(|| ExitStatus::for_batch_status(self.batch_status));

        Job {
            id: self.id,
            created_date: self.created_date,
            start_time: self.start_time,
            end_time: self.end_time,
            updated_date: self.updated_date.unwrap_or_else(Utc::now),
            batch_status: self.batch_status,
            exit_status,
            files: self.files,
            error_details: self.error_details,
            description: self.description,
        }
    }
}
