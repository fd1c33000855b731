//! Job execution state
//!
//! A [`JobExecution`] is one run attempt of a job: its parameters, status,
//! timestamps, per-step counters, recorded failures, and the execution
//! context that steps use to hand values to listeners.

use crate::domain::{BatchStatus, ExecutionId, ExitStatus, JobId};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::error::Error as StdError;

/// Well-known parameter and context keys
pub mod keys {
    /// Job id the execution reports under
    pub const JOB_ID: &str = "jobId";
    /// Path prefix of the job's temp files, cleaned up after the job
    pub const TEMP_OUTPUT_FILE_PATH: &str = "tempOutputFilePath";
    /// Semicolon-delimited output file references (execution context)
    pub const OUTPUT_FILES_IN_STORAGE: &str = "outputFilesInStorage";
    /// Snapshot to restore if an update job is rolled back
    pub const ROLLBACK_FILE: &str = "rollBackFile";
}

/// A failure recorded against an execution, with its full cause chain
pub type Failure = Box<dyn StdError + Send + Sync + 'static>;

/// Immutable string parameters an execution is launched with
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobParameters(BTreeMap<String, String>);

impl JobParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a parameter
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Parameter value, `None` when missing or blank
    pub fn get_non_blank(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.trim().is_empty())
    }

    /// Job id parameter, `None` when missing or blank
    pub fn job_id(&self) -> Option<JobId> {
        self.get(keys::JOB_ID).and_then(|raw| JobId::new(raw).ok())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }
}

/// Mutable key/value store shared by the steps of one execution
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionContext(BTreeMap<String, String>);

impl ExecutionContext {
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }
}

/// Counters and status of one step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepExecution {
    pub step_name: String,
    pub status: BatchStatus,
    pub read_count: u64,
    pub write_count: u64,
    pub filter_count: u64,
    pub skip_count: u64,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
}

impl StepExecution {
    pub fn new(step_name: impl Into<String>) -> Self {
        Self {
            step_name: step_name.into(),
            status: BatchStatus::Started,
            read_count: 0,
            write_count: 0,
            filter_count: 0,
            skip_count: 0,
            start_time: Utc::now(),
            end_time: None,
        }
    }

    /// Close the step with a terminal status
    pub fn finish(&mut self, status: BatchStatus) {
        self.status = status;
        self.end_time = Some(Utc::now());
    }
}

/// One run attempt of a job
pub struct JobExecution {
    pub id: ExecutionId,
    pub job_name: String,
    pub parameters: JobParameters,
    pub status: BatchStatus,
    pub exit_status: ExitStatus,
    pub create_time: DateTime<Utc>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub last_updated: DateTime<Utc>,
    pub context: ExecutionContext,
    pub step_executions: Vec<StepExecution>,
    failures: Vec<Failure>,
}

impl JobExecution {
    pub fn new(id: ExecutionId, job_name: impl Into<String>, parameters: JobParameters) -> Self {
        let now = Utc::now();
        Self {
            id,
            job_name: job_name.into(),
            parameters,
            status: BatchStatus::Starting,
            exit_status: ExitStatus::unknown(),
            create_time: now,
            start_time: None,
            end_time: None,
            last_updated: now,
            context: ExecutionContext::default(),
            step_executions: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Job id parameter, `None` when missing or blank
    pub fn job_id(&self) -> Option<JobId> {
        self.parameters.job_id()
    }

    /// Every failure recorded so far, oldest first
    pub fn failures(&self) -> &[Failure] {
        &self.failures
    }

    pub fn add_failure(&mut self, failure: impl Into<Failure>) {
        self.failures.push(failure.into());
        self.touch();
    }

    /// Step execution by name, the last one if a step ran more than once
    pub fn step(&self, name: &str) -> Option<&StepExecution> {
        self.step_executions
            .iter()
            .rev()
            .find(|step| step.step_name == name)
    }

    pub fn mark_started(&mut self) {
        self.start_time = Some(Utc::now());
        self.status = BatchStatus::Started;
        self.exit_status = ExitStatus::executing();
        self.touch();
    }

    pub fn mark_stopping(&mut self) {
        if self.status.is_running() {
            self.status = BatchStatus::Stopping;
            self.touch();
        }
    }

    pub fn mark_completed(&mut self) {
        self.finish(BatchStatus::Completed);
    }

    pub fn mark_failed(&mut self) {
        self.finish(BatchStatus::Failed);
    }

    pub fn mark_stopped(&mut self) {
        self.finish(BatchStatus::Stopped);
    }

    fn finish(&mut self, status: BatchStatus) {
        self.status = status;
        self.exit_status = self.terminal_exit_status(status);
        self.end_time = Some(Utc::now());
        self.touch();
    }

    fn terminal_exit_status(&self, status: BatchStatus) -> ExitStatus {
        let exit = ExitStatus::for_batch_status(status);
        match self.failures.last() {
            Some(failure) if status == BatchStatus::Failed => {
                exit.add_description(failure.to_string())
            }
            _ => exit,
        }
    }

    fn touch(&mut self) {
        self.last_updated = Utc::now();
    }
}

impl std::fmt::Debug for JobExecution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobExecution")
            .field("id", &self.id)
            .field("job_name", &self.job_name)
            .field("status", &self.status)
            .field("exit_status", &self.exit_status.exit_code)
            .field("failures", &self.failures.len())
            .finish()
    }
}
