//! Job completion notifier
//!
//! Publishes a [`Job`] status record before and after every execution.
//! After the body has finished it also releases the inbound acknowledgment
//! and deletes the job's temp files.

use super::acknowledgment::AcknowledgementRegistry;
use crate::adapters::publisher::StatusPublisher;
use crate::config::NotifierConfig;
use crate::core::job::{keys, JobExecution, JobExecutionListener};
use crate::domain::{BatchStatus, FerryError, Job, JobBuilder, JobId};
use async_trait::async_trait;
use std::error::Error as StdError;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A step whose write count is reported in the completion description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescribedStep {
    pub step: String,
    pub label: String,
}

impl DescribedStep {
    pub fn new(step: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            label: label.into(),
        }
    }
}

/// Render `label: write_count` lines for the described steps
///
/// Steps that did not run are rendered as `null`. Returns `None` when none
/// of the described steps ran.
pub fn describe(steps: &[DescribedStep], execution: &JobExecution) -> Option<String> {
    let counts: Vec<Option<u64>> = steps
        .iter()
        .map(|described| execution.step(&described.step).map(|s| s.write_count))
        .collect();

    if counts.iter().all(Option::is_none) {
        return None;
    }

    let lines: Vec<String> = steps
        .iter()
        .zip(counts)
        .map(|(described, count)| match count {
            Some(count) => format!("{}: {}", described.label, count),
            None => format!("{}: null", described.label),
        })
        .collect();
    Some(lines.join("\n"))
}

/// Deepest cause of `error`
///
/// The walk stops at the first error without a source, or as soon as a cause
/// repeats an error already visited.
pub fn root_cause<'a>(error: &'a (dyn StdError + 'static)) -> &'a (dyn StdError + 'static) {
    let mut current = error;
    let mut visited = vec![address(current)];

    while let Some(cause) = current.source() {
        let addr = address(cause);
        if visited.contains(&addr) {
            break;
        }
        visited.push(addr);
        current = cause;
    }
    current
}

fn address(error: &(dyn StdError + 'static)) -> *const () {
    error as *const dyn StdError as *const ()
}

/// Split a semicolon-delimited file list, dropping blank entries
pub fn parse_output_files(raw: &str) -> Vec<String> {
    raw.split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

/// Result of a temp-file cleanup pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    pub deleted: Vec<PathBuf>,
    pub failed: Vec<PathBuf>,
}

/// Delete every file next to `temp_path` whose name starts with its file name
///
/// A path without a parent directory or file name is a no-op. Individual
/// deletion failures are collected in the report.
///
/// # Errors
///
/// Returns [`FerryError::Cleanup`] when the directory cannot be listed.
pub async fn cleanup_temp_files(temp_path: &Path) -> Result<CleanupReport, FerryError> {
    let mut report = CleanupReport::default();

    let (Some(dir), Some(prefix)) = (
        temp_path.parent().filter(|p| !p.as_os_str().is_empty()),
        temp_path.file_name().and_then(|n| n.to_str()),
    ) else {
        return Ok(report);
    };
    if prefix.trim().is_empty() {
        return Ok(report);
    }

    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(report),
        Err(e) => {
            return Err(FerryError::Cleanup(format!(
                "Cannot list {}: {}",
                dir.display(),
                e
            )))
        }
    };

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| FerryError::Cleanup(format!("Cannot list {}: {}", dir.display(), e)))?
    {
        let name = entry.file_name();
        if !name.to_string_lossy().starts_with(prefix) {
            continue;
        }

        let path = entry.path();
        match tokio::fs::remove_file(&path).await {
            Ok(()) => report.deleted.push(path),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to delete temp file");
                report.failed.push(path);
            }
        }
    }

    Ok(report)
}

/// Listener that reports execution status and cleans up after the job
pub struct JobCompletionNotifier {
    publisher: Arc<dyn StatusPublisher>,
    acknowledgements: Arc<AcknowledgementRegistry>,
    described_steps: Vec<DescribedStep>,
}

impl JobCompletionNotifier {
    pub fn new(
        publisher: Arc<dyn StatusPublisher>,
        acknowledgements: Arc<AcknowledgementRegistry>,
    ) -> Self {
        Self {
            publisher,
            acknowledgements,
            described_steps: Vec::new(),
        }
    }

    pub fn with_described_steps(mut self, steps: Vec<DescribedStep>) -> Self {
        self.described_steps = steps;
        self
    }

    pub fn from_config(
        config: &NotifierConfig,
        publisher: Arc<dyn StatusPublisher>,
        acknowledgements: Arc<AcknowledgementRegistry>,
    ) -> Self {
        let steps = config
            .described_steps
            .iter()
            .map(|s| DescribedStep::new(&s.step, &s.label))
            .collect();
        Self::new(publisher, acknowledgements).with_described_steps(steps)
    }

    /// Status record for the current state of `execution`
    pub fn build_status(&self, job_id: JobId, execution: &JobExecution) -> Job {
        let description = if execution.status == BatchStatus::Completed {
            describe(&self.described_steps, execution)
        } else {
            None
        };

        let files = execution
            .context
            .get_string(keys::OUTPUT_FILES_IN_STORAGE)
            .map(parse_output_files)
            .unwrap_or_default();

        let error_details = execution
            .failures()
            .iter()
            .map(|failure| {
                let error: &(dyn StdError + 'static) = failure.as_ref();
                root_cause(error).to_string()
            })
            .collect::<Vec<_>>()
            .join("\n");

        JobBuilder::new(job_id)
            .created_date(execution.create_time)
            .start_time(execution.start_time)
            .end_time(execution.end_time)
            .batch_status(execution.status)
            .exit_status(execution.exit_status.clone())
            .files(files)
            .error_details(error_details)
            .description(description)
            .updated_date(execution.last_updated)
            .build()
    }

    fn checked_job_id(&self, execution: &JobExecution) -> Option<JobId> {
        let job_id = execution.job_id();
        if job_id.is_none() {
            let error = FerryError::MalformedJobRequest(format!(
                "Job update with empty job id for execution {}",
                execution.id
            ));
            tracing::error!(execution_id = %execution.id, job_name = %execution.job_name, "{}", error);
        }
        job_id
    }

    async fn release_job_resources(&self, job_id: &JobId, execution: &JobExecution) {
        if let Some(acknowledgment) = self.acknowledgements.take(job_id) {
            acknowledgment.acknowledge();
            tracing::debug!(job_id = %job_id, "Acknowledged job request");
        }

        let Some(temp_path) = execution
            .parameters
            .get_non_blank(keys::TEMP_OUTPUT_FILE_PATH)
        else {
            return;
        };

        match cleanup_temp_files(Path::new(temp_path)).await {
            Ok(report) if !report.deleted.is_empty() || !report.failed.is_empty() => {
                tracing::info!(
                    job_id = %job_id,
                    deleted = report.deleted.len(),
                    failed = report.failed.len(),
                    "Deleted temp files"
                );
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(job_id = %job_id, error = %e, "Temp file cleanup failed"),
        }
    }

    async fn publish(&self, job_id: &JobId, execution: &JobExecution) {
        let status = self.build_status(job_id.clone(), execution);
        tracing::info!(job_id = %job_id, batch_status = %status.batch_status, "Sending job update");

        if let Err(e) = self.publisher.publish(job_id, &status).await {
            tracing::error!(job_id = %job_id, error = %e, "Failed to publish job update");
        }
    }
}

#[async_trait]
impl JobExecutionListener for JobCompletionNotifier {
    async fn on_before(&self, execution: &JobExecution) {
        let Some(job_id) = self.checked_job_id(execution) else {
            return;
        };
        self.publish(&job_id, execution).await;
    }

    async fn on_after(&self, execution: &JobExecution) {
        let Some(job_id) = self.checked_job_id(execution) else {
            return;
        };
        self.release_job_resources(&job_id, execution).await;
        self.publish(&job_id, execution).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::publisher::ChannelStatusPublisher;
    use crate::core::job::{JobParameters, StepExecution};
    use crate::core::lifecycle::acknowledgment::OneshotAcknowledgment;
    use crate::domain::{ExecutionId, RemoteError};
    use std::fmt;
    use test_case::test_case;

    #[derive(Debug)]
    struct SelfReferential;

    impl fmt::Display for SelfReferential {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "loops forever")
        }
    }

    impl StdError for SelfReferential {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            Some(self)
        }
    }

    fn execution(job_id: &str) -> JobExecution {
        JobExecution::new(
            ExecutionId::new(7),
            "exportJob",
            JobParameters::new().with(keys::JOB_ID, job_id),
        )
    }

    fn described() -> Vec<DescribedStep> {
        vec![
            DescribedStep::new("chargeFeesFinesExportStep", "# of charges"),
            DescribedStep::new("refundFeesFinesExportStep", "# of refunds"),
        ]
    }

    #[test]
    fn test_root_cause_terminates_on_self_reference() {
        let error = SelfReferential;
        assert_eq!(root_cause(&error).to_string(), "loops forever");
    }

    #[test]
    fn test_root_cause_walks_to_deepest() {
        let error = FerryError::step(
            "export",
            FerryError::RemoteUnavailable(RemoteError::Timeout("30s".to_string())),
        );
        assert_eq!(root_cause(&error).to_string(), "Request timeout: 30s");
    }

    #[test_case("a.csv;errors.csv", &["a.csv", "errors.csv"]; "two files")]
    #[test_case("a.csv", &["a.csv"]; "single file")]
    #[test_case("a.csv;;b.csv;", &["a.csv", "b.csv"]; "blank segments dropped")]
    #[test_case("", &[]; "empty")]
    fn test_parse_output_files(raw: &str, expected: &[&str]) {
        assert_eq!(parse_output_files(raw), expected);
    }

    #[test]
    fn test_describe_renders_missing_step_as_null() {
        let mut execution = execution("J1");
        let mut charges = StepExecution::new("chargeFeesFinesExportStep");
        charges.write_count = 4;
        execution.step_executions.push(charges);

        assert_eq!(
            describe(&described(), &execution).as_deref(),
            Some("# of charges: 4\n# of refunds: null")
        );
    }

    #[test]
    fn test_describe_none_without_described_steps() {
        let mut execution = execution("J1");
        execution.step_executions.push(StepExecution::new("other"));
        assert!(describe(&described(), &execution).is_none());
    }

    #[tokio::test]
    async fn test_cleanup_deletes_prefixed_files_only() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["j1-out.csv", "j1-out.csv.tmp", "j2-out.csv"] {
            std::fs::write(dir.path().join(name), "x").unwrap();
        }

        let report = cleanup_temp_files(&dir.path().join("j1-out")).await.unwrap();

        assert_eq!(report.deleted.len(), 2);
        assert!(!dir.path().join("j1-out.csv").exists());
        assert!(!dir.path().join("j1-out.csv.tmp").exists());
        assert!(dir.path().join("j2-out.csv").exists());
    }

    #[tokio::test]
    async fn test_cleanup_without_parent_is_noop() {
        let report = cleanup_temp_files(Path::new("j1-out")).await.unwrap();
        assert_eq!(report, CleanupReport::default());
    }

    #[tokio::test]
    async fn test_before_with_blank_job_id_publishes_nothing() {
        let (publisher, mut receiver) = ChannelStatusPublisher::channel(4);
        let notifier = JobCompletionNotifier::new(
            Arc::new(publisher),
            Arc::new(AcknowledgementRegistry::new()),
        );

        notifier.on_before(&execution("   ")).await;
        notifier.on_after(&execution("")).await;
        drop(notifier);

        assert!(receiver.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_after_acknowledges_and_publishes_summary() {
        let (publisher, mut receiver) = ChannelStatusPublisher::channel(4);
        let registry = Arc::new(AcknowledgementRegistry::new());
        let (ack, ack_received) = OneshotAcknowledgment::channel();
        let job_id = JobId::new("J1").unwrap();
        registry.put(job_id.clone(), Box::new(ack));

        let notifier = JobCompletionNotifier::new(Arc::new(publisher), Arc::clone(&registry))
            .with_described_steps(described());

        let mut execution = execution("J1");
        execution.mark_started();
        let mut refunds = StepExecution::new("refundFeesFinesExportStep");
        refunds.write_count = 2;
        execution.step_executions.push(refunds);
        execution
            .context
            .put(keys::OUTPUT_FILES_IN_STORAGE, "out.jsonl;out_errors.csv");
        execution.mark_completed();

        notifier.on_after(&execution).await;

        assert!(ack_received.await.is_ok());
        assert!(registry.is_empty());

        let published = receiver.recv().await.unwrap();
        assert_eq!(published.key, job_id);
        assert_eq!(published.job.batch_status, BatchStatus::Completed);
        assert_eq!(published.job.files, vec!["out.jsonl", "out_errors.csv"]);
        assert_eq!(
            published.job.description.as_deref(),
            Some("# of charges: null\n# of refunds: 2")
        );
        assert!(published.job.error_details.is_none());
    }

    #[tokio::test]
    async fn test_failed_execution_has_error_details_and_no_description() {
        let (publisher, mut receiver) = ChannelStatusPublisher::channel(4);
        let notifier = JobCompletionNotifier::new(
            Arc::new(publisher),
            Arc::new(AcknowledgementRegistry::new()),
        )
        .with_described_steps(described());

        let mut execution = execution("J1");
        execution.mark_started();
        execution.step_executions.push(StepExecution::new("chargeFeesFinesExportStep"));
        execution.add_failure(FerryError::Io("disk full".to_string()));
        execution.add_failure(SelfReferential);
        execution.mark_failed();

        notifier.on_after(&execution).await;

        let published = receiver.recv().await.unwrap();
        assert_eq!(published.job.batch_status, BatchStatus::Failed);
        assert_eq!(
            published.job.error_details.as_deref(),
            Some("I/O error: disk full\nloops forever")
        );
        assert!(published.job.description.is_none());
    }
}
