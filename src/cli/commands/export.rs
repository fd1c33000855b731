//! Export command implementation
//!
//! This module implements the `export` command, which runs one export job
//! for a configured source.

use crate::adapters::publisher::create_publisher;
use crate::adapters::remote::{RemoteClient, RestPageFetcher, RestReferenceClient};
use crate::adapters::storage::{FileSnapshotRestorer, LocalFileStorage};
use crate::config::{load_config, FerryConfig};
use crate::core::export::{temp_output_path, ExportJob, ExportSummary};
use crate::core::job::{keys, Job, JobParameters, JobRunner, RunnerHandle};
use crate::core::lifecycle::{
    AcknowledgementRegistry, JobCompletionNotifier, JobLifecycleTracker, OneshotAcknowledgment,
};
use crate::core::reference::ReferenceDataCache;
use crate::core::rollback::{JobOperator, RollbackCoordinator};
use crate::domain::{BatchStatus, JobId};
use clap::Args;
use std::sync::Arc;
use tokio::sync::watch;

/// Arguments for the export command
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Name of the configured source to export
    pub source: String,

    /// Job id used in status updates (generated when omitted)
    #[arg(long)]
    pub job_id: Option<String>,

    /// Run as an update job, restored from this snapshot if interrupted
    #[arg(long, value_name = "PATH")]
    pub rollback_snapshot: Option<String>,

    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

impl ExportArgs {
    /// Execute the export command
    pub async fn execute(
        &self,
        config_path: &str,
        mut shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!(source = %self.source, "Starting export command");

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load configuration");
                eprintln!("Failed to load configuration: {e}");
                return Ok(2);
            }
        };

        if let Err(e) = config.validate() {
            tracing::error!(error = %e, "Configuration validation failed");
            eprintln!("Configuration validation failed: {e}");
            return Ok(2);
        }

        let source = match config.source(&self.source) {
            Ok(s) => s.clone(),
            Err(e) => {
                eprintln!("{e}");
                return Ok(2);
            }
        };

        let job_id = match &self.job_id {
            Some(id) => match JobId::new(id.as_str()) {
                Ok(id) => id,
                Err(e) => {
                    eprintln!("Invalid job id: {e}");
                    return Ok(2);
                }
            },
            None => JobId::generate(),
        };

        if !self.yes {
            println!("Export Configuration:");
            println!("  Source: {} ({})", self.source, source.path);
            println!("  Pagination: {:?}", source.pagination);
            println!("  Page size: {}", source.page_size);
            println!("  Job id: {job_id}");
            if let Some(snapshot) = &self.rollback_snapshot {
                println!("  Rollback snapshot: {snapshot}");
            }
            println!();
            print!("Proceed with export? [y/N]: ");
            use std::io::{self, Write};
            io::stdout().flush()?;

            let mut input = String::new();
            io::stdin().read_line(&mut input)?;

            if !input.trim().eq_ignore_ascii_case("y") {
                println!("Export cancelled.");
                return Ok(0);
            }
        }

        let client = match RemoteClient::new(&config.remote) {
            Ok(c) => Arc::new(c),
            Err(e) => {
                tracing::error!(error = %e, "Failed to create remote client");
                eprintln!("Failed to initialize export: {e}");
                return Ok(4);
            }
        };

        let publisher = match create_publisher(&config.publisher, &config.remote) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(error = %e, "Failed to create status publisher");
                eprintln!("Failed to initialize export: {e}");
                return Ok(4);
            }
        };

        let acknowledgements = Arc::new(AcknowledgementRegistry::new());
        let (acknowledgment, acknowledged) = OneshotAcknowledgment::channel();
        acknowledgements.put(job_id.clone(), Box::new(acknowledgment));

        let handle = RunnerHandle::default();
        let rollback = Arc::new(RollbackCoordinator::new(
            Arc::new(JobLifecycleTracker::new()),
            Arc::new(handle.clone()),
            Arc::new(FileSnapshotRestorer::new(&config.rollback.restore_dir)),
        ));
        let notifier = Arc::new(JobCompletionNotifier::from_config(
            &config.notifier,
            publisher,
            acknowledgements,
        ));
        let runner = Arc::new(
            JobRunner::with_handle(handle.clone())
                .with_listener(notifier)
                .with_listener(rollback.clone()),
        );

        let job: Arc<dyn Job> = Arc::new(ExportJob::new(
            &self.source,
            source.clone(),
            Arc::new(RestPageFetcher::from_source(Arc::clone(&client), &source)),
            Arc::new(build_cache(&config, client)),
            Arc::new(LocalFileStorage::new(&config.storage.output_dir)),
        ));

        let temp_path = temp_output_path(
            &config.application.work_dir,
            &config.application.name,
            &job_id,
            &self.source,
        );
        let mut parameters = JobParameters::new()
            .with(keys::JOB_ID, job_id.as_str())
            .with(keys::TEMP_OUTPUT_FILE_PATH, temp_path.display().to_string());
        if let Some(snapshot) = &self.rollback_snapshot {
            parameters = parameters.with(keys::ROLLBACK_FILE, snapshot.as_str());
        }

        let execution = runner.prepare(job.name(), parameters);
        let execution_id = execution.id;
        if let Some(snapshot) = &self.rollback_snapshot {
            rollback.record_snapshot(job_id.clone(), snapshot.as_str());
            rollback.bind_execution(execution_id, job_id.clone());
        }

        println!("🚀 Starting export...");
        println!();

        let mut worker = {
            let runner = Arc::clone(&runner);
            tokio::spawn(async move { runner.run_execution(job, execution).await })
        };

        let finished = tokio::select! {
            joined = &mut worker => Some(joined),
            _ = wait_for_shutdown(&mut shutdown_signal) => None,
        };

        let interrupted = finished.is_none();
        let execution = match finished {
            Some(joined) => joined?,
            None => {
                if self.rollback_snapshot.is_some() {
                    match rollback.stop_and_rollback(&job_id).await {
                        Ok(outcome) => println!("↩️  Rollback: {outcome}"),
                        Err(e) => {
                            tracing::error!(job_id = %job_id, error = %e, "Rollback failed");
                            eprintln!("Rollback failed: {e}");
                        }
                    }
                } else {
                    handle.stop(execution_id).await?;
                }
                worker.await?
            }
        };

        if acknowledged.await.is_err() {
            tracing::warn!(job_id = %job_id, "Job finished without acknowledging");
        }

        let summary = ExportSummary::from_execution(&execution);
        summary.log_summary();

        println!();
        println!("📊 Export Summary:");
        println!("  Job: {job_id} (execution {execution_id})");
        println!("  Status: {}", summary.status);
        println!("  Read: {}", summary.records_read);
        println!("  Written: {}", summary.records_written);
        println!("  Skipped: {}", summary.records_skipped);
        println!("  Duration: {:.2}s", summary.duration.as_secs_f64());
        println!("  Success Rate: {:.2}%", summary.success_rate());
        for file in &summary.files {
            println!("  Output: {file}");
        }
        println!();

        if !summary.errors.is_empty() {
            println!("⚠️  Errors encountered:");
            for error in &summary.errors {
                println!("  - {error}");
            }
            println!();
        }

        let exit_code = match summary.status {
            BatchStatus::Stopped => {
                println!("⚠️  Export interrupted.");
                tracing::info!("Export interrupted by user signal");
                130
            }
            _ if interrupted => 130,
            BatchStatus::Completed if summary.is_successful() => {
                println!("✅ Export completed successfully!");
                0
            }
            BatchStatus::Completed => {
                println!("⚠️  Export completed with skipped records");
                1
            }
            _ => {
                println!("❌ Export failed");
                5
            }
        };

        Ok(exit_code)
    }
}

/// Reference cache sized from `[cache]`
fn build_cache(config: &FerryConfig, client: Arc<RemoteClient>) -> ReferenceDataCache {
    let mut builder = ReferenceDataCache::builder(Arc::new(RestReferenceClient::new(client)))
        .default_capacity(config.cache.default_capacity)
        .time_to_live(config.cache.ttl());
    for (kind, capacity) in config.cache.kind_capacities() {
        builder = builder.capacity(kind, capacity);
    }
    builder.build()
}

/// Resolves once shutdown was requested; never if the sender went away
async fn wait_for_shutdown(signal: &mut watch::Receiver<bool>) {
    if signal.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_export_args_defaults() {
        let args = ExportArgs {
            source: "circulation-log".to_string(),
            job_id: None,
            rollback_snapshot: None,
            yes: false,
        };

        assert!(!args.yes);
        assert!(args.job_id.is_none());
        assert!(args.rollback_snapshot.is_none());
    }

    #[tokio::test]
    async fn test_unknown_config_file_is_config_error() {
        let args = ExportArgs {
            source: "circulation-log".to_string(),
            job_id: None,
            rollback_snapshot: None,
            yes: true,
        };
        let (_tx, rx) = watch::channel(false);

        let code = args.execute("does-not-exist.toml", rx).await.unwrap();
        assert_eq!(code, 2);
    }

    #[tokio::test]
    async fn test_wait_for_shutdown_ignores_dropped_sender() {
        let (tx, mut rx) = watch::channel(false);
        drop(tx);

        let waited =
            tokio::time::timeout(Duration::from_millis(50), wait_for_shutdown(&mut rx)).await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn test_wait_for_shutdown_resolves_on_signal() {
        let (tx, mut rx) = watch::channel(false);
        tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(1), wait_for_shutdown(&mut rx))
            .await
            .unwrap();
    }
}
