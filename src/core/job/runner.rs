//! Job runner: execution ids, status transitions, listeners and stop requests

use super::execution::{JobExecution, JobParameters};
use super::listener::JobExecutionListener;
use crate::core::rollback::JobOperator;
use crate::domain::{ExecutionId, Result};
use crate::{log_job_complete, log_job_start};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// A unit of batch work the runner can execute
#[async_trait]
pub trait Job: Send + Sync {
    fn name(&self) -> &str;

    /// Run the job body
    ///
    /// Implementations should poll `stop` between units of work and return
    /// early once it is set.
    async fn execute(&self, execution: &mut JobExecution, stop: StopSignal) -> Result<()>;
}

/// Read side of an execution's stop flag
#[derive(Debug, Clone)]
pub struct StopSignal {
    receiver: watch::Receiver<bool>,
}

impl StopSignal {
    pub fn new(receiver: watch::Receiver<bool>) -> Self {
        Self { receiver }
    }

    /// A signal that is never raised
    pub fn never() -> Self {
        let (_, receiver) = watch::channel(false);
        Self { receiver }
    }

    pub fn is_stop_requested(&self) -> bool {
        *self.receiver.borrow()
    }
}

/// Runs jobs and tracks the stop handles of in-flight executions
///
/// # Example
///
/// ```no_run
/// use ferry::core::job::{Job, JobParameters, JobRunner};
/// use std::sync::Arc;
///
/// # async fn example(job: Arc<dyn Job>) {
/// let runner = Arc::new(JobRunner::new());
/// let (execution_id, handle) = runner.launch(job, JobParameters::new().with("jobId", "J1"));
/// let execution = handle.await.unwrap();
/// println!("{execution_id}: {}", execution.status);
/// # }
/// ```
pub struct JobRunner {
    next_id: AtomicU64,
    listeners: Vec<Arc<dyn JobExecutionListener>>,
    running: RunnerHandle,
}

/// Stop control over a runner's in-flight executions
///
/// Cloning shares the same set of executions, so the handle can be given to
/// a listener before the runner that owns it is built.
#[derive(Debug, Clone, Default)]
pub struct RunnerHandle {
    senders: Arc<DashMap<ExecutionId, watch::Sender<bool>>>,
}

impl RunnerHandle {
    fn insert(&self, execution_id: ExecutionId) -> StopSignal {
        let (sender, receiver) = watch::channel(false);
        self.senders.insert(execution_id, sender);
        StopSignal::new(receiver)
    }

    fn remove(&self, execution_id: ExecutionId) {
        self.senders.remove(&execution_id);
    }

    pub fn is_running(&self, execution_id: ExecutionId) -> bool {
        self.senders.contains_key(&execution_id)
    }
}

#[async_trait]
impl JobOperator for RunnerHandle {
    async fn stop(&self, execution_id: ExecutionId) -> Result<bool> {
        match self.senders.get(&execution_id) {
            Some(sender) => {
                sender.send_replace(true);
                tracing::info!(execution_id = %execution_id, "Stop requested");
                Ok(true)
            }
            None => {
                tracing::debug!(execution_id = %execution_id, "Stop requested for finished execution");
                Ok(false)
            }
        }
    }

    async fn wait_for_termination(&self, execution_id: ExecutionId) -> Result<()> {
        let receiver = self
            .senders
            .get(&execution_id)
            .map(|sender| sender.subscribe());

        // The sender is dropped when the execution leaves the running set
        if let Some(mut receiver) = receiver {
            while receiver.changed().await.is_ok() {}
        }
        Ok(())
    }
}

impl JobRunner {
    pub fn new() -> Self {
        Self::with_handle(RunnerHandle::default())
    }

    /// Runner whose executions are controlled through `handle`
    pub fn with_handle(handle: RunnerHandle) -> Self {
        Self {
            next_id: AtomicU64::new(1),
            listeners: Vec::new(),
            running: handle,
        }
    }

    pub fn with_listener(mut self, listener: Arc<dyn JobExecutionListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn handle(&self) -> RunnerHandle {
        self.running.clone()
    }

    /// Allocate an execution without running it
    ///
    /// The stop handle is registered immediately, so a stop requested before
    /// [`run_execution`](Self::run_execution) starts is honoured.
    pub fn prepare(&self, job_name: &str, parameters: JobParameters) -> JobExecution {
        let id = ExecutionId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.running.insert(id);
        JobExecution::new(id, job_name, parameters)
    }

    /// Allocate an execution and run it on the current task
    pub async fn run(&self, job: Arc<dyn Job>, parameters: JobParameters) -> JobExecution {
        let execution = self.prepare(job.name(), parameters);
        self.run_execution(job, execution).await
    }

    /// Allocate an execution and run it on a new task
    pub fn launch(
        self: &Arc<Self>,
        job: Arc<dyn Job>,
        parameters: JobParameters,
    ) -> (ExecutionId, JoinHandle<JobExecution>) {
        let execution = self.prepare(job.name(), parameters);
        let id = execution.id;
        let runner = Arc::clone(self);
        let handle = tokio::spawn(async move { runner.run_execution(job, execution).await });
        (id, handle)
    }

    /// Run a prepared execution through before-listeners, body and after-listeners
    pub async fn run_execution(&self, job: Arc<dyn Job>, mut execution: JobExecution) -> JobExecution {
        let started = Instant::now();
        let stop = self.stop_signal(execution.id);
        let job_label = execution
            .job_id()
            .map(|id| id.to_string())
            .unwrap_or_else(|| "<none>".to_string());

        log_job_start!(job_label, execution.id, job.name());

        execution.mark_started();
        for listener in &self.listeners {
            listener.on_before(&execution).await;
        }

        let result = if stop.is_stop_requested() {
            Ok(())
        } else {
            job.execute(&mut execution, stop.clone()).await
        };

        match result {
            Ok(()) if stop.is_stop_requested() => execution.mark_stopped(),
            Ok(()) => execution.mark_completed(),
            Err(e) => {
                tracing::error!(
                    execution_id = %execution.id,
                    job_name = job.name(),
                    error = %e,
                    "Job execution failed"
                );
                execution.add_failure(e);
                execution.mark_failed();
            }
        }

        self.running.remove(execution.id);

        for listener in &self.listeners {
            listener.on_after(&execution).await;
        }

        log_job_complete!(job_label, execution.status, started.elapsed());
        execution
    }

    /// Whether an execution is still in flight
    pub fn is_running(&self, execution_id: ExecutionId) -> bool {
        self.running.is_running(execution_id)
    }

    fn stop_signal(&self, execution_id: ExecutionId) -> StopSignal {
        let existing = self
            .running
            .senders
            .get(&execution_id)
            .map(|sender| sender.subscribe());
        match existing {
            Some(receiver) => StopSignal::new(receiver),
            None => self.running.insert(execution_id),
        }
    }
}

impl Default for JobRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobOperator for JobRunner {
    async fn stop(&self, execution_id: ExecutionId) -> Result<bool> {
        self.running.stop(execution_id).await
    }

    async fn wait_for_termination(&self, execution_id: ExecutionId) -> Result<()> {
        self.running.wait_for_termination(execution_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::job::execution::keys;
    use crate::domain::{BatchStatus, FerryError};
    use std::sync::Mutex;
    use std::time::Duration;

    struct RecordingListener {
        events: Mutex<Vec<(String, BatchStatus)>>,
    }

    #[async_trait]
    impl JobExecutionListener for RecordingListener {
        async fn on_before(&self, execution: &JobExecution) {
            self.events
                .lock()
                .unwrap()
                .push(("before".to_string(), execution.status));
        }

        async fn on_after(&self, execution: &JobExecution) {
            self.events
                .lock()
                .unwrap()
                .push(("after".to_string(), execution.status));
        }
    }

    struct FixedJob(Option<&'static str>);

    #[async_trait]
    impl Job for FixedJob {
        fn name(&self) -> &str {
            "fixedJob"
        }

        async fn execute(&self, execution: &mut JobExecution, _stop: StopSignal) -> Result<()> {
            execution.context.put(keys::OUTPUT_FILES_IN_STORAGE, "a.csv");
            match self.0 {
                Some(message) => Err(FerryError::Io(message.to_string())),
                None => Ok(()),
            }
        }
    }

    /// Spins until stopped
    struct WaitingJob;

    #[async_trait]
    impl Job for WaitingJob {
        fn name(&self) -> &str {
            "waitingJob"
        }

        async fn execute(&self, _execution: &mut JobExecution, stop: StopSignal) -> Result<()> {
            while !stop.is_stop_requested() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            Ok(())
        }
    }

    fn params() -> JobParameters {
        JobParameters::new().with(keys::JOB_ID, "J1")
    }

    #[tokio::test]
    async fn test_listeners_see_started_then_terminal_status() {
        let listener = Arc::new(RecordingListener {
            events: Mutex::new(Vec::new()),
        });
        let runner = JobRunner::new().with_listener(listener.clone());

        let execution = runner.run(Arc::new(FixedJob(None)), params()).await;

        assert_eq!(execution.status, BatchStatus::Completed);
        assert_eq!(
            *listener.events.lock().unwrap(),
            vec![
                ("before".to_string(), BatchStatus::Started),
                ("after".to_string(), BatchStatus::Completed),
            ]
        );
        assert!(!runner.is_running(execution.id));
    }

    #[tokio::test]
    async fn test_failure_is_recorded() {
        let runner = JobRunner::new();
        let execution = runner
            .run(Arc::new(FixedJob(Some("disk full"))), params())
            .await;

        assert_eq!(execution.status, BatchStatus::Failed);
        assert_eq!(execution.failures().len(), 1);
        assert_eq!(execution.exit_status.exit_code, "FAILED");
    }

    #[tokio::test]
    async fn test_execution_ids_are_unique() {
        let runner = JobRunner::new();
        let first = runner.prepare("a", params());
        let second = runner.prepare("a", params());
        assert_ne!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_stop_ends_launched_execution() {
        let runner = Arc::new(JobRunner::new());
        let (id, handle) = runner.launch(Arc::new(WaitingJob), params());

        assert!(runner.stop(id).await.unwrap());
        let execution = handle.await.unwrap();

        assert_eq!(execution.status, BatchStatus::Stopped);
        assert!(!runner.stop(id).await.unwrap());
    }

    #[tokio::test]
    async fn test_wait_for_termination_returns_after_stop() {
        let runner = Arc::new(JobRunner::new());
        let (id, handle) = runner.launch(Arc::new(WaitingJob), params());

        runner.stop(id).await.unwrap();
        tokio::time::timeout(Duration::from_secs(5), runner.wait_for_termination(id))
            .await
            .unwrap()
            .unwrap();

        assert!(!runner.is_running(id));
        assert_eq!(handle.await.unwrap().status, BatchStatus::Stopped);
    }

    #[tokio::test]
    async fn test_shared_handle_stops_execution() {
        let handle = RunnerHandle::default();
        let runner = Arc::new(JobRunner::with_handle(handle.clone()));
        let (id, join) = runner.launch(Arc::new(WaitingJob), params());

        assert!(handle.is_running(id));
        assert!(handle.stop(id).await.unwrap());

        assert_eq!(join.await.unwrap().status, BatchStatus::Stopped);
        assert!(!handle.is_running(id));
    }

    #[test]
    fn test_never_signal_is_not_raised() {
        assert!(!StopSignal::never().is_stop_requested());
    }
}
