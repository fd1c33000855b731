use super::{JobOperator, SnapshotRestorer};
use crate::core::job::{JobExecution, JobExecutionListener};
use crate::core::lifecycle::JobLifecycleTracker;
use crate::domain::{BatchStatus, ExecutionId, FerryError, JobId, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(30);

/// What a rollback request did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RollbackOutcome {
    /// No execution was tracked for the job
    NothingToRollBack,
    RolledBack {
        execution_id: ExecutionId,
        message: String,
    },
}

impl RollbackOutcome {
    /// Human-readable result
    pub fn message(&self) -> &str {
        match self {
            RollbackOutcome::NothingToRollBack => "nothing to roll back",
            RollbackOutcome::RolledBack { message, .. } => message,
        }
    }
}

impl fmt::Display for RollbackOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Tracks update jobs and rolls them back on request
pub struct RollbackCoordinator {
    tracker: Arc<JobLifecycleTracker>,
    snapshots: DashMap<JobId, String>,
    operator: Arc<dyn JobOperator>,
    restorer: Arc<dyn SnapshotRestorer>,
    stop_timeout: Duration,
}

impl RollbackCoordinator {
    pub fn new(
        tracker: Arc<JobLifecycleTracker>,
        operator: Arc<dyn JobOperator>,
        restorer: Arc<dyn SnapshotRestorer>,
    ) -> Self {
        Self {
            tracker,
            snapshots: DashMap::new(),
            operator,
            restorer,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
        }
    }

    /// How long to wait for a stopped execution before restoring anyway
    pub fn stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    pub fn record_snapshot(&self, job_id: JobId, snapshot: impl Into<String>) {
        let snapshot = snapshot.into();
        tracing::debug!(job_id = %job_id, snapshot = %snapshot, "Recorded rollback snapshot");
        self.snapshots.insert(job_id, snapshot);
    }

    pub fn snapshot(&self, job_id: &JobId) -> Option<String> {
        self.snapshots.get(job_id).map(|s| s.value().clone())
    }

    pub fn bind_execution(&self, execution_id: ExecutionId, job_id: JobId) {
        self.tracker.register_execution(job_id, execution_id);
    }

    /// Stop the job's tracked execution and restore its snapshot
    ///
    /// The tracked execution is taken atomically, so of several concurrent
    /// calls for one job only the first restores. If stopping or restoring
    /// fails, the binding and the snapshot stay recorded and a later call
    /// can try again.
    ///
    /// # Errors
    ///
    /// Returns [`FerryError::Rollback`] when no snapshot was recorded or the
    /// restore fails.
    pub async fn stop_and_rollback(&self, job_id: &JobId) -> Result<RollbackOutcome> {
        let Some(execution_id) = self.tracker.take(job_id) else {
            tracing::info!(job_id = %job_id, "No tracked execution, nothing to roll back");
            return Ok(RollbackOutcome::NothingToRollBack);
        };

        match self.roll_back(job_id, execution_id).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                let reinstated = self.tracker.reinstate(job_id.clone(), execution_id);
                tracing::warn!(
                    job_id = %job_id,
                    execution_id = %execution_id,
                    reinstated,
                    error = %e,
                    "Rollback failed, record kept for retry"
                );
                Err(e)
            }
        }
    }

    async fn roll_back(&self, job_id: &JobId, execution_id: ExecutionId) -> Result<RollbackOutcome> {
        let stopped = self.operator.stop(execution_id).await?;
        if stopped {
            match tokio::time::timeout(
                self.stop_timeout,
                self.operator.wait_for_termination(execution_id),
            )
            .await
            {
                Ok(result) => result?,
                Err(_) => tracing::warn!(
                    job_id = %job_id,
                    execution_id = %execution_id,
                    timeout_secs = self.stop_timeout.as_secs(),
                    "Execution did not stop in time, restoring anyway"
                ),
            }
        }

        let Some(snapshot) = self.snapshot(job_id) else {
            return Err(FerryError::Rollback(format!(
                "No snapshot recorded for job {job_id}"
            )));
        };

        let restored = self
            .restorer
            .restore(job_id, &snapshot)
            .await
            .map_err(|e| FerryError::Rollback(format!("Restoring {snapshot} failed: {e}")))?;
        self.snapshots.remove_if(job_id, |_, recorded| *recorded == snapshot);

        tracing::info!(
            job_id = %job_id,
            execution_id = %execution_id,
            restored = %restored,
            "Rolled back job"
        );

        let message = if stopped {
            format!("Execution {execution_id} of job {job_id} was stopped and {snapshot} restored to {restored}")
        } else {
            format!("Execution {execution_id} of job {job_id} had already finished; {snapshot} restored to {restored}")
        };
        Ok(RollbackOutcome::RolledBack {
            execution_id,
            message,
        })
    }

    /// Forget the job after normal completion
    pub fn release(&self, job_id: &JobId) {
        self.tracker.forget(job_id);
        self.snapshots.remove(job_id);
    }
}

#[async_trait]
impl JobExecutionListener for RollbackCoordinator {
    async fn on_after(&self, execution: &JobExecution) {
        if execution.status != BatchStatus::Completed {
            return;
        }
        let Some(job_id) = execution.job_id() else {
            return;
        };
        if self.tracker.forget_execution(&job_id, execution.id) {
            self.snapshots.remove(&job_id);
            tracing::debug!(job_id = %job_id, "Released rollback record");
        }
    }
}
