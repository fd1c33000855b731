//! Stop-and-restore for update jobs
//!
//! An update job records the snapshot it can be restored from when it is
//! launched. [`RollbackCoordinator::stop_and_rollback`] stops the tracked
//! execution and restores that snapshot.

pub mod coordinator;

pub use coordinator::{RollbackCoordinator, RollbackOutcome};

use crate::domain::{ExecutionId, JobId, Result};
use async_trait::async_trait;

/// Control over running executions
#[async_trait]
pub trait JobOperator: Send + Sync {
    /// Request that an execution stop
    ///
    /// Returns `false` when the execution is not running.
    async fn stop(&self, execution_id: ExecutionId) -> Result<bool>;

    /// Wait until an execution is no longer running
    async fn wait_for_termination(&self, _execution_id: ExecutionId) -> Result<()> {
        Ok(())
    }
}

/// Puts the data an update job changed back the way it was
#[async_trait]
pub trait SnapshotRestorer: Send + Sync {
    /// Restore `snapshot` for `job_id`, returning where it was restored to
    async fn restore(&self, job_id: &JobId, snapshot: &str) -> Result<String>;
}
