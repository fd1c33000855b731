//! Hooks invoked around every job execution

use super::execution::JobExecution;
use async_trait::async_trait;

/// Observer called by the [`JobRunner`](super::JobRunner) before the job
/// body starts and after it has finished
///
/// Both hooks run on the execution's own task and never overlap for the
/// same execution. They cannot fail the job: implementations log their own
/// errors.
#[async_trait]
pub trait JobExecutionListener: Send + Sync {
    async fn on_before(&self, _execution: &JobExecution) {}

    async fn on_after(&self, _execution: &JobExecution) {}
}
