//! Process-wide job id to execution id registry

use crate::domain::{ExecutionId, JobId};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// Maps each job id to the execution currently running it
///
/// Registration is last-writer-wins. All operations are safe to call from
/// any task.
#[derive(Debug, Default)]
pub struct JobLifecycleTracker {
    executions: DashMap<JobId, ExecutionId>,
}

impl JobLifecycleTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `job_id` to `execution_id`, returning the execution it displaced
    pub fn register_execution(
        &self,
        job_id: JobId,
        execution_id: ExecutionId,
    ) -> Option<ExecutionId> {
        let displaced = self.executions.insert(job_id.clone(), execution_id);
        if let Some(previous) = displaced {
            tracing::warn!(
                job_id = %job_id,
                previous_execution_id = %previous,
                execution_id = %execution_id,
                "Job re-registered, replacing tracked execution"
            );
        }
        displaced
    }

    pub fn lookup_execution(&self, job_id: &JobId) -> Option<ExecutionId> {
        self.executions.get(job_id).map(|entry| *entry.value())
    }

    /// Drop the binding for `job_id`, if any
    pub fn forget(&self, job_id: &JobId) {
        self.executions.remove(job_id);
    }

    /// Drop the binding only if it still points at `execution_id`
    ///
    /// Returns `true` when a binding was removed.
    pub fn forget_execution(&self, job_id: &JobId, execution_id: ExecutionId) -> bool {
        self.executions
            .remove_if(job_id, |_, tracked| *tracked == execution_id)
            .is_some()
    }

    /// Remove and return the binding in one step
    ///
    /// Of several concurrent callers for the same job id, exactly one
    /// receives the execution id.
    pub fn take(&self, job_id: &JobId) -> Option<ExecutionId> {
        self.executions.remove(job_id).map(|(_, execution_id)| execution_id)
    }

    /// Put back a binding removed by [`take`](Self::take)
    ///
    /// A binding registered in the meantime wins. Returns `true` when the
    /// binding was restored.
    pub fn reinstate(&self, job_id: JobId, execution_id: ExecutionId) -> bool {
        match self.executions.entry(job_id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(execution_id);
                true
            }
        }
    }

    pub fn len(&self) -> usize {
        self.executions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.executions.is_empty()
    }
}
