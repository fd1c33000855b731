//! Acknowledgment of the inbound message that started a job

use crate::domain::JobId;
use dashmap::DashMap;
use tokio::sync::oneshot;

/// Handle that confirms the originating message was fully processed
///
/// Acknowledging consumes the handle, so it can happen at most once.
pub trait Acknowledgment: Send + Sync {
    fn acknowledge(self: Box<Self>);
}

/// Acknowledgment delivered over a oneshot channel
///
/// The receiving side resolves once the job has finished and its
/// acknowledgment was released, or errors if the handle was dropped
/// without acknowledging.
pub struct OneshotAcknowledgment {
    sender: oneshot::Sender<()>,
}

impl OneshotAcknowledgment {
    pub fn channel() -> (Self, oneshot::Receiver<()>) {
        let (sender, receiver) = oneshot::channel();
        (Self { sender }, receiver)
    }
}

impl Acknowledgment for OneshotAcknowledgment {
    fn acknowledge(self: Box<Self>) {
        // Receiver may have given up waiting
        let _ = self.sender.send(());
    }
}

/// Pending acknowledgments keyed by job id
#[derive(Default)]
pub struct AcknowledgementRegistry {
    pending: DashMap<JobId, Box<dyn Acknowledgment>>,
}

impl AcknowledgementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Park an acknowledgment until the job finishes
    ///
    /// A handle already parked for the same job is dropped unacknowledged.
    pub fn put(&self, job_id: JobId, acknowledgment: Box<dyn Acknowledgment>) {
        if self.pending.insert(job_id.clone(), acknowledgment).is_some() {
            tracing::warn!(job_id = %job_id, "Replaced pending acknowledgment");
        }
    }

    /// Remove the acknowledgment for `job_id`, if one is parked
    pub fn take(&self, job_id: &JobId) -> Option<Box<dyn Acknowledgment>> {
        self.pending.remove(job_id).map(|(_, ack)| ack)
    }

    pub fn contains(&self, job_id: &JobId) -> bool {
        self.pending.contains_key(job_id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
