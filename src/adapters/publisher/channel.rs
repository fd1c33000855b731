//! In-process status publisher

use super::StatusPublisher;
use crate::domain::{FerryError, Job, JobId, Result};
use async_trait::async_trait;
use tokio::sync::mpsc;

/// One record as delivered to the receiver
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedStatus {
    pub key: JobId,
    pub job: Job,
}

/// Forwards status records over a bounded tokio channel
#[derive(Debug, Clone)]
pub struct ChannelStatusPublisher {
    sender: mpsc::Sender<PublishedStatus>,
}

impl ChannelStatusPublisher {
    /// Create a publisher and the receiver its records arrive on
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<PublishedStatus>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl StatusPublisher for ChannelStatusPublisher {
    async fn publish(&self, key: &JobId, job: &Job) -> Result<()> {
        self.sender
            .send(PublishedStatus {
                key: key.clone(),
                job: job.clone(),
            })
            .await
            .map_err(|_| FerryError::Publication("Status receiver closed".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::JobBuilder;

    #[tokio::test]
    async fn test_records_arrive_in_order() {
        let (publisher, mut receiver) = ChannelStatusPublisher::channel(4);
        let job_id = JobId::new("J1").unwrap();

        for _ in 0..2 {
            let job = JobBuilder::new(job_id.clone()).build();
            publisher.publish(&job_id, &job).await.unwrap();
        }

        assert_eq!(receiver.recv().await.unwrap().key, job_id);
        assert_eq!(receiver.recv().await.unwrap().key, job_id);
    }

    #[tokio::test]
    async fn test_closed_receiver_is_publication_error() {
        let (publisher, receiver) = ChannelStatusPublisher::channel(1);
        drop(receiver);
        let job_id = JobId::new("J1").unwrap();
        let job = JobBuilder::new(job_id.clone()).build();

        let err = publisher.publish(&job_id, &job).await.unwrap_err();
        assert!(matches!(err, FerryError::Publication(_)));
    }
}
