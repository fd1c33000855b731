//! Job status publication
//!
//! The [`StatusPublisher`] trait delivers [`Job`] status records to the
//! monitoring channel, keyed by job id. Implementations:
//!
//! - [`HttpStatusPublisher`]: POSTs the record as JSON to a topic endpoint
//! - [`LogStatusPublisher`]: writes the record to the log
//! - [`ChannelStatusPublisher`]: hands the record to an in-process receiver

pub mod channel;
pub mod http;

pub use channel::{ChannelStatusPublisher, PublishedStatus};
pub use http::HttpStatusPublisher;

use crate::config::{PublisherConfig, PublisherKind, RemoteConfig};
use crate::domain::{Job, JobId, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Sink for job status records
#[async_trait]
pub trait StatusPublisher: Send + Sync {
    /// Publish `job` under `key`
    ///
    /// # Errors
    ///
    /// Returns [`FerryError::Publication`](crate::domain::FerryError::Publication)
    /// when the record could not be delivered.
    async fn publish(&self, key: &JobId, job: &Job) -> Result<()>;
}

/// Publisher that only logs
#[derive(Debug, Default, Clone, Copy)]
pub struct LogStatusPublisher;

#[async_trait]
impl StatusPublisher for LogStatusPublisher {
    async fn publish(&self, key: &JobId, job: &Job) -> Result<()> {
        let payload = serde_json::to_string(job)?;
        tracing::info!(
            job_id = %key,
            batch_status = %job.batch_status,
            files = job.files.len(),
            payload = %payload,
            "Job status update"
        );
        Ok(())
    }
}

/// Build the publisher selected by configuration
pub fn create_publisher(
    config: &PublisherConfig,
    remote: &RemoteConfig,
) -> Result<Arc<dyn StatusPublisher>> {
    match config.kind {
        PublisherKind::Log => Ok(Arc::new(LogStatusPublisher)),
        PublisherKind::Http => Ok(Arc::new(HttpStatusPublisher::new(config, remote)?)),
    }
}
