//! Core business logic for Ferry.
//!
//! This module contains the job machinery and the batch-side services that
//! surround an export run.
//!
//! # Modules
//!
//! - [`export`] - Export job, enrichment, staged output and summaries
//! - [`job`] - Job runner, chunk step and execution state
//! - [`lifecycle`] - Job-id tracking, acknowledgements and completion notices
//! - [`pagination`] - Offset and cursor paginated sources
//! - [`reference`] - Bounded, per-kind cache of reference entities
//! - [`rollback`] - Stop a running job and restore its snapshot
//!
//! # Export Workflow
//!
//! 1. **Track**: Bind the job id to the new execution id
//! 2. **Page**: Pull records from the remote collection one page at a time
//! 3. **Enrich**: Resolve reference ids through the cache
//! 4. **Stage**: Write JSON lines and an errors CSV under the work directory
//! 5. **Store**: Copy the staged files to output storage
//! 6. **Notify**: Acknowledge, clean up temp files, publish the job status
//!
//! # Example
//!
//! ```rust,no_run
//! use ferry::core::job::{JobParameters, JobRunner};
//! use ferry::core::lifecycle::JobLifecycleTracker;
//! use std::sync::Arc;
//!
//! # async fn example(job: Arc<dyn ferry::core::job::Job>) {
//! let tracker = JobLifecycleTracker::new();
//! let runner = JobRunner::new();
//!
//! let params = JobParameters::new().with("jobId", "J1");
//! let execution = runner.prepare(job.name(), params);
//! if let Some(job_id) = execution.job_id() {
//!     tracker.register_execution(job_id, execution.id);
//! }
//! let execution = runner.run_execution(job, execution).await;
//!
//! println!("{}: {}", execution.job_name, execution.status);
//! # }
//! ```

pub mod export;
pub mod job;
pub mod lifecycle;
pub mod pagination;
pub mod reference;
pub mod rollback;
