//! Job execution machinery
//!
//! - [`JobRunner`]: allocates execution ids, drives status transitions,
//!   calls [`JobExecutionListener`]s and honours stop requests
//! - [`ChunkStep`]: pulls from a paginated source, processes and writes in chunks
//! - [`JobExecution`]: the state of one run attempt

pub mod execution;
pub mod listener;
pub mod runner;
pub mod step;

pub use execution::{keys, ExecutionContext, Failure, JobExecution, JobParameters, StepExecution};
pub use listener::JobExecutionListener;
pub use runner::{Job, JobRunner, RunnerHandle, StopSignal};
pub use step::{ChunkStep, ItemProcessor, ItemWriter};
