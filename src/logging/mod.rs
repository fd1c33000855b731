//! Logging and observability
//!
//! This module provides structured logging with support for:
//! - JSON-formatted file logs
//! - Configurable log levels
//! - Local file logging with rotation
//!
//! # Example
//!
//! ```no_run
//! use ferry::logging::init_logging;
//! use ferry::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Worker started");
//! ```

pub mod structured;

// Re-export commonly used items
pub use structured::{init_logging, LoggingGuard};

/// Log the start of a job execution
///
/// # Example
///
/// ```no_run
/// use ferry::log_job_start;
/// use ferry::domain::{ExecutionId, JobId};
///
/// let job_id = JobId::new("J1").unwrap();
/// log_job_start!(&job_id, ExecutionId::new(1), "circulationLogJob");
/// ```
#[macro_export]
macro_rules! log_job_start {
    ($job_id:expr, $execution_id:expr, $job_name:expr) => {
        tracing::info!(
            job_id = %$job_id,
            execution_id = %$execution_id,
            job_name = $job_name,
            "Starting job execution"
        );
    };
}

/// Log the completion of a job execution
///
/// # Example
///
/// ```no_run
/// use ferry::log_job_complete;
/// use ferry::domain::{BatchStatus, JobId};
/// use std::time::Duration;
///
/// let job_id = JobId::new("J1").unwrap();
/// log_job_complete!(&job_id, BatchStatus::Completed, Duration::from_secs(3));
/// ```
#[macro_export]
macro_rules! log_job_complete {
    ($job_id:expr, $status:expr, $duration:expr) => {
        tracing::info!(
            job_id = %$job_id,
            status = %$status,
            duration_ms = $duration.as_millis(),
            "Job execution finished"
        );
    };
}

/// Log one page fetched by a paginated source
///
/// # Example
///
/// ```no_run
/// use ferry::log_page_fetched;
///
/// log_page_fetched!("audit-log", "offset 200", 100);
/// ```
#[macro_export]
macro_rules! log_page_fetched {
    ($source:expr, $position:expr, $count:expr) => {
        tracing::debug!(
            source = %$source,
            position = %$position,
            records = $count,
            "Fetched page"
        );
    };
}

/// Log a retry attempt
///
/// # Example
///
/// ```no_run
/// use ferry::log_retry_attempt;
///
/// log_retry_attempt!(2, 3, "Connection timeout");
/// ```
#[macro_export]
macro_rules! log_retry_attempt {
    ($attempt:expr, $max_attempts:expr, $reason:expr) => {
        tracing::warn!(
            attempt = $attempt,
            max_attempts = $max_attempts,
            reason = %$reason,
            "Retrying operation"
        );
    };
}

#[cfg(test)]
mod tests {
    use crate::domain::{BatchStatus, ExecutionId, JobId};
    use std::time::Duration;

    #[test]
    fn test_macros_expand_without_subscriber() {
        let job_id = JobId::new("J1").unwrap();
        log_job_start!(&job_id, ExecutionId::new(7), "exportJob");
        log_job_complete!(&job_id, BatchStatus::Completed, Duration::from_millis(5));
        log_page_fetched!("audit-log", 200, 100usize);
        log_retry_attempt!(1, 3, "timeout");
    }
}
