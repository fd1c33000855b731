//! Domain error types
//!
//! This module defines the error hierarchy for Ferry. Errors are domain-specific
//! and don't expose third-party types.

use thiserror::Error;

/// Main Ferry error type
///
/// This is the primary error type used throughout the application.
#[derive(Debug, Error)]
pub enum FerryError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Upstream call failed (network, 5xx, unexpected payload)
    #[error("Remote service unavailable: {0}")]
    RemoteUnavailable(#[from] RemoteError),

    /// Query succeeded but matched nothing
    #[error("{kind} not found: {key}")]
    NotFound {
        /// Reference kind or collection that was queried
        kind: String,
        /// Id or name that was looked up
        key: String,
    },

    /// Job request without a usable job id
    #[error("Malformed job request: {0}")]
    MalformedJobRequest(String),

    /// A single record failed while the job kept running
    #[error("Record {record} failed: {reason}")]
    PartialFailure {
        /// Identifier of the failed record
        record: String,
        /// What went wrong
        reason: String,
    },

    /// Temp file deletion failed
    #[error("Cleanup failed: {0}")]
    Cleanup(String),

    /// Status message could not be delivered
    #[error("Publication failed: {0}")]
    Publication(String),

    /// Rollback could not be carried out
    #[error("Rollback error: {0}")]
    Rollback(String),

    /// A paginated source failed earlier and can no longer be read
    #[error("Source aborted: {0}")]
    SourceAborted(String),

    /// A job step failed; wraps the underlying cause
    #[error("Step '{step}' failed")]
    Step {
        /// Name of the failing step
        step: String,
        /// Underlying cause
        #[source]
        source: Box<FerryError>,
    },

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),
}

impl FerryError {
    /// Creates a not-found error for a kind and key
    pub fn not_found(kind: impl Into<String>, key: impl Into<String>) -> Self {
        FerryError::NotFound {
            kind: kind.into(),
            key: key.into(),
        }
    }

    /// Creates a per-record failure
    pub fn partial(record: impl Into<String>, reason: impl ToString) -> Self {
        FerryError::PartialFailure {
            record: record.into(),
            reason: reason.to_string(),
        }
    }

    /// Wraps an error as the cause of a failed step
    pub fn step(step: impl Into<String>, source: FerryError) -> Self {
        FerryError::Step {
            step: step.into(),
            source: Box::new(source),
        }
    }

    /// Whether this error means the lookup matched nothing
    pub fn is_not_found(&self) -> bool {
        matches!(self, FerryError::NotFound { .. })
    }
}

/// Remote service errors
///
/// Errors that occur when talking to upstream HTTP services.
/// These errors don't expose the HTTP client's types.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Failed to reach the service
    #[error("Failed to connect: {0}")]
    ConnectionFailed(String),

    /// Invalid response payload
    #[error("Invalid response from server: {0}")]
    InvalidResponse(String),

    /// Server error (5xx)
    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    /// Client error (4xx other than 404)
    #[error("Client error: {status} - {message}")]
    ClientError { status: u16, message: String },

    /// Timeout
    #[error("Request timeout: {0}")]
    Timeout(String),
}

impl From<std::io::Error> for FerryError {
    fn from(err: std::io::Error) -> Self {
        FerryError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for FerryError {
    fn from(err: serde_json::Error) -> Self {
        FerryError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for FerryError {
    fn from(err: toml::de::Error) -> Self {
        FerryError::Configuration(format!("TOML parse error: {err}"))
    }
}
