//! Domain models and types for Ferry.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`JobId`], [`ExecutionId`])
//! - **The published job status record** ([`Job`], [`BatchStatus`], [`ExitStatus`])
//! - **Error types** ([`FerryError`], [`RemoteError`])
//! - **Result type alias** ([`Result`])
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, FerryError>`]:
//!
//! ```rust
//! use ferry::domain::{FerryError, JobId, Result};
//!
//! fn parse(raw: &str) -> Result<JobId> {
//!     JobId::new(raw).map_err(FerryError::MalformedJobRequest)
//! }
//!
//! assert!(parse("J1").is_ok());
//! assert!(parse("").is_err());
//! ```

pub mod errors;
pub mod ids;
pub mod job;
pub mod result;

// Re-export commonly used types for convenience
pub use errors::{FerryError, RemoteError};
pub use ids::{ExecutionId, JobId};
pub use job::{BatchStatus, ExitStatus, Job, JobBuilder};
pub use result::Result;
