//! Domain identifier types with validation
//!
//! Newtype wrappers for job and execution identifiers so the two can't be
//! mixed up at call sites.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Job identifier newtype wrapper
///
/// Identifies one logical unit of export/update work, independent of the
/// execution attempts made for it. Usually a UUID, but any non-blank string
/// is accepted.
///
/// # Examples
///
/// ```
/// use ferry::domain::ids::JobId;
/// use std::str::FromStr;
///
/// let job_id = JobId::from_str("1f6bbd4c-1f0a-4a8e-a8fb-3d5a5c1d2f10").unwrap();
/// assert_eq!(job_id.as_str(), "1f6bbd4c-1f0a-4a8e-a8fb-3d5a5c1d2f10");
/// assert!(JobId::new("   ").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId(String);

impl JobId {
    /// Creates a new JobId, rejecting blank input
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("Job ID cannot be blank".to_string());
        }
        Ok(Self(id.trim().to_string()))
    }

    /// Generates a random UUID-based job id
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Returns the job id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for JobId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for JobId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Execution identifier
///
/// One concrete run attempt of a job. Allocated by the job runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExecutionId(u64);

impl ExecutionId {
    /// Wraps a raw execution number
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw execution number
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
