//! Export jobs
//!
//! This module provides the export job for Ferry, including:
//! - Staged output writing (JSON lines plus an errors CSV)
//! - Reference enrichment of records
//! - Temp file layout under the work directory
//! - Summary and reporting

pub mod enrich;
pub mod job;
pub mod summary;
pub mod work_paths;
pub mod writer;

pub use enrich::{record_id, EnrichProcessor};
pub use job::ExportJob;
pub use summary::ExportSummary;
pub use work_paths::temp_output_path;
pub use writer::StagedOutputWriter;
