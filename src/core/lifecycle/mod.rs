//! Job lifecycle: execution tracking, acknowledgments and completion notices

pub mod acknowledgment;
pub mod notifier;
pub mod tracker;

pub use acknowledgment::{AcknowledgementRegistry, Acknowledgment, OneshotAcknowledgment};
pub use notifier::{
    cleanup_temp_files, describe, parse_output_files, root_cause, CleanupReport, DescribedStep,
    JobCompletionNotifier,
};
pub use tracker::JobLifecycleTracker;
