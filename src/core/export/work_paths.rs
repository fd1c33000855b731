//! Temp file layout for jobs
//!
//! Every job stages its files under `<work_dir>/<app_name>/` with names that
//! start with `<jobId>-<baseName>`, so deleting by that prefix only touches
//! the job's own files.

use crate::domain::JobId;
use std::path::{Path, PathBuf};

/// Separator between the job id and the base name
pub const JOB_ID_SEPARATOR: &str = "-";

/// Suffix of the staged record file
pub const RECORDS_SUFFIX: &str = ".jsonl";

/// Suffix of the staged errors file
pub const ERRORS_SUFFIX: &str = "_errors.csv";

/// Directory all temp files of the application live in
pub fn app_work_dir(work_dir: &Path, app_name: &str) -> PathBuf {
    work_dir.join(app_name)
}

/// File name without directory or extension
pub fn base_name(file_name: &str) -> &str {
    let name = Path::new(file_name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(file_name);
    match name.rfind('.') {
        Some(0) | None => name,
        Some(dot) => &name[..dot],
    }
}

/// Temp path prefix for one job: `<work_dir>/<app_name>/<jobId>-<baseName>`
pub fn temp_output_path(work_dir: &Path, app_name: &str, job_id: &JobId, file_name: &str) -> PathBuf {
    app_work_dir(work_dir, app_name).join(format!(
        "{}{}{}",
        job_id,
        JOB_ID_SEPARATOR,
        base_name(file_name)
    ))
}

/// Append `suffix` to the file name of `prefix`
pub fn with_suffix(prefix: &Path, suffix: &str) -> PathBuf {
    let mut path = prefix.as_os_str().to_owned();
    path.push(suffix);
    PathBuf::from(path)
}
