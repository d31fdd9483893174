//! Completeness Validator.
//!
//! Checks, in order: at least one file, at least one group, no file above the
//! size limit, and at least one group fully covered by the files.

use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::contract::FileGroupSet;
use crate::error::{Result, RunError};

/// 100 MiB
pub const MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// [`validate`] on the blocking pool, since the size check stats every file.
pub async fn validate_files(files: &[PathBuf], groups: &FileGroupSet) -> Result<()> {
    let files = files.to_vec();
    let groups = groups.clone();
    tokio::task::spawn_blocking(move || validate(&files, &groups))
        .await
        .map_err(|e| RunError::Internal(format!("validation task failed: {e}")))?
}

pub fn validate<P: AsRef<Path>>(files: &[P], groups: &FileGroupSet) -> Result<()> {
    validate_with_limit(files, groups, MAX_FILE_SIZE)
}

pub fn validate_with_limit<P: AsRef<Path>>(
    files: &[P],
    groups: &FileGroupSet,
    max_file_size: u64,
) -> Result<()> {
    if files.is_empty() {
        error!("[VALIDATE] No files found to upload");
        return Err(RunError::NoFiles);
    }

    if groups.is_empty() {
        error!("[VALIDATE] Validation reached with an empty group set");
        return Err(RunError::Internal("no file groups to validate against".into()));
    }

    let oversized = oversized_files(files, max_file_size)?;
    if !oversized.is_empty() {
        error!(count = oversized.len(), limit = max_file_size, "[VALIDATE] Files exceed the size limit");
        return Err(RunError::OversizedFiles {
            limit: max_file_size,
            paths: oversized,
        });
    }

    let names: Vec<String> = files
        .iter()
        .map(|f| f.as_ref().to_string_lossy().into_owned())
        .collect();
    if !groups.is_satisfied_by(&names) {
        error!(groups = %groups, "[VALIDATE] No file group is fully covered");
        return Err(RunError::IncompleteGroups(groups.clone()));
    }

    info!(files = files.len(), "All checks passed.");
    Ok(())
}

fn oversized_files<P: AsRef<Path>>(files: &[P], max_file_size: u64) -> Result<Vec<PathBuf>> {
    let mut oversized = Vec::new();
    for file in files {
        let path = file.as_ref();
        let size = std::fs::metadata(path)
            .map_err(|e| RunError::io(path, e))?
            .len();
        if size > max_file_size {
            oversized.push(path.to_path_buf());
        }
    }
    Ok(oversized)
}
