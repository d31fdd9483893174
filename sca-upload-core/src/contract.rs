//! # contract: data model and network seams of the upload pipeline
//!
//! This module holds the plain data types every stage passes around
//! ([`FileTypeGroup`], [`FileGroupSet`], [`UploadIdentity`], [`RunReport`]) and the
//! three async traits behind which all network traffic lives:
//!
//! - [`GroupFetcher`]: retrieves the required file-type groups
//! - [`FileUploader`]: sends the resolved files as one multipart request
//! - [`Notifier`]: reports the server response back to the code-review system
//!
//! plus the synchronous [`OutputSink`] for machine-readable step outputs.
//!
//! The traits are annotated for `mockall` so the stage driver can be tested
//! without a server.

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;
use serde::{Deserialize, Serialize};

use crate::error::RunError;

/// File-type suffixes that must all be present together for a scan to be useful.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileTypeGroup(Vec<String>);

impl FileTypeGroup {
    pub fn new(types: Vec<String>) -> Self {
        Self(types)
    }

    pub fn types(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when every type in the group matches at least one of `files`.
    pub fn is_covered_by<S: AsRef<str>>(&self, files: &[S]) -> bool {
        self.0
            .iter()
            .all(|ty| files.iter().any(|f| matches_type(f.as_ref(), ty)))
    }
}

impl fmt::Display for FileTypeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[ {} ]", self.0.join(", "))
    }
}

/// Alternative groups returned by the server; covering any one group in full is enough.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileGroupSet(Vec<FileTypeGroup>);

impl FileGroupSet {
    pub fn new(groups: Vec<FileTypeGroup>) -> Self {
        Self(groups)
    }

    pub fn groups(&self) -> &[FileTypeGroup] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Deduplicated union of all types, in first-seen order.
    pub fn unique_types(&self) -> Vec<String> {
        let mut unique: Vec<String> = Vec::new();
        for ty in self.0.iter().flat_map(|g| g.types()) {
            if !unique.contains(ty) {
                unique.push(ty.clone());
            }
        }
        unique
    }

    /// Exists a group such that every one of its types matches some file.
    pub fn is_satisfied_by<S: AsRef<str>>(&self, files: &[S]) -> bool {
        self.0.iter().any(|g| g.is_covered_by(files))
    }
}

impl fmt::Display for FileGroupSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        f.write_str(&lines.join("\n"))
    }
}

/// Suffix a file must end with to count as `file_type`.
///
/// Types may arrive glob-style (`*.pdf`) or bare (`.pdf`); leading `*` are dropped.
pub fn type_suffix(file_type: &str) -> &str {
    file_type.trim_start_matches('*')
}

/// Ends-with comparison between a path and a file type.
pub fn matches_type(path: &str, file_type: &str) -> bool {
    let suffix = type_suffix(file_type);
    !suffix.is_empty() && path.ends_with(suffix)
}

/// Identity fields attached to every upload envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadIdentity {
    /// `owner/repo`
    pub repository_name: String,
    pub ref_name: String,
    pub commit_hash: String,
    pub run_number: String,
    pub project_id: String,
    pub api_key: String,
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub files: Vec<PathBuf>,
    pub groups: FileGroupSet,
    pub server_response: String,
    pub key_expires_on: chrono::NaiveDate,
}

#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait GroupFetcher: Send + Sync {
    /// Fetch the required file-type groups from `url`.
    async fn fetch_groups(&self, url: &str) -> Result<FileGroupSet, RunError>;
}

#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait FileUploader: Send + Sync {
    /// Upload `files` in a single request, returning the raw response body.
    async fn upload(&self, url: &str, files: &[PathBuf]) -> Result<String, RunError>;
}

#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Report a finished run to the outside world.
    async fn notify(&self, report: &RunReport) -> Result<(), RunError>;
}

/// Machine-readable outputs of the CI step.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait OutputSink: Send + Sync {
    fn set_output(&self, name: &str, value: &str) -> Result<(), RunError>;
}
