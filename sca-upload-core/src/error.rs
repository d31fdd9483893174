//! Error taxonomy for a single upload run.
//!
//! Every stage either completes or returns exactly one [`RunError`]; nothing in
//! this crate terminates the process. The binary maps the first error to a
//! failing exit status.

use std::path::PathBuf;
use thiserror::Error;

use crate::contract::FileGroupSet;

/// Broad class of a [`RunError`], used for reporting and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Configuration,
    Transport,
    Validation,
    Parse,
    Internal,
}

#[derive(Error, Debug)]
pub enum RunError {
    #[error("No API key provided. Please set the api_key input in your workflow and repository secrets.")]
    MissingApiKey,

    #[error("Invalid API key format. Check your apiKey or create a new one.")]
    MalformedApiKey,

    #[error("The API key provided has expired (expired on {expired_on}). Please create a new one in the organization settings. After creating a new one, make sure to update the API key in the GitHub Secrets.")]
    ExpiredApiKey { expired_on: chrono::NaiveDate },

    #[error("Invalid API response: {0}")]
    MalformedGroups(String),

    #[error("Missing configuration value: {0}")]
    MissingConfig(&'static str),

    #[error("Invalid excluded path pattern '{pattern}': {message}")]
    InvalidExclusion { pattern: String, message: String },

    #[error("Connection with Server failed. Please try again later.")]
    ServerUnreachable,

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Failed to parse JSON response: {0}")]
    InvalidJson(String),

    #[error("Failed to upload files. Status: {status}, Response: {body}, res: {reason}")]
    UploadFailed {
        status: u16,
        body: String,
        reason: String,
    },

    #[error("Upload failed - Request error: {0}")]
    UploadRequest(String),

    #[error("Failed to post comment: {0}")]
    NotifyFailed(String),

    #[error("No files found to upload.")]
    NoFiles,

    #[error(
        "The following files are larger than the maximum file size of {limit} bytes: {}",
        join_paths(.paths)
    )]
    OversizedFiles { limit: u64, paths: Vec<PathBuf> },

    #[error(
        "Not all necessary files are present in the selected scope. Please ensure at least one combination of following types is included in the configured paths: \n{0}"
    )]
    IncompleteGroups(FileGroupSet),

    #[error("Internal Error. Please check for update of action or contact us. ({0})")]
    Internal(String),

    #[error("Failed to access {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RunError {
    pub fn class(&self) -> ErrorClass {
        match self {
            RunError::MissingApiKey
            | RunError::MalformedApiKey
            | RunError::ExpiredApiKey { .. }
            | RunError::MalformedGroups(_)
            | RunError::MissingConfig(_)
            | RunError::InvalidExclusion { .. } => ErrorClass::Configuration,
            RunError::ServerUnreachable
            | RunError::RequestFailed(_)
            | RunError::UploadFailed { .. }
            | RunError::UploadRequest(_)
            | RunError::NotifyFailed(_) => ErrorClass::Transport,
            RunError::InvalidJson(_) => ErrorClass::Parse,
            RunError::NoFiles | RunError::OversizedFiles { .. } | RunError::IncompleteGroups(_) => {
                ErrorClass::Validation
            }
            RunError::Internal(_) | RunError::Io { .. } => ErrorClass::Internal,
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RunError::Io {
            path: path.into(),
            source,
        }
    }
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, RunError>;
