//! Stage driver: key check → fetch groups → resolve files → validate → upload → notify.
//!
//! Each stage runs to completion before the next starts. The first error ends
//! the run and is returned unchanged; there is no partial success.
//!
//! # Major Types
//! - [`Pipeline`]: the network-facing collaborators of one run
//! - [`RunReport`]: what was uploaded and what the server answered

use chrono::NaiveDate;
use tracing::{error, info};

use crate::config::RunConfig;
use crate::contract::{FileUploader, GroupFetcher, Notifier, OutputSink, RunReport};
use crate::credential::validate_key;
use crate::error::{Result, RunError};
use crate::resolve::resolve;
use crate::validate::validate_files;

/// Name of the step output carrying the JSON list of uploaded files.
pub const FILES_OUTPUT: &str = "files";

pub struct Pipeline<'a> {
    pub fetcher: &'a dyn GroupFetcher,
    pub uploader: &'a dyn FileUploader,
    pub notifier: &'a dyn Notifier,
    pub output: &'a dyn OutputSink,
}

impl Pipeline<'_> {
    /// Run one full cycle, treating `today` as the current date for the key check.
    pub async fn run(&self, config: &RunConfig, today: NaiveDate) -> Result<RunReport> {
        info!("[RUN] Starting upload run");

        let key = validate_key(&config.api_key, today)?;

        let groups = self.fetcher.fetch_groups(&config.file_list_url()).await?;
        let types = groups.unique_types();
        info!(types = %types.join(", "), "[RUN] File types retrieved");

        let files = resolve(&config.repository_root, &types, &config.excluded_paths).await?;
        info!(count = files.len(), "[RUN] Files resolved");

        validate_files(&files, &groups).await?;

        let listing = serde_json::to_string(&files).map_err(|e| {
            error!(error = ?e, "[RUN] Failed to encode file list");
            RunError::Internal(format!("could not encode file list: {e}"))
        })?;
        self.output.set_output(FILES_OUTPUT, &listing)?;

        let server_response = self.uploader.upload(&config.upload_url(), &files).await?;
        info!("[RUN] Upload finished");

        let report = RunReport {
            files,
            groups,
            server_response,
            key_expires_on: key.expires_on,
        };
        self.notifier.notify(&report).await?;

        info!(files = report.files.len(), "[RUN] Run complete");
        Ok(report)
    }
}
