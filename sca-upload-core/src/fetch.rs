//! Remote Group Fetcher: one GET against the file-list endpoint.
//!
//! The response status is logged but not inspected; only the body decides
//! success. A missing response after the deadline is fatal and never retried.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::contract::{FileGroupSet, GroupFetcher};
use crate::error::{Result, RunError};

/// Deadline for the whole group-fetch exchange.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct FileListResponse {
    files: serde_json::Value,
}

pub struct HttpGroupFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpGroupFetcher {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_FETCH_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
        }
    }
}

impl Default for HttpGroupFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GroupFetcher for HttpGroupFetcher {
    async fn fetch_groups(&self, url: &str) -> Result<FileGroupSet> {
        info!(url, "[FETCH] Requesting required file groups");

        let exchange = async {
            let response = self.client.get(url).send().await?;
            debug!(status = %response.status(), "[FETCH] Response status code");
            debug!(headers = ?response.headers(), "[FETCH] Response headers");
            response.text().await
        };

        let body = match tokio::time::timeout(self.timeout, exchange).await {
            Ok(Ok(body)) => body,
            Ok(Err(e)) => {
                error!(error = ?e, url, "[FETCH] Request failed");
                return Err(RunError::RequestFailed(e.to_string()));
            }
            Err(_) => {
                error!(url, timeout_ms = self.timeout.as_millis() as u64, "[FETCH] Server did not answer in time");
                return Err(RunError::ServerUnreachable);
            }
        };

        let groups = parse_file_list(&body)?;
        info!(
            groups = groups.len(),
            types = %groups.unique_types().join(", "),
            "[FETCH] File types retrieved"
        );
        Ok(groups)
    }
}

/// Interpret a response body as `{ "files": [[type, ...], ...] }`.
///
/// Non-JSON bodies are a parse error; JSON of the wrong shape, an empty set or
/// a group with fewer than two types is a malformed response.
pub fn parse_file_list(body: &str) -> Result<FileGroupSet> {
    let value: serde_json::Value = serde_json::from_str(body).map_err(|e| {
        error!(error = %e, "[FETCH] Response body is not JSON");
        RunError::InvalidJson(e.to_string())
    })?;

    let response: FileListResponse = serde_json::from_value(value).map_err(|e| {
        error!(error = %e, "[FETCH] Response has no 'files' field");
        RunError::MalformedGroups(format!("'files' is missing: {e}"))
    })?;

    let groups: FileGroupSet = serde_json::from_value(response.files).map_err(|e| {
        error!(error = %e, "[FETCH] 'files' has the wrong shape");
        RunError::MalformedGroups(format!("'files' should be an array of string arrays: {e}"))
    })?;

    if groups.is_empty() {
        return Err(RunError::MalformedGroups("'files' is empty".into()));
    }
    if let Some(group) = groups.groups().iter().find(|g| g.len() < 2) {
        warn!(%group, "[FETCH] Group with fewer than two file types");
        return Err(RunError::MalformedGroups(format!(
            "group {group} must list at least two file types"
        )));
    }

    Ok(groups)
}
