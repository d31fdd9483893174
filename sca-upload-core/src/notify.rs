//! Result Notifier: logs the server response and, when the run belongs to a
//! pull request and a token is configured, comments on it.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{error, info};

use crate::contract::{Notifier, RunReport};
use crate::error::{Result, RunError};

#[derive(Debug, Clone)]
pub struct CommentTarget {
    pub api_url: String,
    /// `owner/repo`
    pub repository: String,
    pub pull_request: u64,
    pub token: String,
}

#[derive(Serialize)]
struct CommentRequest<'a> {
    body: &'a str,
}

pub struct PullRequestNotifier {
    client: reqwest::Client,
    target: Option<CommentTarget>,
    results_url: String,
}

impl PullRequestNotifier {
    pub fn new(target: Option<CommentTarget>, results_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            target,
            results_url: results_url.into(),
        }
    }

    /// Only logs; never talks to the code-review system.
    pub fn log_only(results_url: impl Into<String>) -> Self {
        Self::new(None, results_url)
    }

    async fn post_comment(&self, target: &CommentTarget, body: &str) -> Result<()> {
        let url = format!(
            "{}/repos/{}/issues/{}/comments",
            target.api_url.trim_end_matches('/'),
            target.repository,
            target.pull_request
        );
        info!(url = %url, pull_request = target.pull_request, "[NOTIFY] Posting comment");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&target.token)
            .header(reqwest::header::USER_AGENT, "sca-upload")
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .json(&CommentRequest { body })
            .send()
            .await
            .map_err(|e| {
                error!(error = ?e, url = %url, "[NOTIFY] Comment request failed");
                RunError::NotifyFailed(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<Failed to decode response body>"));
            error!(%status, body = %text, "[NOTIFY] Comment was rejected");
            return Err(RunError::NotifyFailed(format!("status {status}: {text}")));
        }
        info!(%status, "[NOTIFY] Comment posted");
        Ok(())
    }
}

#[async_trait]
impl Notifier for PullRequestNotifier {
    async fn notify(&self, report: &RunReport) -> Result<()> {
        info!(response = %report.server_response, "Controller Response");
        match &self.target {
            Some(target) => {
                let body = comment_body(&self.results_url, &report.server_response, &report.files);
                self.post_comment(target, &body).await
            }
            None => {
                info!("[NOTIFY] No pull request or token, skipping comment");
                Ok(())
            }
        }
    }
}

/// Markdown comment pointing at the scan results, with the uploaded files folded away.
pub fn comment_body(results_url: &str, server_response: &str, files: &[PathBuf]) -> String {
    let details = files
        .iter()
        .map(|f| format!("- {}", f.display()))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "The files have been uploaded to the SCATool. You can find the results [here]({results_url}{response}).\n\
         <details>\n<summary>Uploaded Files</summary>\n\n{details}\n</details>",
        response = server_response.trim()
    )
}
