//! Upload Transport: all resolved files plus run identity in one multipart POST.
//!
//! File content is streamed part by part in list order; nothing is buffered
//! beyond one read chunk per file.

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use futures::Stream;
use reqwest::multipart::{Form, Part};
use tokio::io::AsyncReadExt;
use tracing::{debug, error, info};

use crate::contract::{FileUploader, UploadIdentity};
use crate::error::{Result, RunError};

const CHUNK_SIZE: usize = 64 * 1024;

pub const API_KEY_HEADER: &str = "API-Key";

pub struct HttpUploader {
    client: reqwest::Client,
    identity: UploadIdentity,
    working_dir: PathBuf,
    timeout: Option<Duration>,
}

impl HttpUploader {
    pub fn new(identity: UploadIdentity, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            client: reqwest::Client::new(),
            identity,
            working_dir: working_dir.into(),
            timeout: None,
        }
    }

    /// Bound the whole upload request. Unset by default.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    async fn build_form(&self, files: &[PathBuf]) -> Result<Form> {
        let base = tokio::fs::canonicalize(&self.working_dir)
            .await
            .unwrap_or_else(|_| self.working_dir.clone());
        let mut form = Form::new();

        for path in files {
            let len = tokio::fs::metadata(path)
                .await
                .map_err(|e| RunError::io(path, e))?
                .len();
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let relative = relative_path(&base, path);
            debug!(path = %relative, size = len, "[UPLOAD] Adding file to form");

            let body = reqwest::Body::wrap_stream(file_stream(path.clone()));
            form = form
                .part("files", Part::stream_with_length(body, len).file_name(file_name))
                .text("paths", relative);
        }

        let id = &self.identity;
        Ok(form
            .text("repositoryName", id.repository_name.clone())
            .text("refName", id.ref_name.clone())
            .text("branchName", id.ref_name.clone())
            .text("commitHash", id.commit_hash.clone())
            .text("runNumber", id.run_number.clone())
            .text("projectId", id.project_id.clone())
            .text("apiKey", id.api_key.clone()))
    }
}

#[async_trait]
impl FileUploader for HttpUploader {
    async fn upload(&self, url: &str, files: &[PathBuf]) -> Result<String> {
        info!(url, files = files.len(), "[UPLOAD] Sending files");
        let form = self.build_form(files).await?;

        let mut request = self
            .client
            .post(url)
            .header(API_KEY_HEADER, &self.identity.api_key)
            .multipart(form);
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await.map_err(|e| {
            error!(error = ?e, url, "[UPLOAD] Request error");
            RunError::UploadRequest(e.to_string())
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            error!(error = ?e, %status, "[UPLOAD] Failed to read response body");
            RunError::UploadRequest(e.to_string())
        })?;

        if !status.is_success() {
            error!(%status, body = %body, "[UPLOAD] Server rejected upload");
            return Err(RunError::UploadFailed {
                status: status.as_u16(),
                body,
                reason: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        info!(%status, "[UPLOAD] Upload accepted");
        Ok(body)
    }
}

enum ReadState {
    Pending(PathBuf),
    Open(tokio::fs::File),
}

/// Chunked read of one file, opened on first poll.
fn file_stream(
    path: PathBuf,
) -> impl Stream<Item = std::io::Result<Vec<u8>>> + Send + 'static {
    futures::stream::try_unfold(ReadState::Pending(path), next_chunk)
}

async fn next_chunk(state: ReadState) -> std::io::Result<Option<(Vec<u8>, ReadState)>> {
    let mut file = match state {
        ReadState::Pending(path) => tokio::fs::File::open(&path).await?,
        ReadState::Open(file) => file,
    };
    let mut buf = vec![0u8; CHUNK_SIZE];
    let n = file.read(&mut buf).await?;
    if n == 0 {
        return Ok(None);
    }
    buf.truncate(n);
    Ok(Some((buf, ReadState::Open(file))))
}

/// `path` relative to `base`, with `/` separators. Walks up with `..` when needed.
pub fn relative_path(base: &Path, path: &Path) -> String {
    let base: Vec<Component> = base.components().collect();
    let target: Vec<Component> = path.components().collect();
    let common = base
        .iter()
        .zip(target.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<String> = Vec::new();
    for _ in common..base.len() {
        parts.push("..".to_string());
    }
    for component in &target[common..] {
        parts.push(component.as_os_str().to_string_lossy().replace('\\', "/"));
    }
    parts.join("/")
}
