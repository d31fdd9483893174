use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::contract::UploadIdentity;
use crate::error::{Result, RunError};
use crate::fetch::DEFAULT_FETCH_TIMEOUT;

pub const FILE_LIST_ENDPOINT: &str = "integration/file-list";
pub const UPLOAD_ENDPOINT: &str = "integration/ci-triggered-upload";
pub const DEFAULT_RESULTS_URL: &str = "https://scatool.sca.com/scan/";
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

/// Read-only view of the host environment.
pub trait EnvSource {
    fn var(&self, name: &str) -> Option<String>;
}

/// In-memory [`EnvSource`], mostly for tests.
#[derive(Debug, Clone, Default)]
pub struct MapEnv(HashMap<String, String>);

impl MapEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.0.insert(name.to_string(), value.to_string());
        self
    }
}

impl EnvSource for MapEnv {
    fn var(&self, name: &str) -> Option<String> {
        self.0.get(name).cloned()
    }
}

/// Everything one run needs, resolved before the first stage starts.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Base URL ending in `/`; endpoints are appended verbatim.
    pub api_url: String,
    pub api_key: String,
    /// Comma-separated, `.gitignore`-style.
    pub excluded_paths: String,
    pub repository_root: PathBuf,
    /// Base for the `paths` field of the upload.
    pub working_dir: PathBuf,
    pub identity: UploadIdentity,
    pub github_token: Option<String>,
    pub github_api_url: String,
    pub pull_request: Option<u64>,
    pub results_url: String,
    pub fetch_timeout: Duration,
    /// `None` leaves the upload unbounded.
    pub upload_timeout: Option<Duration>,
}

impl RunConfig {
    pub fn file_list_url(&self) -> String {
        format!("{}{}", self.api_url, FILE_LIST_ENDPOINT)
    }

    pub fn upload_url(&self) -> String {
        format!("{}{}", self.api_url, UPLOAD_ENDPOINT)
    }

    /// Build a config from CI-runner variables (`INPUT_*` action inputs and `GITHUB_*`).
    pub fn from_env_source(env: &dyn EnvSource) -> Result<Self> {
        let non_empty = |name: &str| env.var(name).filter(|v| !v.trim().is_empty());

        let api_url = non_empty("INPUT_API_URL").ok_or(RunError::MissingConfig("INPUT_API_URL"))?;
        let api_key = env.var("INPUT_API_KEY").unwrap_or_default().trim().to_string();
        let repository_root =
            PathBuf::from(non_empty("GITHUB_WORKSPACE").unwrap_or_else(|| ".".to_string()));

        let identity = UploadIdentity {
            repository_name: env.var("GITHUB_REPOSITORY").unwrap_or_default(),
            ref_name: env.var("GITHUB_REF").unwrap_or_default(),
            commit_hash: env.var("GITHUB_SHA").unwrap_or_default(),
            run_number: env.var("GITHUB_RUN_ATTEMPT").unwrap_or_default(),
            project_id: env.var("INPUT_PROJECT_ID").unwrap_or_default(),
            api_key: api_key.clone(),
        };

        let pull_request = non_empty("GITHUB_EVENT_PATH")
            .and_then(|path| pull_request_number(Path::new(&path)));

        Ok(RunConfig {
            api_url,
            api_key,
            excluded_paths: env.var("INPUT_EXCLUDED_PATHS").unwrap_or_default(),
            working_dir: repository_root.clone(),
            repository_root,
            identity,
            github_token: non_empty("INPUT_GITHUB_TOKEN"),
            github_api_url: non_empty("GITHUB_API_URL")
                .unwrap_or_else(|| DEFAULT_GITHUB_API_URL.to_string()),
            pull_request,
            results_url: DEFAULT_RESULTS_URL.to_string(),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            upload_timeout: None,
        })
    }

    pub fn trace_loaded(&self) {
        info!(
            api_url = %self.api_url,
            repository_root = %self.repository_root.display(),
            repository = %self.identity.repository_name,
            ref_name = %self.identity.ref_name,
            pull_request = ?self.pull_request,
            comment_enabled = self.github_token.is_some(),
            "Loaded RunConfig"
        );
        debug!(
            excluded_paths = %self.excluded_paths,
            fetch_timeout_ms = self.fetch_timeout.as_millis() as u64,
            upload_timeout = ?self.upload_timeout,
            "RunConfig details"
        );
    }
}

/// `pull_request.number` from a webhook event payload, if the run was triggered by one.
pub fn pull_request_number(event_path: &Path) -> Option<u64> {
    let raw = match std::fs::read_to_string(event_path) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(error = %e, path = %event_path.display(), "Could not read event payload");
            return None;
        }
    };
    let payload: serde_json::Value = match serde_json::from_str(&raw) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, path = %event_path.display(), "Event payload is not JSON");
            return None;
        }
    };
    payload.get("pull_request")?.get("number")?.as_u64()
}
