/// `load_config` module: merges the optional YAML file with the CI environment into a [`RunConfig`].
///
/// Secrets (`INPUT_API_KEY`, `INPUT_GITHUB_TOKEN`) only ever come from the
/// environment; the YAML file can only carry non-secret settings, and where it
/// sets one it wins over the environment.
///
/// # Errors
/// All errors use `anyhow::Error` and are surfaced at the CLI boundary.
use anyhow::{Context, Result};
use sca_upload_core::config::{EnvSource, MapEnv, RunConfig};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};

/// [`EnvSource`] over the process environment.
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// Non-secret settings accepted from the YAML file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub api_url: Option<String>,
    pub excluded_paths: Option<String>,
    pub repository_root: Option<PathBuf>,
    pub project_id: Option<String>,
    pub results_url: Option<String>,
    pub upload_timeout_secs: Option<u64>,
}

/// Looks names up in `primary` first, then in `fallback`.
struct Layered<'a> {
    primary: MapEnv,
    fallback: &'a dyn EnvSource,
}

impl EnvSource for Layered<'_> {
    fn var(&self, name: &str) -> Option<String> {
        self.primary.var(name).or_else(|| self.fallback.var(name))
    }
}

pub fn read_file_config(path: &Path) -> Result<FileConfig> {
    info!(config_path = ?path, "Loading configuration from file");

    let content = fs::read_to_string(path).map_err(|e| {
        error!(error = ?e, config_path = ?path, "Failed to read config file");
        anyhow::anyhow!("Failed to read config file {:?}: {}", path, e)
    })?;

    // An empty file is a valid, empty config.
    if content.trim().is_empty() {
        return Ok(FileConfig::default());
    }

    let parsed: FileConfig = serde_yaml::from_str(&content).map_err(|e| {
        error!(error = ?e, config_path = ?path, "Failed to parse config YAML");
        anyhow::anyhow!("Failed to parse config YAML: {e}")
    })?;
    info!(config_path = ?path, "Parsed config YAML successfully");
    Ok(parsed)
}

/// Build the run configuration from an optional YAML file plus `env`.
pub fn load_config(path: Option<&Path>, env: &dyn EnvSource) -> Result<RunConfig> {
    let file = match path {
        Some(path) => read_file_config(path)?,
        None => FileConfig::default(),
    };

    let mut overrides = MapEnv::new();
    if let Some(api_url) = &file.api_url {
        overrides = overrides.with("INPUT_API_URL", api_url);
    }
    if let Some(excluded) = &file.excluded_paths {
        overrides = overrides.with("INPUT_EXCLUDED_PATHS", excluded);
    }
    if let Some(root) = &file.repository_root {
        overrides = overrides.with("GITHUB_WORKSPACE", &root.display().to_string());
    }
    if let Some(project_id) = &file.project_id {
        overrides = overrides.with("INPUT_PROJECT_ID", project_id);
    }

    let layered = Layered {
        primary: overrides,
        fallback: env,
    };
    let mut config = RunConfig::from_env_source(&layered).context("Invalid configuration")?;

    if let Some(results_url) = file.results_url {
        config.results_url = results_url;
    }
    if let Some(secs) = file.upload_timeout_secs {
        config.upload_timeout = Some(Duration::from_secs(secs));
    }

    info!(
        api_url = %config.api_url,
        repository_root = %config.repository_root.display(),
        "Config loaded and merged successfully"
    );
    Ok(config)
}
