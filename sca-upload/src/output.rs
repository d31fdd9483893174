//! Step outputs and failure annotations in the GitHub Actions format.

use sca_upload_core::config::EnvSource;
use sca_upload_core::contract::OutputSink;
use sca_upload_core::RunError;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

const MULTILINE_DELIMITER: &str = "SCA_UPLOAD_EOF";

/// Writes `name=value` lines to the `GITHUB_OUTPUT` file, or stdout without one.
pub struct GitHubOutput {
    path: Option<PathBuf>,
}

impl GitHubOutput {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn from_env(env: &dyn EnvSource) -> Self {
        Self::new(env.var("GITHUB_OUTPUT").filter(|p| !p.is_empty()).map(PathBuf::from))
    }
}

impl OutputSink for GitHubOutput {
    fn set_output(&self, name: &str, value: &str) -> Result<(), RunError> {
        let line = if value.contains('\n') {
            format!("{name}<<{MULTILINE_DELIMITER}\n{value}\n{MULTILINE_DELIMITER}\n")
        } else {
            format!("{name}={value}\n")
        };

        match &self.path {
            Some(path) => {
                let mut file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(|e| RunError::io(path, e))?;
                file.write_all(line.as_bytes())
                    .map_err(|e| RunError::io(path, e))?;
                tracing::debug!(output = name, path = %path.display(), "Wrote step output");
            }
            None => print!("{line}"),
        }
        Ok(())
    }
}

/// `::error::` workflow command; newlines are escaped so the whole message stays one annotation.
pub fn error_annotation(message: &str) -> String {
    let escaped = message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A");
    format!("::error::{escaped}")
}
