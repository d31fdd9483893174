//! File Resolver: expand file types into concrete paths under a root.
//!
//! Exclusions use `.gitignore` syntax relative to the root. The dependency
//! cache (`node_modules`) is always excluded, whatever the caller passes.
//! Hidden entries (name starting with `.`) below the root are never searched.

use std::path::{Path, PathBuf};

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use tracing::{debug, error, info};
use walkdir::WalkDir;

use crate::contract::matches_type;
use crate::error::{Result, RunError};

/// Directory name of the dependency cache that is never uploaded.
pub const DEPENDENCY_CACHE_DIR: &str = "node_modules";

/// Pattern appended to every exclusion list.
pub const DEPENDENCY_CACHE_PATTERN: &str = "node_modules/**";

/// Split a comma-separated exclusion list into patterns.
///
/// Entries are trimmed and stripped of leading `/`; empty entries and `#`
/// comments are dropped.
pub fn normalize_exclusions(csv: &str) -> Vec<String> {
    csv.split(',')
        .map(|rule| rule.trim().trim_start_matches('/'))
        .filter(|rule| !rule.is_empty() && !rule.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Compiled exclusion patterns, dependency cache included.
pub struct ExclusionRules {
    patterns: Vec<String>,
    matcher: Gitignore,
}

impl ExclusionRules {
    pub fn new(root: &Path, csv: &str) -> Result<Self> {
        let mut patterns = normalize_exclusions(csv);
        patterns.push(DEPENDENCY_CACHE_PATTERN.to_string());

        let mut builder = GitignoreBuilder::new(root);
        for pattern in &patterns {
            builder
                .add_line(None, pattern)
                .map_err(|e| RunError::InvalidExclusion {
                    pattern: pattern.clone(),
                    message: e.to_string(),
                })?;
        }
        let matcher = builder.build().map_err(|e| RunError::InvalidExclusion {
            pattern: patterns.join(","),
            message: e.to_string(),
        })?;

        Ok(Self { patterns, matcher })
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// `path` must lie under the root the rules were built for.
    pub fn is_excluded(&self, path: &Path, is_dir: bool) -> bool {
        if path
            .components()
            .any(|c| c.as_os_str() == DEPENDENCY_CACHE_DIR)
        {
            return true;
        }
        self.matcher
            .matched_path_or_any_parents(path, is_dir)
            .is_ignore()
    }
}

/// Find every regular file under `root` whose path ends in one of `types`.
///
/// Returns absolute paths, each at most once, in directory-walk order.
pub async fn resolve(root: &Path, types: &[String], exclude_csv: &str) -> Result<Vec<PathBuf>> {
    let root = root.to_path_buf();
    let types = types.to_vec();
    let exclude_csv = exclude_csv.to_string();
    tokio::task::spawn_blocking(move || resolve_blocking(&root, &types, &exclude_csv))
        .await
        .map_err(|e| RunError::Internal(format!("file search task failed: {e}")))?
}

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

/// Synchronous body of [`resolve`].
pub fn resolve_blocking(root: &Path, types: &[String], exclude_csv: &str) -> Result<Vec<PathBuf>> {
    let root = std::fs::canonicalize(root).map_err(|e| {
        error!(error = ?e, root = %root.display(), "[RESOLVE] Repository root is not accessible");
        RunError::io(root, e)
    })?;
    let rules = ExclusionRules::new(&root, exclude_csv)?;
    info!(
        root = %root.display(),
        types = %types.join(", "),
        excluded = %rules.patterns().join(", "),
        "[RESOLVE] Searching for files"
    );

    let walker = WalkDir::new(&root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || (!is_hidden(entry) && !rules.is_excluded(entry.path(), entry.file_type().is_dir()))
        });

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!(error = %e, "[RESOLVE] Skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = match entry.path().strip_prefix(&root) {
            Ok(rel) => rel.to_string_lossy().replace('\\', "/"),
            Err(_) => continue,
        };
        if types.iter().any(|ty| matches_type(&relative, ty)) {
            debug!(path = %relative, "[RESOLVE] Matched file");
            files.push(entry.into_path());
        }
    }

    info!(count = files.len(), "[RESOLVE] Found files that will be uploaded");
    Ok(files)
}
