//! Rule file discovery.
//!
//! Walks a rules directory and turns every file with a rule extension into a
//! [`RawDocument`] addressed by its root-relative, forward-slash path. Results
//! are sorted by address so a load sees the same order on every platform.
//!
//! Unlike best-effort scanners, discovery is fail-fast: an unreadable,
//! oversized, or non-UTF-8 rule file aborts the whole walk.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use crate::document::RawDocument;
use crate::errors::{Result, RuleError};
use crate::parser::parse_rule_file;

/// Directories excluded from scanning by default.
const DEFAULT_EXCLUDE_DIRS: &[&str] = &["node_modules", ".git", ".hg", ".svn", "target"];

/// Default rule file extensions.
const DEFAULT_EXTENSIONS: &[&str] = &["mdc", "md"];

/// Maximum directory depth to scan.
const DEFAULT_MAX_DEPTH: usize = 16;

/// Largest rule file accepted.
const DEFAULT_MAX_FILE_SIZE: u64 = 256 * 1024;

/// Configuration for rule discovery.
#[derive(Clone, Debug)]
pub struct DiscoveryConfig {
    /// Rules directory.
    pub root: PathBuf,
    /// Extensions (without dot) that mark rule files.
    pub extensions: Vec<String>,
    /// Maximum directory depth below `root`.
    pub max_depth: usize,
    /// Files larger than this abort discovery.
    pub max_file_size: u64,
    /// Directory names to skip.
    pub exclude_dirs: HashSet<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::new(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| (*s).to_owned()).collect(),
            max_depth: DEFAULT_MAX_DEPTH,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            exclude_dirs: DEFAULT_EXCLUDE_DIRS.iter().map(|s| (*s).to_owned()).collect(),
        }
    }
}

impl DiscoveryConfig {
    /// Default configuration rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    fn is_rule_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }

    fn is_excluded_dir(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return false;
        }
        let name = entry.file_name().to_string_lossy();
        name.starts_with('.') || self.exclude_dirs.contains(name.as_ref())
    }
}

/// Discover and parse every rule file under `config.root`.
pub fn discover_rule_files(
    config: &DiscoveryConfig,
    cancel: &CancellationToken,
) -> Result<Vec<RawDocument>> {
    let root_str = config.root.display().to_string();
    if !config.root.is_dir() {
        return Err(RuleError::Io {
            path: root_str,
            source: std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "rules directory does not exist",
            ),
        });
    }

    let mut documents = Vec::new();
    // Links are followed; a dangling link or a directory loop aborts the load
    let walker = WalkDir::new(&config.root)
        .follow_links(true)
        .max_depth(config.max_depth.saturating_add(1))
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !config.is_excluded_dir(e));

    for entry in walker {
        if cancel.is_cancelled() {
            return Err(RuleError::LoadCancelled);
        }
        let entry = entry.map_err(|e| walk_error(&root_str, e))?;
        if !entry.file_type().is_file() || !config.is_rule_file(entry.path()) {
            continue;
        }
        documents.push(read_rule_file(config, entry.path())?);
    }

    documents.sort_by(|a, b| a.address.cmp(&b.address));
    debug!(root = %root_str, count = documents.len(), "discovered rule files");
    Ok(documents)
}

fn read_rule_file(config: &DiscoveryConfig, path: &Path) -> Result<RawDocument> {
    let address = relative_address(&config.root, path);
    let path_str = path.display().to_string();

    let metadata = std::fs::metadata(path).map_err(|source| RuleError::Io {
        path: path_str.clone(),
        source,
    })?;
    let size = metadata.len();
    if size > config.max_file_size {
        return Err(RuleError::MalformedDocument {
            address,
            reason: format!(
                "file too large: {size} bytes (max {} bytes)",
                config.max_file_size
            ),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| RuleError::Io {
        path: path_str,
        source,
    })?;
    Ok(parse_rule_file(&address, &content))
}

/// Root-relative path with forward slashes.
fn relative_address(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn walk_error(root: &str, err: walkdir::Error) -> RuleError {
    let path = err
        .path()
        .map_or_else(|| root.to_owned(), |p| p.display().to_string());
    let source = err
        .into_io_error()
        .unwrap_or_else(|| std::io::Error::other("directory walk failed"));
    RuleError::Io { path, source }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
