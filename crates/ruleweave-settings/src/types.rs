//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` for the JSON file format
//! and implement [`Default`] with production values. `#[serde(default)]`
//! allows partial JSON: missing fields get their default value.

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings type.
///
/// ```json
/// {
///   "rules": { "rulesDir": "docs/rules" },
///   "compose": { "maxBytes": 16384 }
/// }
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuleweaveSettings {
    /// Settings schema version.
    pub version: String,
    /// Corpus discovery settings.
    pub rules: RulesSettings,
    /// Composition settings.
    pub compose: ComposeSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

impl Default for RuleweaveSettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            rules: RulesSettings::default(),
            compose: ComposeSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl RuleweaveSettings {
    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.rules.extensions.iter().all(|e| e.trim().is_empty()) {
            return Err(SettingsError::invalid(
                "rules.extensions",
                "must name at least one extension",
            ));
        }
        if self.rules.max_file_size == 0 {
            return Err(SettingsError::invalid(
                "rules.maxFileSize",
                "must be greater than zero",
            ));
        }
        if self.compose.max_bytes == Some(0) {
            return Err(SettingsError::invalid(
                "compose.maxBytes",
                "must be greater than zero when set",
            ));
        }
        Ok(())
    }
}

/// Where and how rule documents are discovered on disk.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RulesSettings {
    /// Rules directory, relative to the working directory unless absolute.
    pub rules_dir: String,
    /// File extensions treated as rule documents (without the dot).
    pub extensions: Vec<String>,
    /// Largest rule file accepted, in bytes. Larger files abort the load.
    pub max_file_size: u64,
    /// Maximum directory depth scanned below `rules_dir`.
    pub max_scan_depth: usize,
    /// Directory names skipped during discovery.
    pub exclude_dirs: Vec<String>,
}

impl Default for RulesSettings {
    fn default() -> Self {
        Self {
            rules_dir: ".cursor/rules".to_string(),
            extensions: vec!["mdc".to_string(), "md".to_string()],
            max_file_size: 256 * 1024,
            max_scan_depth: 16,
            exclude_dirs: ["node_modules", ".git", ".hg", ".svn", "target", "dist", "build"]
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        }
    }
}

/// Composition defaults.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ComposeSettings {
    /// Maximum nesting of `@file:` references.
    pub max_reference_depth: usize,
    /// Optional byte budget for a composed bundle.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_bytes: Option<usize>,
}

impl Default for ComposeSettings {
    fn default() -> Self {
        Self {
            max_reference_depth: 8,
            max_bytes: None,
        }
    }
}

/// Log level for stderr logging.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace-level (most verbose).
    Trace,
    /// Debug-level.
    Debug,
    /// Info-level.
    Info,
    /// Warning-level (default).
    #[default]
    Warn,
    /// Error-level (least verbose).
    Error,
}

impl LogLevel {
    /// Convert to a tracing filter string.
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Parse a level name (case-insensitive).
    pub fn parse(val: &str) -> Option<Self> {
        match val.to_lowercase().as_str() {
            "trace" => Some(Self::Trace),
            "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" | "warning" => Some(Self::Warn),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

/// Logging configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Minimum level written to stderr.
    pub level: LogLevel,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
