//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`RuleweaveSettings::default()`]
//! 2. If the settings file exists, deep-merge user values over defaults
//! 3. Apply environment variable overrides (highest priority)
//! 4. Validate the result
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::types::{LogLevel, RuleweaveSettings};

/// Resolve the path to the settings file (`~/.ruleweave/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".ruleweave").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<RuleweaveSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON or the merged values fail validation, returns an error.
/// Rejected env values are logged with `warn!`.
pub fn load_settings_from_path(path: &Path) -> Result<RuleweaveSettings> {
    let (settings, rejected) = load_settings_deferred(path)?;
    for override_ in &rejected {
        override_.log();
    }
    Ok(settings)
}

/// Like [`load_settings_from_path`], but returns rejected env values instead
/// of logging them, for callers that set up logging from the loaded settings.
pub fn load_settings_deferred(path: &Path) -> Result<(RuleweaveSettings, Vec<RejectedOverride>)> {
    let defaults = serde_json::to_value(RuleweaveSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: RuleweaveSettings = serde_json::from_value(merged)?;
    let rejected = apply_env_overrides(&mut settings);
    settings.validate()?;
    Ok((settings, rejected))
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// An environment override whose value was ignored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RejectedOverride {
    /// Variable name.
    pub key: &'static str,
    /// Raw value that failed to parse or was out of range.
    pub value: String,
}

impl RejectedOverride {
    /// Emit the rejection as a warning.
    pub fn log(&self) {
        warn!(key = self.key, value = %self.value, "invalid env override, ignoring");
    }
}

/// Apply environment variable overrides to loaded settings.
///
/// Invalid values are skipped (file/default value kept) and returned.
pub fn apply_env_overrides(settings: &mut RuleweaveSettings) -> Vec<RejectedOverride> {
    apply_overrides_from(settings, |key| std::env::var(key).ok())
}

/// Apply overrides read through `lookup` instead of the process environment.
pub fn apply_overrides_from<F>(settings: &mut RuleweaveSettings, lookup: F) -> Vec<RejectedOverride>
where
    F: Fn(&str) -> Option<String>,
{
    let mut env = EnvReader {
        lookup,
        rejected: Vec::new(),
    };

    if let Some(v) = env.string("RULEWEAVE_RULES_DIR") {
        settings.rules.rules_dir = v;
    }
    if let Some(v) = env.parsed("RULEWEAVE_MAX_FILE_SIZE", |v| {
        parse_u64_range(v, 1, 64 * 1024 * 1024)
    }) {
        settings.rules.max_file_size = v;
    }
    if let Some(v) = env.parsed("RULEWEAVE_MAX_REFERENCE_DEPTH", |v| parse_usize_range(v, 0, 1024)) {
        settings.compose.max_reference_depth = v;
    }
    if let Some(v) = env.parsed("RULEWEAVE_MAX_BYTES", |v| parse_usize_range(v, 1, usize::MAX)) {
        settings.compose.max_bytes = Some(v);
    }
    if let Some(level) = env.parsed("RULEWEAVE_LOG_LEVEL", LogLevel::parse) {
        settings.logging.level = level;
    }

    env.rejected
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `usize` within a range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ── Env var reader ──────────────────────────────────────────────────────────

struct EnvReader<F> {
    lookup: F,
    rejected: Vec<RejectedOverride>,
}

impl<F: Fn(&str) -> Option<String>> EnvReader<F> {
    fn string(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|v| !v.is_empty())
    }

    fn parsed<T>(&mut self, key: &'static str, parse: impl Fn(&str) -> Option<T>) -> Option<T> {
        let raw = self.string(key)?;
        let parsed = parse(&raw);
        if parsed.is_none() {
            self.rejected.push(RejectedOverride { key, value: raw });
        }
        parsed
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SettingsError;
    use serde_json::json;

    // ── deep_merge ──────────────────────────────────────────────────

    #[test]
    fn merge_simple_override() {
        let merged = deep_merge(json!({"a": 1, "b": 2}), json!({"b": 3}));
        assert_eq!(merged, json!({"a": 1, "b": 3}));
    }

    #[test]
    fn merge_nested_objects() {
        let target = json!({"compose": {"maxReferenceDepth": 8, "maxBytes": 4096}});
        let source = json!({"compose": {"maxReferenceDepth": 3}});
        let merged = deep_merge(target, source);
        assert_eq!(merged["compose"]["maxReferenceDepth"], 3);
        assert_eq!(merged["compose"]["maxBytes"], 4096);
    }

    #[test]
    fn merge_arrays_replaced() {
        let merged = deep_merge(json!({"ext": ["mdc", "md"]}), json!({"ext": ["txt"]}));
        assert_eq!(merged["ext"], json!(["txt"]));
    }

    #[test]
    fn merge_null_preserves_target() {
        let merged = deep_merge(json!({"a": 1}), json!({"a": null}));
        assert_eq!(merged["a"], 1);
    }

    // ── load_settings_from_path ─────────────────────────────────────

    #[test]
    fn missing_file_yields_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let settings = load_settings_from_path(&tmp.path().join("nope.json")).unwrap();
        assert_eq!(settings.rules.max_scan_depth, 16);
        assert_eq!(settings.rules.rules_dir, ".cursor/rules");
    }

    #[test]
    fn file_values_override_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"rules": {"extensions": ["rule"], "maxScanDepth": 4}}"#,
        )
        .unwrap();

        let settings = load_settings_from_path(&path).unwrap();
        assert_eq!(settings.rules.extensions, vec!["rule"]);
        assert_eq!(settings.rules.max_scan_depth, 4);
        assert_eq!(settings.rules.exclude_dirs.len(), 7);
    }

    #[test]
    fn invalid_json_is_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            load_settings_from_path(&path),
            Err(SettingsError::Json(_))
        ));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("settings.json");
        std::fs::write(&path, r#"{"rules": {"maxFileSize": 0}}"#).unwrap();
        assert!(matches!(
            load_settings_from_path(&path),
            Err(SettingsError::Invalid {
                field: "rules.maxFileSize",
                ..
            })
        ));
    }

    // ── env overrides ───────────────────────────────────────────────

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let owned: Vec<(String, String)> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| owned.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
    }

    #[test]
    fn valid_overrides_apply() {
        let mut settings = RuleweaveSettings::default();
        let rejected = apply_overrides_from(
            &mut settings,
            env_of(&[
                ("RULEWEAVE_RULES_DIR", "docs/rules"),
                ("RULEWEAVE_MAX_BYTES", "2048"),
                ("RULEWEAVE_MAX_REFERENCE_DEPTH", "0"),
                ("RULEWEAVE_LOG_LEVEL", "DEBUG"),
            ]),
        );
        assert!(rejected.is_empty());
        assert_eq!(settings.rules.rules_dir, "docs/rules");
        assert_eq!(settings.compose.max_bytes, Some(2048));
        assert_eq!(settings.compose.max_reference_depth, 0);
        assert_eq!(settings.logging.level, LogLevel::Debug);
    }

    #[test]
    fn invalid_overrides_are_returned_not_applied() {
        let mut settings = RuleweaveSettings::default();
        let rejected = apply_overrides_from(
            &mut settings,
            env_of(&[
                ("RULEWEAVE_MAX_BYTES", "lots"),
                ("RULEWEAVE_MAX_FILE_SIZE", "0"),
                ("RULEWEAVE_LOG_LEVEL", "loud"),
            ]),
        );
        assert_eq!(
            rejected,
            vec![
                RejectedOverride {
                    key: "RULEWEAVE_MAX_FILE_SIZE",
                    value: "0".to_string(),
                },
                RejectedOverride {
                    key: "RULEWEAVE_MAX_BYTES",
                    value: "lots".to_string(),
                },
                RejectedOverride {
                    key: "RULEWEAVE_LOG_LEVEL",
                    value: "loud".to_string(),
                },
            ]
        );
        assert_eq!(settings.rules.max_file_size, 256 * 1024);
        assert!(settings.compose.max_bytes.is_none());
        assert_eq!(settings.logging.level, LogLevel::Warn);
    }

    #[test]
    fn empty_override_is_ignored_silently() {
        let mut settings = RuleweaveSettings::default();
        let rejected = apply_overrides_from(&mut settings, env_of(&[("RULEWEAVE_MAX_BYTES", "")]));
        assert!(rejected.is_empty());
        assert!(settings.compose.max_bytes.is_none());
    }

    // ── parsing helpers ─────────────────────────────────────────────

    #[test]
    fn parse_u64_in_range() {
        assert_eq!(parse_u64_range("42", 1, 100), Some(42));
        assert_eq!(parse_u64_range(" 7 ", 1, 100), Some(7));
        assert_eq!(parse_u64_range("0", 1, 100), None);
        assert_eq!(parse_u64_range("abc", 1, 100), None);
    }

    #[test]
    fn parse_usize_in_range() {
        assert_eq!(parse_usize_range("0", 0, 10), Some(0));
        assert_eq!(parse_usize_range("11", 0, 10), None);
        assert_eq!(parse_usize_range("-1", 0, 10), None);
    }
}
