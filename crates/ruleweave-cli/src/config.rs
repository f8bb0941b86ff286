//! Settings and flags folded into engine inputs.
//!
//! Flags win over settings, settings win over compiled defaults.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use ruleweave_rules::{ComposeOptions, DiscoveryConfig};
use ruleweave_settings::RuleweaveSettings;

/// Discovery configuration for the rules directory.
pub(crate) fn discovery_config(
    settings: &RuleweaveSettings,
    rules_dir: Option<&Path>,
) -> DiscoveryConfig {
    let root = rules_dir.map_or_else(|| PathBuf::from(&settings.rules.rules_dir), Path::to_path_buf);
    DiscoveryConfig {
        root,
        extensions: settings.rules.extensions.clone(),
        max_depth: settings.rules.max_scan_depth,
        max_file_size: settings.rules.max_file_size,
        exclude_dirs: settings.rules.exclude_dirs.iter().cloned().collect::<HashSet<_>>(),
    }
}

/// Compose options from settings, overridden by flags.
pub(crate) fn compose_options(
    settings: &RuleweaveSettings,
    max_bytes: Option<usize>,
    max_depth: Option<usize>,
) -> ComposeOptions {
    ComposeOptions {
        max_bytes: max_bytes.or(settings.compose.max_bytes),
        max_reference_depth: max_depth.unwrap_or(settings.compose.max_reference_depth),
    }
}

/// Target path as matched against globs.
///
/// Absolute paths under `cwd` become relative to it; anything else is passed
/// through unchanged and normalized by the engine.
pub(crate) fn target_path(path: &Path, cwd: &Path) -> String {
    let relative = if path.is_absolute() {
        path.strip_prefix(cwd).unwrap_or(path)
    } else {
        path
    };
    relative.to_string_lossy().into_owned()
}
