//! # ruleweave-settings
//!
//! Configuration management with layered sources for ruleweave.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults** : [`RuleweaveSettings::default()`]
//! 2. **User file** : `~/.ruleweave/settings.json` (deep-merged over defaults)
//! 3. **Environment variables** : `RULEWEAVE_*` overrides (highest priority)
//!
//! Command-line flags are applied by the binary on top of the loaded value.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    RejectedOverride, apply_env_overrides, apply_overrides_from, deep_merge, load_settings,
    load_settings_deferred, load_settings_from_path, settings_path,
};
pub use types::*;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn re_exports_work() {
        let _settings = RuleweaveSettings::default();
        let _path = settings_path();
    }

    #[test]
    fn default_settings_are_valid() {
        let settings = RuleweaveSettings::default();
        assert_eq!(settings.rules.rules_dir, ".cursor/rules");
        assert_eq!(settings.rules.extensions, vec!["mdc", "md"]);
        assert_eq!(settings.compose.max_reference_depth, 8);
        assert!(settings.compose.max_bytes.is_none());
        assert_eq!(settings.logging.level, LogLevel::Warn);
    }
}
