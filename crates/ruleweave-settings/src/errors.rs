//! Settings error types.

use thiserror::Error;

/// Why a settings file could not be turned into usable [`RuleweaveSettings`].
///
/// [`RuleweaveSettings`]: crate::RuleweaveSettings
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings file exists but could not be read, or an explicitly
    /// requested file is missing.
    #[error("cannot read settings: {0}")]
    Io(#[from] std::io::Error),
    /// The file is not JSON, or does not fit the settings shape.
    #[error("settings file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// A merged value failed validation.
    #[error("invalid setting: {field} {reason}")]
    Invalid {
        /// Dotted camelCase key, as written in the settings file.
        field: &'static str,
        /// What the value must satisfy.
        reason: &'static str,
    },
}

impl SettingsError {
    pub(crate) fn invalid(field: &'static str, reason: &'static str) -> Self {
        Self::Invalid { field, reason }
    }
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
