//! Error types for rule loading and composition.
//!
//! Load-time variants abort the whole load. Composition-time variants are
//! scoped to a single compose call and never touch the shared rule set.

use thiserror::Error;

/// Errors produced by the rule engine.
#[derive(Debug, Error)]
pub enum RuleError {
    /// A glob pattern failed to compile.
    #[error("invalid glob pattern `{pattern}`: {message}")]
    PatternSyntax {
        /// Raw pattern text.
        pattern: String,
        /// Compiler diagnostic.
        message: String,
    },

    /// A document is missing required structure.
    #[error("malformed rule document {address}: {reason}")]
    MalformedDocument {
        /// Address the document was loaded from.
        address: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Two documents map to the same id.
    #[error("duplicate rule id `{id}` ({first} and {second})")]
    DuplicateId {
        /// The colliding id.
        id: String,
        /// Address of the first document with this id.
        first: String,
        /// Address of the second document with this id.
        second: String,
    },

    /// The load was cancelled before it completed.
    #[error("rule load cancelled")]
    LoadCancelled,

    /// A rule file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path being read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Lookup of an id that is not in the rule set.
    #[error("rule not found: {0}")]
    NotFound(String),

    /// A reference chain leads back to a document already being resolved.
    #[error("reference cycle: {}", chain.join(" -> "))]
    Cycle {
        /// Resolution path, ending with the repeated id.
        chain: Vec<String>,
    },

    /// A body references an id that is not in the rule set.
    #[error("dangling reference in `{from}`: @file:{target}")]
    DanglingReference {
        /// Document containing the token.
        from: String,
        /// Missing target id.
        target: String,
    },

    /// Reference nesting went deeper than allowed.
    #[error("reference depth exceeded at `{id}` (max {max_depth})")]
    DepthExceeded {
        /// Id whose inlining would exceed the limit.
        id: String,
        /// Configured maximum depth.
        max_depth: usize,
    },

    /// Resolving a matched document failed during composition.
    #[error("composition failed for rule `{rule_id}`: {source}")]
    Composition {
        /// The candidate document whose resolution failed.
        rule_id: String,
        /// The resolver error.
        source: Box<RuleError>,
    },
}

impl RuleError {
    /// Error class name, as printed by the CLI.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PatternSyntax { .. } => "PatternSyntaxError",
            Self::MalformedDocument { .. } => "MalformedDocumentError",
            Self::DuplicateId { .. } => "DuplicateIdError",
            Self::LoadCancelled => "LoadCancelledError",
            Self::Io { .. } => "IoError",
            Self::NotFound(_) => "NotFoundError",
            Self::Cycle { .. } => "CycleError",
            Self::DanglingReference { .. } => "DanglingReferenceError",
            Self::DepthExceeded { .. } => "DepthExceededError",
            Self::Composition { source, .. } => source.kind(),
        }
    }

    /// `true` for errors that abort a load.
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            Self::PatternSyntax { .. }
                | Self::MalformedDocument { .. }
                | Self::DuplicateId { .. }
                | Self::LoadCancelled
                | Self::Io { .. }
        )
    }

    /// The id most relevant to this error, if any.
    pub fn rule_id(&self) -> Option<&str> {
        match self {
            Self::DuplicateId { id, .. } | Self::DepthExceeded { id, .. } => Some(id),
            Self::NotFound(id) => Some(id),
            Self::Cycle { chain } => chain.first().map(String::as_str),
            Self::DanglingReference { from, .. } => Some(from),
            Self::Composition { rule_id, .. } => Some(rule_id),
            _ => None,
        }
    }
}

/// Result type for rule operations.
pub type Result<T> = std::result::Result<T, RuleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_display_joins_chain() {
        let err = RuleError::Cycle {
            chain: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(err.to_string(), "reference cycle: a -> b -> a");
    }

    #[test]
    fn composition_reports_inner_kind() {
        let err = RuleError::Composition {
            rule_id: "p".into(),
            source: Box::new(RuleError::DanglingReference {
                from: "p".into(),
                target: "q".into(),
            }),
        };
        assert_eq!(err.kind(), "DanglingReferenceError");
        assert_eq!(err.rule_id(), Some("p"));
        assert!(!err.is_load_error());
        assert!(err.to_string().contains("@file:q"));
    }

    #[test]
    fn load_errors_classified() {
        assert!(RuleError::LoadCancelled.is_load_error());
        assert!(
            RuleError::DuplicateId {
                id: "x".into(),
                first: "x.md".into(),
                second: "x.mdc".into(),
            }
            .is_load_error()
        );
        assert!(!RuleError::NotFound("x".into()).is_load_error());
    }
}
