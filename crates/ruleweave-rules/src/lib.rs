//! # ruleweave-rules
//!
//! Glob-scoped rule documents, composed per target file.
//!
//! A corpus of rule documents (description, glob patterns, markdown body) is
//! loaded into an immutable [`RuleSet`]. For a target path, [`compose()`]
//! selects every document with a matching pattern, ranks them by pattern
//! specificity, expands `@file:<id>` references, deduplicates, and returns a
//! [`CompositionBundle`] under an optional byte budget.
//!
//! ## Modules
//!
//! - [`glob`]: pattern compilation, path normalization, specificity
//! - [`parser`]: frontmatter parsing for rule files
//! - [`discovery`]: rules directory walk
//! - [`store`]: validation and [`RuleSet`] construction
//! - [`resolver`]: reference expansion with cycle and depth checks
//! - [`compose`]: match, rank, dedup, budget
//! - [`cache`]: fingerprint-keyed bundle cache
//! - [`active`]: current rule set with atomic reload

#![deny(unsafe_code)]

pub mod active;
pub mod cache;
pub mod compose;
pub mod discovery;
pub mod document;
pub mod errors;
pub mod glob;
pub mod parser;
pub mod resolver;
pub mod store;

pub use active::ActiveRuleSet;
pub use cache::{CacheStats, ComposeCache, DEFAULT_CACHE_CAPACITY};
pub use compose::{
    BundleEntry, ComposeOptions, CompositionBundle, DEFAULT_MAX_REFERENCE_DEPTH, MatchResult,
    compose, matches,
};
pub use discovery::{DiscoveryConfig, discover_rule_files};
pub use document::{RawDocument, Reference, RuleDocument, Segment, derive_id};
pub use errors::{Result, RuleError};
pub use glob::{CompiledPattern, GlobMatcher, Specificity, normalize_path};
pub use parser::parse_rule_file;
pub use resolver::{Resolution, resolve, resolve_detailed, resolve_excluding};
pub use store::{LoadOptions, RuleSet};
pub use tokio_util::sync::CancellationToken;
