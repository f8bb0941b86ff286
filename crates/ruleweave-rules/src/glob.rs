//! Glob compilation, path normalization, and pattern specificity.
//!
//! Patterns are compiled with `globset` using literal separators, so:
//! - `*` matches within one path segment and never crosses `/`
//! - `**` matches zero or more whole segments
//! - `{a,b,c}` is alternation
//!
//! Matching is case-sensitive. Both patterns and paths are normalized before
//! use: separators unified to `/`, `.` and empty segments removed.
//!
//! [`GlobMatcher`] is the compiled-pattern cache. It is filled while a rule set
//! loads and is only reachable through `&self` afterwards.

use std::collections::HashMap;
use std::sync::Arc;

use globset::GlobBuilder;

use crate::errors::{Result, RuleError};

/// Characters that make a segment a wildcard segment.
const GLOB_META: &[char] = &['*', '?', '[', '{'];

/// Characters excluded from the literal character count.
const GLOB_SYNTAX: &[char] = &['*', '?', '[', ']', '{', '}', ','];

// ─────────────────────────────────────────────────────────────────────────────
// Normalization
// ─────────────────────────────────────────────────────────────────────────────

/// Normalize a target path for matching.
///
/// ```text
/// normalize_path("./src//app.rs")   → "src/app.rs"
/// normalize_path("src\\lib\\a.rs")  → "src/lib/a.rs"
/// normalize_path("/abs/./x")        → "/abs/x"
/// ```
pub fn normalize_path(path: &str) -> String {
    let unified = path.replace('\\', "/");
    let joined = unified
        .split('/')
        .filter(|seg| !seg.is_empty() && *seg != ".")
        .collect::<Vec<_>>()
        .join("/");
    if unified.starts_with('/') {
        format!("/{joined}")
    } else {
        joined
    }
}

/// Normalize a pattern. Backslashes are kept since they escape metacharacters.
fn normalize_pattern(pattern: &str) -> String {
    let mut rest = pattern.trim();
    while let Some(stripped) = rest.strip_prefix("./") {
        rest = stripped;
    }
    let absolute = rest.starts_with('/');
    let joined = rest
        .split('/')
        .filter(|seg| !seg.is_empty() && *seg != ".")
        .collect::<Vec<_>>()
        .join("/");
    if absolute { format!("/{joined}") } else { joined }
}

// ─────────────────────────────────────────────────────────────────────────────
// Specificity
// ─────────────────────────────────────────────────────────────────────────────

/// Relative narrowness of a pattern. Higher is more specific.
///
/// Fewer wildcard segments rank first (`**` counts double), then a longer
/// literal prefix, then more literal characters overall. Catch-alls such as
/// `**/*` land at the bottom.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Specificity(u64);

impl Specificity {
    /// Compute the specificity of a normalized pattern.
    pub fn of(pattern: &str) -> Self {
        let wildcard_weight: usize = pattern
            .split('/')
            .map(|seg| {
                if seg == "**" {
                    2
                } else if seg.contains(GLOB_META) {
                    1
                } else {
                    0
                }
            })
            .sum();
        let literal_prefix = pattern
            .find(GLOB_META)
            .map_or(pattern.chars().count(), |idx| pattern[..idx].chars().count());
        let literal_chars = pattern.chars().filter(|c| !GLOB_SYNTAX.contains(c)).count();

        let weight = saturate(wildcard_weight);
        let score = (u64::from(u16::MAX - weight) << 32)
            | (u64::from(saturate(literal_prefix)) << 16)
            | u64::from(saturate(literal_chars));
        Self(score)
    }

    /// Packed numeric score.
    pub fn score(self) -> u64 {
        self.0
    }
}

fn saturate(n: usize) -> u16 {
    u16::try_from(n).unwrap_or(u16::MAX)
}

// ─────────────────────────────────────────────────────────────────────────────
// Compiled patterns
// ─────────────────────────────────────────────────────────────────────────────

/// A compiled glob pattern.
#[derive(Clone, Debug)]
pub struct CompiledPattern {
    raw: String,
    normalized: String,
    matcher: globset::GlobMatcher,
    specificity: Specificity,
}

impl CompiledPattern {
    /// Pattern text as written in the document.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Pattern text after normalization.
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    /// Specificity of this pattern.
    pub fn specificity(&self) -> Specificity {
        self.specificity
    }

    /// Test an already-normalized path.
    pub fn is_match_normalized(&self, normalized_path: &str) -> bool {
        self.matcher.is_match(normalized_path)
    }
}

/// Compile a single pattern without caching.
pub fn compile(pattern: &str) -> Result<CompiledPattern> {
    let normalized = normalize_pattern(pattern);
    if normalized.is_empty() {
        return Err(RuleError::PatternSyntax {
            pattern: pattern.to_owned(),
            message: "empty pattern".to_owned(),
        });
    }

    let glob = GlobBuilder::new(&normalized)
        .literal_separator(true)
        .case_insensitive(false)
        .build()
        .map_err(|e| RuleError::PatternSyntax {
            pattern: pattern.to_owned(),
            message: e.kind().to_string(),
        })?;

    Ok(CompiledPattern {
        raw: pattern.to_owned(),
        specificity: Specificity::of(&normalized),
        normalized,
        matcher: glob.compile_matcher(),
    })
}

/// Test a path against a compiled pattern. The path is normalized first.
pub fn matches(path: &str, pattern: &CompiledPattern) -> bool {
    pattern.is_match_normalized(&normalize_path(path))
}

// ─────────────────────────────────────────────────────────────────────────────
// GlobMatcher (cache)
// ─────────────────────────────────────────────────────────────────────────────

/// Compiled-pattern cache keyed by raw pattern text.
///
/// Documents sharing a pattern share one compiled matcher.
#[derive(Debug, Default)]
pub struct GlobMatcher {
    cache: HashMap<String, Arc<CompiledPattern>>,
}

impl GlobMatcher {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile `pattern`, reusing a cached entry when present.
    pub fn compile(&mut self, pattern: &str) -> Result<Arc<CompiledPattern>> {
        if let Some(hit) = self.cache.get(pattern) {
            return Ok(Arc::clone(hit));
        }
        let compiled = Arc::new(compile(pattern)?);
        let _ = self.cache.insert(pattern.to_owned(), Arc::clone(&compiled));
        Ok(compiled)
    }

    /// Look up a previously compiled pattern.
    pub fn get(&self, pattern: &str) -> Option<&Arc<CompiledPattern>> {
        self.cache.get(pattern)
    }

    /// Number of distinct compiled patterns.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// `true` if nothing has been compiled.
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
