//! Rule document types.
//!
//! [`RawDocument`] is the unvalidated input to a load. [`RuleDocument`] is the
//! validated, immutable form stored in a rule set: compiled patterns plus the
//! body pre-split into literal text and `@file:<id>` references.

use std::ops::Range;
use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::glob::{CompiledPattern, normalize_path};

/// Inclusion token: `@file:` followed by an id.
static REFERENCE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@file:([A-Za-z0-9_][A-Za-z0-9_./-]*)").expect("constant regex compiles")
});

// ─────────────────────────────────────────────────────────────────────────────
// Raw input
// ─────────────────────────────────────────────────────────────────────────────

/// A document as supplied by the corpus, before validation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawDocument {
    /// Source location; the id is derived from it.
    pub address: String,
    /// Short description. Required.
    pub description: Option<String>,
    /// Raw glob patterns. At least one is required.
    pub globs: Vec<String>,
    /// Guidance text, possibly containing `@file:<id>` tokens.
    pub body: String,
}

impl RawDocument {
    /// Create a raw document with no description or globs.
    pub fn new(address: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            description: None,
            globs: Vec::new(),
            body: body.into(),
        }
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the glob patterns.
    #[must_use]
    pub fn with_globs<I, S>(mut self, globs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.globs = globs.into_iter().map(Into::into).collect();
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Identifiers
// ─────────────────────────────────────────────────────────────────────────────

/// Derive a rule id from an address.
///
/// ```text
/// derive_id("./rust/errors.mdc", ["mdc"]) → "rust/errors"
/// derive_id("/notes.txt", ["mdc"])        → "notes.txt"
/// ```
pub fn derive_id(address: &str, extensions: &[String]) -> String {
    let normalized = normalize_path(address);
    let trimmed = normalized.trim_start_matches('/');

    let (dir, file) = match trimmed.rfind('/') {
        Some(idx) => (&trimmed[..=idx], &trimmed[idx + 1..]),
        None => ("", trimmed),
    };

    let stem = match file.rfind('.') {
        Some(dot) if dot > 0 && has_rule_extension(&file[dot + 1..], extensions) => &file[..dot],
        _ => file,
    };

    format!("{dir}{stem}")
}

fn has_rule_extension(ext: &str, extensions: &[String]) -> bool {
    extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
}

// ─────────────────────────────────────────────────────────────────────────────
// References
// ─────────────────────────────────────────────────────────────────────────────

/// An inclusion token found in a body.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Reference {
    /// Id the token points at.
    pub target_id: String,
    /// Zero-based position among the body's tokens.
    pub occurrence_order: usize,
}

/// A piece of a body: literal text or a reference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Segment {
    /// Byte range of literal text within the body.
    Text(Range<usize>),
    /// Index into the document's references.
    Reference(usize),
}

/// Split a body into segments, extracting references in textual order.
pub fn extract_segments(body: &str, extensions: &[String]) -> (Vec<Segment>, Vec<Reference>) {
    let mut segments = Vec::new();
    let mut references = Vec::new();
    let mut cursor = 0;

    for caps in REFERENCE_TOKEN.captures_iter(body) {
        let (Some(whole), Some(target)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        // Trailing dots are sentence punctuation, not part of the id
        let raw_target = target.as_str().trim_end_matches('.');
        let token_end = target.start() + raw_target.len();

        if whole.start() > cursor {
            segments.push(Segment::Text(cursor..whole.start()));
        }
        segments.push(Segment::Reference(references.len()));
        references.push(Reference {
            target_id: derive_id(raw_target, extensions),
            occurrence_order: references.len(),
        });
        cursor = token_end;
    }

    if cursor < body.len() {
        segments.push(Segment::Text(cursor..body.len()));
    }

    (segments, references)
}

// ─────────────────────────────────────────────────────────────────────────────
// RuleDocument
// ─────────────────────────────────────────────────────────────────────────────

/// A validated, immutable rule document.
#[derive(Clone, Debug)]
pub struct RuleDocument {
    id: String,
    address: String,
    description: String,
    globs: Vec<String>,
    patterns: Vec<Arc<CompiledPattern>>,
    body: String,
    segments: Vec<Segment>,
    references: Vec<Reference>,
}

impl RuleDocument {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: String,
        address: String,
        description: String,
        globs: Vec<String>,
        patterns: Vec<Arc<CompiledPattern>>,
        body: String,
        segments: Vec<Segment>,
        references: Vec<Reference>,
    ) -> Self {
        Self {
            id,
            address,
            description,
            globs,
            patterns,
            body,
            segments,
            references,
        }
    }

    /// Unique id within the rule set.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Address the document was loaded from.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Short description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Raw glob patterns, in declaration order.
    pub fn globs(&self) -> &[String] {
        &self.globs
    }

    /// Compiled patterns, parallel to [`Self::globs`].
    pub fn patterns(&self) -> &[Arc<CompiledPattern>] {
        &self.patterns
    }

    /// Unresolved body text.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Body split into text and reference segments.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// References in order of first textual occurrence.
    pub fn references(&self) -> &[Reference] {
        &self.references
    }

    /// Literal text for a text segment range.
    pub(crate) fn text(&self, range: &Range<usize>) -> &str {
        &self.body[range.clone()]
    }

    /// Most specific pattern matching an already-normalized path.
    ///
    /// On equal specificity the earlier-declared pattern wins.
    pub fn best_match(&self, normalized_path: &str) -> Option<&CompiledPattern> {
        let mut best: Option<&CompiledPattern> = None;
        for pattern in &self.patterns {
            if !pattern.is_match_normalized(normalized_path) {
                continue;
            }
            if best.is_none_or(|b| pattern.specificity() > b.specificity()) {
                best = Some(pattern);
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exts() -> Vec<String> {
        vec!["mdc".to_string(), "md".to_string()]
    }

    fn targets(body: &str) -> Vec<String> {
        extract_segments(body, &exts())
            .1
            .into_iter()
            .map(|r| r.target_id)
            .collect()
    }

    // -- derive_id --

    #[test]
    fn id_strips_rule_extension() {
        assert_eq!(derive_id("rust/errors.mdc", &exts()), "rust/errors");
        assert_eq!(derive_id("notes.MD", &exts()), "notes");
    }

    #[test]
    fn id_keeps_other_extensions() {
        assert_eq!(derive_id("notes.txt", &exts()), "notes.txt");
        assert_eq!(derive_id("v1.2/rule.mdc", &exts()), "v1.2/rule");
    }

    #[test]
    fn id_normalizes_address() {
        assert_eq!(derive_id("./rust\\errors.mdc", &exts()), "rust/errors");
        assert_eq!(derive_id("/abs/rule.md", &exts()), "abs/rule");
    }

    #[test]
    fn id_keeps_dotfiles_whole() {
        assert_eq!(derive_id(".md", &exts()), ".md");
    }

    #[test]
    fn id_of_empty_address_is_empty() {
        assert_eq!(derive_id("./", &exts()), "");
    }

    // -- extract_segments --

    #[test]
    fn no_tokens_is_single_text_segment() {
        let (segments, refs) = extract_segments("plain body", &exts());
        assert_eq!(segments, vec![Segment::Text(0..10)]);
        assert!(refs.is_empty());
    }

    #[test]
    fn tokens_split_body_in_order() {
        let body = "see @file:a and @file:b/c";
        let (segments, refs) = extract_segments(body, &exts());
        assert_eq!(
            segments,
            vec![
                Segment::Text(0..4),
                Segment::Reference(0),
                Segment::Text(11..16),
                Segment::Reference(1),
            ]
        );
        assert_eq!(refs[0].target_id, "a");
        assert_eq!(refs[1].target_id, "b/c");
        assert_eq!(refs[1].occurrence_order, 1);
    }

    #[test]
    fn trailing_period_is_text() {
        let body = "Follow @file:style.";
        let (segments, refs) = extract_segments(body, &exts());
        assert_eq!(refs[0].target_id, "style");
        assert_eq!(segments.last(), Some(&Segment::Text(18..19)));
    }

    #[test]
    fn token_extension_is_normalized() {
        assert_eq!(targets("@file:rust/errors.mdc"), vec!["rust/errors"]);
    }

    #[test]
    fn repeated_tokens_each_recorded() {
        assert_eq!(targets("@file:q then @file:q"), vec!["q", "q"]);
    }

    #[test]
    fn bare_prefix_is_not_a_token() {
        assert!(targets("email me @file: later").is_empty());
    }
}
