//! Composition: select, rank, resolve, deduplicate, and budget.
//!
//! [`compose`] is a pure function of `(rule_set, target_path, options)`. It
//! takes `&RuleSet` and never locks, so any number of calls may share one
//! snapshot.

use std::collections::HashSet;

use serde::Serialize;
use tracing::debug;

use crate::errors::{Result, RuleError};
use crate::glob::normalize_path;
use crate::resolver::resolve_excluding;
use crate::store::RuleSet;

/// Default reference nesting limit.
pub const DEFAULT_MAX_REFERENCE_DEPTH: usize = 8;

/// Separator placed between entries by [`CompositionBundle::render`].
const ENTRY_SEPARATOR: &str = "\n\n";

/// Per-call composition options.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ComposeOptions {
    /// Byte budget over entry texts. `None` is unbounded.
    pub max_bytes: Option<usize>,
    /// Maximum reference nesting depth.
    pub max_reference_depth: usize,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self {
            max_bytes: None,
            max_reference_depth: DEFAULT_MAX_REFERENCE_DEPTH,
        }
    }
}

/// A document selected for a target path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    /// Matching document.
    pub rule_id: String,
    /// Its most specific matching pattern.
    pub matched_pattern: String,
    /// Packed specificity of that pattern.
    pub specificity_score: u64,
}

/// One composed entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleEntry {
    /// Document the entry came from.
    pub rule_id: String,
    /// Body with every reference expanded.
    pub resolved_text: String,
}

/// Ordered, deduplicated output of a compose call.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositionBundle {
    /// Entries in rank order.
    pub ordered_entries: Vec<BundleEntry>,
    /// `true` if the byte budget cut the bundle short.
    pub truncated: bool,
}

impl CompositionBundle {
    /// `true` if no entries were composed.
    pub fn is_empty(&self) -> bool {
        self.ordered_entries.is_empty()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.ordered_entries.len()
    }

    /// Ids of the composed entries, in order.
    pub fn rule_ids(&self) -> impl Iterator<Item = &str> {
        self.ordered_entries.iter().map(|e| e.rule_id.as_str())
    }

    /// Sum of entry text lengths, in bytes.
    pub fn total_bytes(&self) -> usize {
        self.ordered_entries.iter().map(|e| e.resolved_text.len()).sum()
    }

    /// Entry texts joined by a blank line.
    pub fn render(&self) -> String {
        self.ordered_entries
            .iter()
            .map(|e| e.resolved_text.as_str())
            .collect::<Vec<_>>()
            .join(ENTRY_SEPARATOR)
    }
}

/// Documents matching `target_path`, ranked.
///
/// Ranking is descending specificity, then ascending id.
pub fn matches(rule_set: &RuleSet, target_path: &str) -> Vec<MatchResult> {
    let path = normalize_path(target_path);
    let mut results: Vec<MatchResult> = rule_set
        .iter()
        .filter_map(|doc| {
            doc.best_match(&path).map(|pattern| MatchResult {
                rule_id: doc.id().to_owned(),
                matched_pattern: pattern.raw().to_owned(),
                specificity_score: pattern.specificity().score(),
            })
        })
        .collect();

    results.sort_by(|a, b| {
        b.specificity_score
            .cmp(&a.specificity_score)
            .then_with(|| a.rule_id.cmp(&b.rule_id))
    });
    results
}

/// Compose the guidance bundle for `target_path`.
///
/// A resolution failure in any candidate aborts the call with
/// [`RuleError::Composition`]. Candidates ranked after a budget cut are not
/// resolved.
pub fn compose(
    rule_set: &RuleSet,
    target_path: &str,
    options: &ComposeOptions,
) -> Result<CompositionBundle> {
    let candidates = matches(rule_set, target_path);
    debug!(
        path = %target_path,
        candidates = candidates.len(),
        max_bytes = ?options.max_bytes,
        "composing"
    );

    let mut bundle = CompositionBundle::default();
    let mut inlined: HashSet<String> = HashSet::new();
    let mut total_bytes = 0usize;

    for candidate in candidates {
        if inlined.contains(&candidate.rule_id) {
            debug!(rule = %candidate.rule_id, "skipping rule already inlined");
            continue;
        }

        // References to rules already emitted expand to nothing
        let resolution = resolve_excluding(
            rule_set,
            &candidate.rule_id,
            options.max_reference_depth,
            &inlined,
        )
        .map_err(|source| RuleError::Composition {
            rule_id: candidate.rule_id.clone(),
            source: Box::new(source),
        })?;

        let text = resolution.text;
        if text.is_empty() && !rule_set.get(&candidate.rule_id)?.body().is_empty() {
            debug!(rule = %candidate.rule_id, "skipping rule whose references were all emitted");
            continue;
        }
        if !text.is_empty()
            && bundle
                .ordered_entries
                .iter()
                .any(|e| e.resolved_text.contains(text.as_str()))
        {
            debug!(rule = %candidate.rule_id, "skipping rule with duplicate text");
            continue;
        }

        let next_total = total_bytes.saturating_add(text.len());
        if options.max_bytes.is_some_and(|max| next_total > max) {
            debug!(rule = %candidate.rule_id, total_bytes, "byte budget reached");
            bundle.truncated = true;
            break;
        }
        total_bytes = next_total;

        inlined.extend(resolution.inlined);
        bundle.ordered_entries.push(BundleEntry {
            rule_id: candidate.rule_id,
            resolved_text: text,
        });
    }

    Ok(bundle)
}
