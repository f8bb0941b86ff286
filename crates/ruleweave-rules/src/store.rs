//! Rule set construction.
//!
//! [`RuleSet::load`] turns a corpus of [`RawDocument`]s into an immutable
//! [`RuleSet`]. Loading is fail-fast: the first malformed document, duplicate
//! id, or bad pattern aborts the whole load and no partial set is returned.
//!
//! ## Validation order (per document)
//!
//! 1. cancellation check
//! 2. id derivation (empty id → malformed) and duplicate check
//! 3. description present
//! 4. at least one glob pattern, each compiling
//!
//! References are extracted into typed segments here. Dangling references are
//! not load errors; they fail composition for the documents that contain them.

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::discovery::{DiscoveryConfig, discover_rule_files};
use crate::document::{RawDocument, Reference, RuleDocument, derive_id, extract_segments};
use crate::errors::{Result, RuleError};
use crate::glob::GlobMatcher;

/// Options controlling how raw documents become rule documents.
#[derive(Clone, Debug)]
pub struct LoadOptions {
    /// Extensions stripped from addresses and reference targets.
    pub extensions: Vec<String>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            extensions: vec!["mdc".to_owned(), "md".to_owned()],
        }
    }
}

/// An immutable snapshot of loaded rule documents.
///
/// Documents are kept in id order, so iteration is deterministic regardless
/// of the order the corpus supplied them in.
#[derive(Debug)]
pub struct RuleSet {
    documents: BTreeMap<String, RuleDocument>,
    matcher: GlobMatcher,
    fingerprint: String,
}

impl RuleSet {
    /// Load a corpus with default options and no cancellation.
    pub fn load<I>(corpus: I) -> Result<Self>
    where
        I: IntoIterator<Item = RawDocument>,
    {
        Self::load_with(corpus, &LoadOptions::default(), &CancellationToken::new())
    }

    /// Load a corpus.
    pub fn load_with<I>(corpus: I, options: &LoadOptions, cancel: &CancellationToken) -> Result<Self>
    where
        I: IntoIterator<Item = RawDocument>,
    {
        let mut documents: BTreeMap<String, RuleDocument> = BTreeMap::new();
        let mut matcher = GlobMatcher::new();

        for raw in corpus {
            if cancel.is_cancelled() {
                debug!("rule load cancelled");
                return Err(RuleError::LoadCancelled);
            }
            let doc = build_document(raw, options, &mut matcher, &documents)?;
            debug!(id = %doc.id(), patterns = doc.patterns().len(), "loaded rule");
            let _ = documents.insert(doc.id().to_owned(), doc);
        }

        let rule_set = Self {
            fingerprint: fingerprint(&documents, &options.extensions),
            documents,
            matcher,
        };

        for (from, reference) in rule_set.dangling_references() {
            warn!(from = %from, target = %reference.target_id, "dangling rule reference");
        }
        info!(
            rules = rule_set.len(),
            patterns = rule_set.matcher.len(),
            "rule set loaded"
        );
        Ok(rule_set)
    }

    /// Discover rule files on disk and load them.
    pub fn load_dir(config: &DiscoveryConfig, cancel: &CancellationToken) -> Result<Self> {
        let corpus = discover_rule_files(config, cancel)?;
        let options = LoadOptions {
            extensions: config.extensions.clone(),
        };
        Self::load_with(corpus, &options, cancel)
    }

    /// Look up a document by id.
    pub fn get(&self, id: &str) -> Result<&RuleDocument> {
        self.documents
            .get(id)
            .ok_or_else(|| RuleError::NotFound(id.to_owned()))
    }

    /// `true` if a document with `id` exists.
    pub fn contains(&self, id: &str) -> bool {
        self.documents.contains_key(id)
    }

    /// Documents in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &RuleDocument> {
        self.documents.values()
    }

    /// Ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.documents.keys().map(String::as_str)
    }

    /// Number of documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// `true` if the set holds no documents.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Outgoing references of a document.
    pub fn references(&self, id: &str) -> Result<&[Reference]> {
        self.get(id).map(RuleDocument::references)
    }

    /// Every reference whose target is missing, as `(from_id, reference)`.
    pub fn dangling_references(&self) -> Vec<(&str, &Reference)> {
        self.iter()
            .flat_map(|doc| doc.references().iter().map(move |r| (doc.id(), r)))
            .filter(|(_, r)| !self.contains(&r.target_id))
            .collect()
    }

    /// Compiled-pattern cache shared by the documents.
    pub fn matcher(&self) -> &GlobMatcher {
        &self.matcher
    }

    /// SHA-256 over all document content, hex encoded.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

fn build_document(
    raw: RawDocument,
    options: &LoadOptions,
    matcher: &mut GlobMatcher,
    existing: &BTreeMap<String, RuleDocument>,
) -> Result<RuleDocument> {
    let RawDocument {
        address,
        description,
        globs,
        body,
    } = raw;

    let id = derive_id(&address, &options.extensions);
    if id.is_empty() {
        return Err(malformed(&address, "address does not yield an id"));
    }
    if let Some(first) = existing.get(&id) {
        return Err(RuleError::DuplicateId {
            id,
            first: first.address().to_owned(),
            second: address,
        });
    }

    let description = description
        .map(|d| d.trim().to_owned())
        .filter(|d| !d.is_empty())
        .ok_or_else(|| malformed(&address, "missing description"))?;

    let mut unique_globs: Vec<String> = Vec::new();
    for glob in globs {
        let glob = glob.trim();
        if !glob.is_empty() && !unique_globs.iter().any(|g| g == glob) {
            unique_globs.push(glob.to_owned());
        }
    }
    if unique_globs.is_empty() {
        return Err(malformed(&address, "no glob patterns"));
    }

    let patterns = unique_globs
        .iter()
        .map(|glob| {
            matcher.compile(glob).map_err(|err| match err {
                RuleError::PatternSyntax { pattern, message } => RuleError::PatternSyntax {
                    pattern,
                    message: format!("{message} (in {address})"),
                },
                other => other,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let (segments, references) = extract_segments(&body, &options.extensions);

    Ok(RuleDocument::new(
        id,
        address,
        description,
        unique_globs,
        patterns,
        body,
        segments,
        references,
    ))
}

fn malformed(address: &str, reason: &str) -> RuleError {
    RuleError::MalformedDocument {
        address: address.to_owned(),
        reason: reason.to_owned(),
    }
}

/// Content hash of the loaded set. Extensions are included because they
/// change how `@file:` tokens resolve.
fn fingerprint(documents: &BTreeMap<String, RuleDocument>, extensions: &[String]) -> String {
    let mut hasher = Sha256::new();
    let mut extensions: Vec<String> = extensions.iter().map(|e| e.to_ascii_lowercase()).collect();
    extensions.sort();
    extensions.dedup();
    for ext in &extensions {
        hasher.update(ext.as_bytes());
        hasher.update([0x1f]);
    }
    hasher.update([0x1d]);
    for doc in documents.values() {
        hasher.update(doc.id().as_bytes());
        hasher.update([0]);
        hasher.update(doc.description().as_bytes());
        hasher.update([0]);
        for glob in doc.globs() {
            hasher.update(glob.as_bytes());
            hasher.update([0x1f]);
        }
        hasher.update([0]);
        hasher.update(doc.body().as_bytes());
        hasher.update([0x1e]);
    }
    format!("{:x}", hasher.finalize())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
