//! Reference expansion.
//!
//! Walks a document's pre-split segments and replaces each `@file:<id>` token
//! with the fully resolved body of its target. For every reference, in
//! textual order, the checks are:
//!
//! 1. target missing → [`RuleError::DanglingReference`]
//! 2. target already on the resolution path (self included) → [`RuleError::Cycle`]
//! 3. target already inlined in this call, or excluded by the caller → no text
//! 4. inlining would go deeper than `max_depth` → [`RuleError::DepthExceeded`]
//!
//! The root sits at depth 0, so `max_depth = 0` permits no references at all.

use std::collections::HashSet;

use crate::document::{RuleDocument, Segment};
use crate::errors::{Result, RuleError};
use crate::store::RuleSet;

/// Outcome of a detailed resolution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    /// Flattened body text.
    pub text: String,
    /// Ids whose bodies were inlined, in inlining order. The root is first.
    pub inlined: Vec<String>,
}

/// Resolve `rule_id` to flattened text.
pub fn resolve(rule_set: &RuleSet, rule_id: &str, max_depth: usize) -> Result<String> {
    resolve_detailed(rule_set, rule_id, max_depth).map(|r| r.text)
}

/// Resolve `rule_id`, also reporting which documents were inlined.
pub fn resolve_detailed(rule_set: &RuleSet, rule_id: &str, max_depth: usize) -> Result<Resolution> {
    resolve_excluding(rule_set, rule_id, max_depth, &HashSet::new())
}

/// Like [`resolve_detailed`], but references to ids in `excluded` expand to
/// nothing and are left out of [`Resolution::inlined`].
///
/// Composition passes the ids already emitted earlier in the bundle so a
/// later entry does not repeat their text. Cycle and dangling checks still
/// apply to excluded targets.
pub fn resolve_excluding(
    rule_set: &RuleSet,
    rule_id: &str,
    max_depth: usize,
    excluded: &HashSet<String>,
) -> Result<Resolution> {
    let root = rule_set.get(rule_id)?;
    let mut seen = HashSet::from([root.id()]);
    seen.extend(
        excluded
            .iter()
            .filter_map(|id| rule_set.get(id).ok().map(RuleDocument::id)),
    );
    let mut resolver = Resolver {
        rule_set,
        max_depth,
        path: vec![root.id()],
        seen,
        order: vec![root.id()],
    };

    let mut text = String::with_capacity(root.body().len());
    resolver.expand(root, 0, &mut text)?;

    Ok(Resolution {
        text,
        inlined: resolver.order.into_iter().map(str::to_owned).collect(),
    })
}

struct Resolver<'a> {
    rule_set: &'a RuleSet,
    max_depth: usize,
    path: Vec<&'a str>,
    seen: HashSet<&'a str>,
    order: Vec<&'a str>,
}

impl<'a> Resolver<'a> {
    fn expand(&mut self, doc: &'a RuleDocument, depth: usize, out: &mut String) -> Result<()> {
        let rule_set = self.rule_set;

        for segment in doc.segments() {
            let idx = match segment {
                Segment::Text(range) => {
                    out.push_str(doc.text(range));
                    continue;
                }
                Segment::Reference(idx) => *idx,
            };
            let Some(reference) = doc.references().get(idx) else {
                continue;
            };

            let Ok(target) = rule_set.get(&reference.target_id) else {
                return Err(RuleError::DanglingReference {
                    from: doc.id().to_owned(),
                    target: reference.target_id.clone(),
                });
            };
            let target_id = target.id();

            if self.path.contains(&target_id) {
                let mut chain: Vec<String> = self.path.iter().map(|s| (*s).to_owned()).collect();
                chain.push(target_id.to_owned());
                return Err(RuleError::Cycle { chain });
            }
            if self.seen.contains(target_id) {
                continue;
            }
            if depth + 1 > self.max_depth {
                return Err(RuleError::DepthExceeded {
                    id: target_id.to_owned(),
                    max_depth: self.max_depth,
                });
            }

            let _ = self.seen.insert(target_id);
            self.order.push(target_id);
            self.path.push(target_id);
            self.expand(target, depth + 1, out)?;
            let _ = self.path.pop();
        }
        Ok(())
    }
}
