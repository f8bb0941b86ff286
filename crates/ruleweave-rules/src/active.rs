//! Current rule set holder with atomic swap.
//!
//! Readers take an `Arc` snapshot under a short read lock and compose against
//! it lock-free. A reload builds the replacement outside the lock; the write
//! lock is held only for the pointer swap. A failed reload leaves the previous
//! snapshot active.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::compose::{ComposeOptions, CompositionBundle, compose};
use crate::discovery::DiscoveryConfig;
use crate::errors::Result;
use crate::store::RuleSet;

/// Shared handle to the active [`RuleSet`].
#[derive(Debug)]
pub struct ActiveRuleSet {
    current: RwLock<Arc<RuleSet>>,
}

impl ActiveRuleSet {
    /// Wrap an initial rule set.
    pub fn new(rule_set: RuleSet) -> Self {
        Self {
            current: RwLock::new(Arc::new(rule_set)),
        }
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> Arc<RuleSet> {
        Arc::clone(&self.current.read())
    }

    /// Swap in `rule_set`, returning the previous snapshot.
    pub fn replace(&self, rule_set: RuleSet) -> Arc<RuleSet> {
        let next = Arc::new(rule_set);
        std::mem::replace(&mut *self.current.write(), next)
    }

    /// Build a new rule set with `build` and swap it in on success.
    pub fn reload<F>(&self, build: F) -> Result<Arc<RuleSet>>
    where
        F: FnOnce() -> Result<RuleSet>,
    {
        match build() {
            Ok(rule_set) => {
                let next = Arc::new(rule_set);
                *self.current.write() = Arc::clone(&next);
                info!(
                    rules = next.len(),
                    fingerprint = %next.fingerprint(),
                    "rule set reloaded"
                );
                Ok(next)
            }
            Err(err) => {
                warn!(error = %err, "rule set reload failed, keeping previous snapshot");
                Err(err)
            }
        }
    }

    /// Reload from a rules directory.
    pub fn reload_dir(
        &self,
        config: &DiscoveryConfig,
        cancel: &CancellationToken,
    ) -> Result<Arc<RuleSet>> {
        self.reload(|| RuleSet::load_dir(config, cancel))
    }

    /// Compose against the current snapshot.
    pub fn compose(&self, target_path: &str, options: &ComposeOptions) -> Result<CompositionBundle> {
        compose(&self.snapshot(), target_path, options)
    }
}
