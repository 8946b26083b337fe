//! Hot-swappable chain: whole-sequence replacement, never in-place edits
use crate::chain::ChainDefinition;
use arc_swap::ArcSwap;
use std::sync::Arc;

/// Holds the chain that new invocations start from.
///
/// An invocation loads one snapshot and keeps it until it finishes, so it
/// sees either the old or the new sequence in full.
pub struct ChainHandle {
    current: ArcSwap<ChainDefinition>,
    previous: ArcSwap<ChainDefinition>,
}

impl ChainHandle {
    pub fn new(initial: ChainDefinition) -> Self {
        let initial = Arc::new(initial);
        Self {
            current: ArcSwap::from(initial.clone()),
            previous: ArcSwap::from(initial),
        }
    }

    pub fn load(&self) -> Arc<ChainDefinition> {
        self.current.load_full()
    }

    /// Installs `next` and returns the chain it replaced.
    pub fn swap(&self, next: ChainDefinition) -> Arc<ChainDefinition> {
        let next = Arc::new(next);
        let to = next.chain_id().to_string();
        let replaced = self.current.swap(next);
        tracing::info!(from = replaced.chain_id(), %to, "chain swapped");
        self.previous.store(replaced.clone());
        replaced
    }

    /// Restores the chain that was active before the last swap.
    pub fn rollback(&self) -> Arc<ChainDefinition> {
        let chain = self.previous.load_full();
        self.current.store(chain.clone());
        chain
    }
}
