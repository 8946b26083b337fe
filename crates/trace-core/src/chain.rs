//! Chain Definition: validated, frozen stage order shared by every invocation
use crate::error::ChainError;
use crate::stage::Stage;
use crate::terminal::default_terminal;
use std::fmt;
use std::sync::Arc;

/// An ordered, immutable sequence of stages.
///
/// Built once and read concurrently without locks. Always ends up holding
/// at least one stage that performs the operation.
#[derive(Clone)]
pub struct ChainDefinition {
    stages: Arc<[Arc<dyn Stage>]>,
    chain_id: String,
}

impl ChainDefinition {
    /// Validates and freezes a stage sequence.
    ///
    /// Absent entries are rejected with the offending position. When no
    /// stage performs the operation, the default terminal stage is appended.
    pub fn build<I>(slots: I) -> Result<Self, ChainError>
    where
        I: IntoIterator<Item = Option<Arc<dyn Stage>>>,
    {
        let mut stages = Vec::new();
        for (index, slot) in slots.into_iter().enumerate() {
            let stage = slot.ok_or(ChainError::MissingStage { index })?;
            stages.push(stage);
        }

        if stages.is_empty() {
            return Err(ChainError::Empty);
        }

        if !stages.iter().any(|s| s.performs_operation()) {
            tracing::debug!(
                len = stages.len(),
                "no stage performs the operation, appending default terminal"
            );
            stages.push(default_terminal());
        }

        let chain_id = stages
            .iter()
            .map(|s| s.id().split('.').next().unwrap_or("?"))
            .collect::<Vec<_>>()
            .join("→");

        Ok(Self {
            stages: stages.into(),
            chain_id,
        })
    }

    /// Convenience for callers that cannot produce absent entries.
    pub fn from_stages(stages: Vec<Arc<dyn Stage>>) -> Result<Self, ChainError> {
        Self::build(stages.into_iter().map(Some))
    }

    /// Bounds-checked lookup. The engine never asks past the end, so an
    /// out-of-range index is a bug and panics.
    pub fn stage_at(&self, index: usize) -> &Arc<dyn Stage> {
        assert!(
            index < self.stages.len(),
            "stage index {} out of range for chain of {}",
            index,
            self.stages.len()
        );
        &self.stages[index]
    }

    /// Number of stages, counting an auto-appended terminal.
    pub fn size(&self) -> usize {
        self.stages.len()
    }

    /// Stage ids joined by `→`, e.g. `logging→limiter→invoke`.
    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    pub fn stage_ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.stages.iter().map(|s| s.id())
    }
}

impl fmt::Debug for ChainDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainDefinition")
            .field("chain_id", &self.chain_id)
            .field("size", &self.size())
            .finish()
    }
}
