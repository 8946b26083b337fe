//! Unified Error Model
use std::error::Error as StdError;
use std::sync::Arc;
use thiserror::Error;

/// Rejections raised while building a chain. A chain that fails here is
/// never handed to an invocation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("CONFIG/EMPTY: chain requires at least one stage")]
    Empty,

    #[error("CONFIG/MISSING: slot[{index}] is absent")]
    MissingStage { index: usize },
}

/// Failures travelling through `advance()`.
///
/// `Clone` so a stage can park a copy in the context's failure slot and
/// still return the same value to the stage above it.
#[derive(Error, Debug, Clone)]
pub enum TraceError {
    /// A stage called `advance()` after the chain was exhausted.
    #[error("PROTOCOL/ADVANCE: cursor {cursor} is past the end of a {len}-stage chain")]
    ProtocolViolation { cursor: usize, len: usize },

    #[error("BLOCKED/{resource}: {reason}")]
    Blocked { resource: String, reason: String },

    #[error("VALIDATION/{param}: {reason}")]
    Validation { param: String, reason: String },

    #[error("OPERATION/{operation}: {source}")]
    Operation {
        operation: String,
        #[source]
        source: Arc<dyn StdError + Send + Sync>,
    },
}

impl TraceError {
    /// Wraps a failure raised by the underlying operation.
    pub fn operation(operation: impl Into<String>, err: anyhow::Error) -> Self {
        let boxed: Box<dyn StdError + Send + Sync> = err.into();
        Self::Operation {
            operation: operation.into(),
            source: Arc::from(boxed),
        }
    }

    /// Short kind tag, handy for log events and assertions.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ProtocolViolation { .. } => "protocol",
            Self::Blocked { .. } => "blocked",
            Self::Validation { .. } => "validation",
            Self::Operation { .. } => "operation",
        }
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::Blocked { .. })
    }
}
