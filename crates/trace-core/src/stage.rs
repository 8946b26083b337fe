//! Stage Trait: the single contract every link of a chain implements
use crate::context::InvocationContext;
use crate::error::TraceError;

/// One unit of cross-cutting logic wrapped around an operation.
///
/// A wrapping stage runs its pre-logic, calls [`InvocationContext::advance`]
/// at most once, then runs its post-logic. Not calling `advance` short-circuits
/// everything downstream, the operation included. The stage that performs the
/// operation itself reports so through [`Stage::performs_operation`] and never
/// advances.
///
/// Stages are shared by every concurrent invocation of a chain, so any state
/// they keep must be synchronized. The context must not outlive `invoke`.
pub trait Stage: Send + Sync {
    /// Stage ID (ex: "logging.v1")
    fn id(&self) -> &'static str;

    /// Whether this stage performs the real operation (default: false)
    fn performs_operation(&self) -> bool {
        false
    }

    /// Runs the stage against one invocation.
    fn invoke(&self, ctx: &mut InvocationContext) -> Result<(), TraceError>;
}
