//! Default terminal stage: performs the intercepted operation
use crate::context::InvocationContext;
use crate::error::TraceError;
use crate::stage::Stage;
use once_cell::sync::Lazy;
use std::sync::Arc;

pub const INVOKE_STAGE_ID: &str = "invoke.v1";

static DEFAULT_TERMINAL: Lazy<Arc<dyn Stage>> = Lazy::new(|| Arc::new(InvokeOperationStage));

/// Shared instance appended to chains that lack an operation stage.
pub fn default_terminal() -> Arc<dyn Stage> {
    Arc::clone(&DEFAULT_TERMINAL)
}

/// Calls the operation with the context's target and current arguments.
///
/// Success lands in the result slot. A failure is written to the failure
/// slot and returned, so every outer stage sees it on the way back up.
#[derive(Debug, Default, Clone, Copy)]
pub struct InvokeOperationStage;

impl Stage for InvokeOperationStage {
    fn id(&self) -> &'static str {
        INVOKE_STAGE_ID
    }

    fn performs_operation(&self) -> bool {
        true
    }

    fn invoke(&self, ctx: &mut InvocationContext) -> Result<(), TraceError> {
        let outcome = ctx.operation().invoke(ctx.target(), ctx.args());
        match outcome {
            Ok(value) => {
                ctx.set_result(value);
                Ok(())
            }
            Err(err) => {
                let err = TraceError::operation(ctx.descriptor().key(), err);
                ctx.set_failure(err.clone());
                Err(err)
            }
        }
    }
}
