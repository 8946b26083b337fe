//! Validation slot: enforces declared argument constraints before the call
use serde_json::Value;
use trace_core::{ArgConstraint, InvocationContext, OperationDescriptor, Stage, TraceError};

pub const VALIDATION_STAGE_ID: &str = "validation.v1";

/// Rejects invocations whose arguments break a parameter constraint.
#[derive(Debug, Default, Clone, Copy)]
pub struct ValidationSlot;

impl ValidationSlot {
    /// First violation in parameter order, if any.
    pub fn check(desc: &OperationDescriptor, args: &[Value]) -> Option<TraceError> {
        for (index, param) in desc.params.iter().enumerate() {
            let arg = args.get(index).unwrap_or(&Value::Null);
            for constraint in &param.constraints {
                if let Some(reason) = violation(*constraint, arg) {
                    return Some(TraceError::Validation {
                        param: format!("{}#{}", param.name, index),
                        reason: format!("{} in {}", reason, desc.simplified_name()),
                    });
                }
            }
        }
        None
    }
}

fn violation(constraint: ArgConstraint, arg: &Value) -> Option<&'static str> {
    match (constraint, arg) {
        (_, Value::Null) => Some("must not be null"),
        (ArgConstraint::NotEmpty, Value::String(s)) if s.is_empty() => Some("must not be empty"),
        (ArgConstraint::NotEmpty, Value::Array(a)) if a.is_empty() => Some("must not be empty"),
        (ArgConstraint::NotEmpty, Value::Object(o)) if o.is_empty() => Some("must not be empty"),
        _ => None,
    }
}

impl Stage for ValidationSlot {
    fn id(&self) -> &'static str {
        VALIDATION_STAGE_ID
    }

    fn invoke(&self, ctx: &mut InvocationContext) -> Result<(), TraceError> {
        if let Some(err) = Self::check(ctx.descriptor(), ctx.args()) {
            tracing::debug!(trace_id = %ctx.trace_id(), error = %err, "argument rejected");
            ctx.set_failure(err.clone());
            return Err(err);
        }
        ctx.advance()
    }
}
