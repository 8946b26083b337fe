//! Interceptor: entry point used by the call-interception facility
use crate::chain::ChainDefinition;
use crate::context::InvocationContext;
use crate::error::TraceError;
use crate::operation::Invocation;
use crate::switch::ChainHandle;
use serde_json::Value;
use std::sync::Arc;

/// Runs intercepted calls through the installed chain.
pub struct Interceptor {
    chain: ChainHandle,
}

impl Interceptor {
    pub fn new(chain: ChainDefinition) -> Self {
        Self {
            chain: ChainHandle::new(chain),
        }
    }

    /// Executes one call synchronously on the calling thread.
    ///
    /// Returns whatever the chain leaves in the result slot (`Null` when a
    /// stage short-circuited without substituting one), or the failure the
    /// outermost stage raised.
    pub fn intercept(&self, invocation: Invocation) -> Result<Value, TraceError> {
        let mut ctx = self.context(invocation);
        let span = tracing::debug_span!(
            "invocation",
            trace_id = %ctx.trace_id(),
            operation = %ctx.descriptor().key(),
            chain = ctx.chain().chain_id(),
        );
        let _entered = span.enter();

        ctx.advance()?;
        Ok(ctx.take_result().unwrap_or(Value::Null))
    }

    /// Builds a context bound to the current chain without running it.
    pub fn context(&self, invocation: Invocation) -> InvocationContext {
        InvocationContext::new(self.chain.load(), invocation)
    }

    pub fn chain(&self) -> Arc<ChainDefinition> {
        self.chain.load()
    }

    /// Replaces the chain for invocations started from now on.
    pub fn reconfigure(&self, chain: ChainDefinition) -> Arc<ChainDefinition> {
        self.chain.swap(chain)
    }

    pub fn handle(&self) -> &ChainHandle {
        &self.chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::{OperationDescriptor, Target};
    use crate::stage::Stage;
    use serde_json::json;

    struct Deny;

    impl Stage for Deny {
        fn id(&self) -> &'static str {
            "deny.v1"
        }

        fn invoke(&self, _ctx: &mut InvocationContext) -> Result<(), TraceError> {
            Ok(())
        }
    }

    fn echo() -> Invocation {
        let op = |_: Option<&Target>, args: &[Value]| -> anyhow::Result<Value> {
            Ok(args.first().cloned().unwrap_or(Value::Null))
        };
        Invocation::new(OperationDescriptor::new("Echo", "echo"), vec![json!("hi")], Arc::new(op))
    }

    #[test]
    fn test_intercept_returns_result() {
        let interceptor = Interceptor::new(
            ChainDefinition::from_stages(vec![crate::terminal::default_terminal()]).unwrap(),
        );
        assert_eq!(interceptor.intercept(echo()).unwrap(), json!("hi"));
    }

    #[test]
    fn test_silent_short_circuit_yields_null() {
        let interceptor =
            Interceptor::new(ChainDefinition::from_stages(vec![Arc::new(Deny)]).unwrap());
        assert_eq!(interceptor.intercept(echo()).unwrap(), Value::Null);
    }

    #[test]
    fn test_reconfigure_applies_to_next_call() {
        let interceptor =
            Interceptor::new(ChainDefinition::from_stages(vec![Arc::new(Deny)]).unwrap());
        interceptor.reconfigure(
            ChainDefinition::from_stages(vec![crate::terminal::default_terminal()]).unwrap(),
        );
        assert_eq!(interceptor.intercept(echo()).unwrap(), json!("hi"));
    }
}
