//! Invocation Context: per-call state plus the cursor-advance protocol
use crate::chain::ChainDefinition;
use crate::error::TraceError;
use crate::operation::{Invocation, Operation, OperationDescriptor, Target};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Mutable state for exactly one invocation.
///
/// Created fresh for every call, driven by stages through [`advance`], then
/// dropped. Never shared between invocations.
///
/// [`advance`]: InvocationContext::advance
pub struct InvocationContext {
    chain: Arc<ChainDefinition>,
    cursor: usize,
    trace_id: String,
    descriptor: Arc<OperationDescriptor>,
    target: Option<Target>,
    args: Vec<Value>,
    operation: Arc<dyn Operation>,
    result: Option<Value>,
    failure: Option<TraceError>,
    attributes: HashMap<String, Value>,
}

impl InvocationContext {
    pub fn new(chain: Arc<ChainDefinition>, invocation: Invocation) -> Self {
        Self {
            chain,
            cursor: 0,
            trace_id: uuid::Uuid::new_v4().to_string(),
            descriptor: invocation.descriptor,
            target: invocation.target,
            args: invocation.args,
            operation: invocation.operation,
            result: None,
            failure: None,
            attributes: HashMap::new(),
        }
    }

    /// Hands control to the next stage.
    ///
    /// Moves the cursor forward by one, then calls into that stage with this
    /// same context. Returns once the stage returns, carrying its outcome
    /// through untouched. Calling this once the chain is exhausted is a bug
    /// in the calling stage and yields [`TraceError::ProtocolViolation`].
    pub fn advance(&mut self) -> Result<(), TraceError> {
        let len = self.chain.size();
        if self.cursor >= len {
            tracing::error!(
                trace_id = %self.trace_id,
                cursor = self.cursor,
                len,
                "advance called on an exhausted chain"
            );
            return Err(TraceError::ProtocolViolation {
                cursor: self.cursor,
                len,
            });
        }

        let stage = Arc::clone(self.chain.stage_at(self.cursor));
        self.cursor += 1;
        tracing::trace!(stage = stage.id(), cursor = self.cursor, "advance");

        stage.invoke(self)
    }

    /// Index of the next stage to run; equals the chain size once exhausted.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.chain.size()
    }

    pub fn chain(&self) -> &ChainDefinition {
        &self.chain
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn descriptor(&self) -> &OperationDescriptor {
        &self.descriptor
    }

    pub fn target(&self) -> Option<&Target> {
        self.target.as_ref()
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Stages may rewrite arguments before the operation runs.
    pub fn args_mut(&mut self) -> &mut Vec<Value> {
        &mut self.args
    }

    pub fn operation(&self) -> &Arc<dyn Operation> {
        &self.operation
    }

    /// Only meaningful once the operation stage has run, i.e. from
    /// post-advance logic.
    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    pub fn set_result(&mut self, value: Value) {
        self.result = Some(value);
    }

    pub fn take_result(&mut self) -> Option<Value> {
        self.result.take()
    }

    pub fn failure(&self) -> Option<&TraceError> {
        self.failure.as_ref()
    }

    /// Records a failure for outer stages to inspect. Whether to also
    /// return it is the caller's decision.
    pub fn set_failure(&mut self, err: TraceError) {
        self.failure = Some(err);
    }

    pub fn clear_failure(&mut self) -> Option<TraceError> {
        self.failure.take()
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: Value) {
        self.attributes.insert(key.into(), value);
    }

    pub fn attributes(&self) -> &HashMap<String, Value> {
        &self.attributes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::Stage;
    use serde_json::json;

    struct Recorder;

    impl Stage for Recorder {
        fn id(&self) -> &'static str {
            "recorder.v1"
        }

        fn invoke(&self, ctx: &mut InvocationContext) -> Result<(), TraceError> {
            ctx.set_attribute("seen_cursor", json!(ctx.cursor()));
            ctx.advance()
        }
    }

    fn invocation() -> Invocation {
        let op = |_: Option<&Target>, args: &[Value]| -> anyhow::Result<Value> {
            Ok(json!(args.len()))
        };
        Invocation::new(
            OperationDescriptor::new("Svc", "count"),
            vec![json!(1), json!(2)],
            Arc::new(op),
        )
    }

    #[test]
    fn test_fresh_context_state() {
        let chain = Arc::new(ChainDefinition::from_stages(vec![Arc::new(Recorder)]).unwrap());
        let ctx = InvocationContext::new(chain, invocation());

        assert_eq!(ctx.cursor(), 0);
        assert!(ctx.result().is_none());
        assert!(ctx.failure().is_none());
        assert!(!ctx.trace_id().is_empty());
        assert_eq!(ctx.descriptor().key(), "Svc.count");
    }

    #[test]
    fn test_advance_runs_to_exhaustion() {
        let chain = Arc::new(ChainDefinition::from_stages(vec![Arc::new(Recorder)]).unwrap());
        let mut ctx = InvocationContext::new(chain, invocation());

        ctx.advance().unwrap();

        assert!(ctx.is_exhausted());
        assert_eq!(ctx.cursor(), 2);
        // Cursor had already moved past the recorder when it ran.
        assert_eq!(ctx.attribute("seen_cursor"), Some(&json!(1)));
        assert_eq!(ctx.result(), Some(&json!(2)));
    }

    #[test]
    fn test_advance_after_exhaustion_is_violation() {
        let chain = Arc::new(ChainDefinition::from_stages(vec![Arc::new(Recorder)]).unwrap());
        let mut ctx = InvocationContext::new(chain, invocation());
        ctx.advance().unwrap();

        let err = ctx.advance().unwrap_err();
        assert!(matches!(
            err,
            TraceError::ProtocolViolation { cursor: 2, len: 2 }
        ));
        // Nothing moved.
        assert_eq!(ctx.cursor(), 2);
    }

    #[test]
    fn test_args_can_be_rewritten() {
        let chain = Arc::new(ChainDefinition::from_stages(vec![Arc::new(Recorder)]).unwrap());
        let mut ctx = InvocationContext::new(chain, invocation());

        ctx.args_mut().push(json!(3));
        ctx.advance().unwrap();

        assert_eq!(ctx.result(), Some(&json!(3)));
    }
}
