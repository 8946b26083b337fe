//! Operation model: what the interception facility hands to a chain.
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// The receiver of an intercepted call, if any. Opaque to the chain; the
/// `Operation` that performs the call knows how to downcast it.
pub type Target = Arc<dyn Any + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Private,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgConstraint {
    /// Argument must be present and not `null`.
    NotNull,
    /// Argument must be non-null and, for strings, arrays and objects, non-empty.
    NotEmpty,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    #[serde(default)]
    pub constraints: Vec<ArgConstraint>,
}

impl Param {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            constraints: Vec::new(),
        }
    }

    pub fn not_null(mut self) -> Self {
        self.constraints.push(ArgConstraint::NotNull);
        self
    }

    pub fn not_empty(mut self) -> Self {
        self.constraints.push(ArgConstraint::NotEmpty);
        self
    }
}

/// Static description of an intercepted operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationDescriptor {
    /// Declaring type (ex: "OrderService")
    pub declaring_type: String,
    /// Operation name (ex: "place_order")
    pub name: String,
    /// Parameter list, in argument order
    #[serde(default)]
    pub params: Vec<Param>,
    #[serde(default)]
    pub visibility: Visibility,
}

impl OperationDescriptor {
    pub fn new(declaring_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            declaring_type: declaring_type.into(),
            name: name.into(),
            params: Vec::new(),
            visibility: Visibility::Public,
        }
    }

    pub fn with_param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// `Type.name`, used as the resource key by flow control and logging.
    pub fn key(&self) -> String {
        format!("{}.{}", self.declaring_type, self.name)
    }

    /// `Type.name(a, b)` for human-facing messages.
    pub fn simplified_name(&self) -> String {
        let params = self
            .params
            .iter()
            .map(|p| p.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        format!("{}.{}({})", self.declaring_type, self.name, params)
    }
}

impl fmt::Display for OperationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.simplified_name())
    }
}

/// The real work behind an intercepted call.
pub trait Operation: Send + Sync {
    fn invoke(&self, target: Option<&Target>, args: &[Value]) -> anyhow::Result<Value>;
}

impl<F> Operation for F
where
    F: Fn(Option<&Target>, &[Value]) -> anyhow::Result<Value> + Send + Sync,
{
    fn invoke(&self, target: Option<&Target>, args: &[Value]) -> anyhow::Result<Value> {
        self(target, args)
    }
}

/// Everything the interception facility supplies for one call.
#[derive(Clone)]
pub struct Invocation {
    pub descriptor: Arc<OperationDescriptor>,
    pub target: Option<Target>,
    pub args: Vec<Value>,
    pub operation: Arc<dyn Operation>,
}

impl Invocation {
    pub fn new(
        descriptor: OperationDescriptor,
        args: Vec<Value>,
        operation: Arc<dyn Operation>,
    ) -> Self {
        Self {
            descriptor: Arc::new(descriptor),
            target: None,
            args,
            operation,
        }
    }

    pub fn with_target(mut self, target: Target) -> Self {
        self.target = Some(target);
        self
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("descriptor", &self.descriptor)
            .field("has_target", &self.target.is_some())
            .field("args", &self.args)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_descriptor_names() {
        let desc = OperationDescriptor::new("OrderService", "place")
            .with_param(Param::new("sku").not_empty())
            .with_param(Param::new("qty"));

        assert_eq!(desc.key(), "OrderService.place");
        assert_eq!(desc.simplified_name(), "OrderService.place(sku, qty)");
        assert_eq!(desc.visibility, Visibility::Public);
    }

    #[test]
    fn test_closure_operation_sees_target() {
        let op = |target: Option<&Target>, args: &[Value]| -> anyhow::Result<Value> {
            let base = target
                .and_then(|t| t.downcast_ref::<i64>())
                .copied()
                .unwrap_or(0);
            Ok(json!(base + args[0].as_i64().unwrap_or(0)))
        };
        let target: Target = Arc::new(40_i64);

        let out = op.invoke(Some(&target), &[json!(2)]).unwrap();
        assert_eq!(out, json!(42));
    }

    #[test]
    fn test_descriptor_from_json() {
        let desc: OperationDescriptor = serde_json::from_value(json!({
            "declaring_type": "Svc",
            "name": "get",
            "params": [{ "name": "id", "constraints": ["not_null"] }],
            "visibility": "private"
        }))
        .unwrap();

        assert_eq!(desc.params[0].constraints, vec![ArgConstraint::NotNull]);
        assert_eq!(desc.visibility, Visibility::Private);
    }
}
