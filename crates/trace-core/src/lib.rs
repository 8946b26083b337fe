//! Trace Core: ordered interceptor chain around a single operation
//!
//! A chain is a frozen list of stages. Each intercepted call gets its own
//! context; stage 0 runs first and hands control downstream by calling
//! `advance()`, the last stage performs the operation, and post-logic runs
//! as the calls unwind.
//!
//! ```text
//! intercept → [logging] → [limiter] → [invoke] → operation
//!                  ↑           ↑           │
//!                  └── post ───┴── post ───┘
//! ```

pub mod chain;
pub mod context;
pub mod error;
pub mod interceptor;
pub mod operation;
pub mod stage;
pub mod switch;
pub mod terminal;

pub use chain::ChainDefinition;
pub use context::InvocationContext;
pub use error::{ChainError, TraceError};
pub use interceptor::Interceptor;
pub use operation::{
    ArgConstraint, Invocation, Operation, OperationDescriptor, Param, Target, Visibility,
};
pub use stage::Stage;
pub use switch::ChainHandle;
pub use terminal::{default_terminal, InvokeOperationStage, INVOKE_STAGE_ID};

/// Engine version
pub const TRACE_CORE_VERSION: &str = "1.0.0";
