//! Trace Slots: concrete stages for `trace-core` chains.
//!
//! # Chain Flow
//!
//! ```text
//! call → logging → validation → limiter → invoke → operation
//!           ↓           ↓           ↓
//!       LogEvent   Validation   Blocked
//! ```
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use serde_json::{json, Value};
//! use trace_core::{Interceptor, Invocation, OperationDescriptor, Target};
//! use trace_slots::{LogSink, MemorySink, SlotRegistry, TraceConfig};
//!
//! let config = TraceConfig::from_yaml_str("slots: [logging, limiter]").unwrap();
//! let sink = Arc::new(MemorySink::default());
//! let registry = SlotRegistry::with_defaults(&config, vec![sink.clone() as Arc<dyn LogSink>]);
//! let interceptor = Interceptor::new(registry.build_chain(&config).unwrap());
//!
//! let op = |_: Option<&Target>, args: &[Value]| -> anyhow::Result<Value> { Ok(args[0].clone()) };
//! let call = Invocation::new(OperationDescriptor::new("Echo", "echo"), vec![json!(1)], Arc::new(op));
//!
//! assert_eq!(interceptor.intercept(call).unwrap(), json!(1));
//! assert_eq!(sink.len(), 1);
//! ```

pub mod config;
pub mod limiter;
pub mod logging;
pub mod registry;
pub mod sink;
pub mod telemetry;
pub mod validation;

pub use config::{ConfigError, TraceConfig};
pub use limiter::{
    AllowAll, ConcurrencyController, FlowController, FlowEntry, LimiterSettings, LimiterSlot,
    TokenBucketController, LIMITER_STAGE_ID,
};
pub use logging::{LogEvent, LoggingSettings, LoggingSlot, LOGGING_STAGE_ID};
pub use registry::SlotRegistry;
pub use sink::{LogSink, MemorySink, TracingSink};
pub use validation::{ValidationSlot, VALIDATION_STAGE_ID};
