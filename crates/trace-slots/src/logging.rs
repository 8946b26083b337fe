//! Logging slot: one structured event per invocation
use crate::sink::LogSink;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use trace_core::{InvocationContext, Stage, TraceError};

pub const LOGGING_STAGE_ID: &str = "logging.v1";

/// Default pattern for the per-operation config key.
pub const DEFAULT_CONFIG_KEY_PATTERN: &str = "{class}:{method}";

/// Record of one invocation, posted to every sink after the call unwinds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogEvent {
    pub invoke_time: DateTime<Utc>,
    pub thread: String,
    pub trace_id: String,
    pub class_name: String,
    pub method_name: String,
    pub config_key: String,
    pub args: Vec<Value>,
    /// blake3 over the serialized args
    pub args_digest: String,
    /// Response time in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rt_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
}

impl LogEvent {
    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `{class}` and `{method}` are substituted.
    pub config_key_pattern: String,
    /// Also report failures at `error` level.
    pub log_errors: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            config_key_pattern: DEFAULT_CONFIG_KEY_PATTERN.to_string(),
            log_errors: false,
        }
    }
}

/// Times the downstream call and records its result or failure.
///
/// Failures are re-raised unchanged; this slot only observes.
pub struct LoggingSlot {
    sinks: Vec<Arc<dyn LogSink>>,
    settings: LoggingSettings,
}

impl LoggingSlot {
    pub fn new(sinks: Vec<Arc<dyn LogSink>>, settings: LoggingSettings) -> Self {
        if sinks.is_empty() {
            tracing::warn!("logging slot built without sinks, events will be dropped");
        }
        Self { sinks, settings }
    }

    pub fn with_sink(sink: Arc<dyn LogSink>) -> Self {
        Self::new(vec![sink], LoggingSettings::default())
    }

    fn config_key(&self, class: &str, method: &str) -> String {
        self.settings
            .config_key_pattern
            .replace("{class}", class)
            .replace("{method}", method)
    }

    fn start_event(&self, ctx: &InvocationContext) -> LogEvent {
        let desc = ctx.descriptor();
        let args = ctx.args().to_vec();
        let encoded = serde_json::to_vec(&args).unwrap_or_default();

        LogEvent {
            invoke_time: Utc::now(),
            thread: std::thread::current()
                .name()
                .unwrap_or("unnamed")
                .to_string(),
            trace_id: ctx.trace_id().to_string(),
            class_name: desc.declaring_type.clone(),
            method_name: desc.name.clone(),
            config_key: self.config_key(&desc.declaring_type, &desc.name),
            args,
            args_digest: format!("blake3:{}", blake3::hash(&encoded)),
            ..LogEvent::default()
        }
    }

    fn send(&self, event: &LogEvent) {
        for sink in &self.sinks {
            sink.post(event);
        }
    }
}

impl Stage for LoggingSlot {
    fn id(&self) -> &'static str {
        LOGGING_STAGE_ID
    }

    fn invoke(&self, ctx: &mut InvocationContext) -> Result<(), TraceError> {
        let mut event = self.start_event(ctx);
        let start = Instant::now();

        let outcome = ctx.advance();
        event.rt_ms = Some(start.elapsed().as_millis() as u64);

        match &outcome {
            Ok(()) => event.result = ctx.result().cloned(),
            Err(err) => {
                event.error = Some(err.to_string());
                event.error_kind = Some(err.kind().to_string());
                if self.settings.log_errors {
                    tracing::error!(
                        trace_id = %event.trace_id,
                        config_key = %event.config_key,
                        error = %err,
                        "invocation failed"
                    );
                }
            }
        }

        self.send(&event);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;
    use serde_json::json;
    use trace_core::{ChainDefinition, Interceptor, Invocation, OperationDescriptor, Target};

    fn interceptor(sink: Arc<MemorySink>, settings: LoggingSettings) -> Interceptor {
        let slot = LoggingSlot::new(vec![sink as Arc<dyn LogSink>], settings);
        Interceptor::new(ChainDefinition::from_stages(vec![Arc::new(slot)]).unwrap())
    }

    fn call(fail: bool) -> Invocation {
        let op = move |_: Option<&Target>, args: &[Value]| -> anyhow::Result<Value> {
            if fail {
                anyhow::bail!("no such user");
            }
            Ok(json!({ "id": args[0] }))
        };
        Invocation::new(OperationDescriptor::new("UserService", "find"), vec![json!(7)], Arc::new(op))
    }

    #[test]
    fn test_success_event() {
        let sink = Arc::new(MemorySink::default());
        let result = interceptor(sink.clone(), LoggingSettings::default())
            .intercept(call(false))
            .unwrap();

        let events = sink.events();
        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.config_key, "UserService:find");
        assert_eq!(event.args, vec![json!(7)]);
        assert!(event.args_digest.starts_with("blake3:"));
        assert_eq!(event.result.as_ref(), Some(&result));
        assert!(event.rt_ms.is_some());
        assert!(!event.is_failure());
    }

    #[test]
    fn test_failure_event_and_error_reraised() {
        let sink = Arc::new(MemorySink::default());
        let settings = LoggingSettings {
            config_key_pattern: "{method}@{class}".to_string(),
            log_errors: true,
        };

        let err = interceptor(sink.clone(), settings)
            .intercept(call(true))
            .unwrap_err();

        let event = &sink.events()[0];
        assert_eq!(event.config_key, "find@UserService");
        assert_eq!(event.error.as_deref(), Some(err.to_string().as_str()));
        assert_eq!(event.error_kind.as_deref(), Some("operation"));
        assert!(event.result.is_none());
    }

    #[test]
    fn test_no_sinks_still_runs() {
        let slot = LoggingSlot::new(Vec::new(), LoggingSettings::default());
        let interceptor =
            Interceptor::new(ChainDefinition::from_stages(vec![Arc::new(slot)]).unwrap());

        assert_eq!(interceptor.intercept(call(false)).unwrap(), json!({ "id": 7 }));
    }
}
