//! Log sinks: where finished log events go
use crate::logging::LogEvent;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Receives one event per completed invocation. Called from the invoking
/// thread, so implementations should hand off quickly.
pub trait LogSink: Send + Sync {
    fn post(&self, event: &LogEvent);
}

/// Emits each event as a JSON line through `tracing`.
#[derive(Debug, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn post(&self, event: &LogEvent) {
        match serde_json::to_string(event) {
            Ok(line) => {
                tracing::info!(target: "trace_slots::events", config_key = %event.config_key, "{}", line)
            }
            Err(e) => {
                tracing::warn!(config_key = %event.config_key, error = %e, "unserializable log event")
            }
        }
    }
}

/// Keeps the most recent events in memory.
pub struct MemorySink {
    events: Mutex<VecDeque<LogEvent>>,
    capacity: usize,
}

impl MemorySink {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity: capacity.max(1),
        }
    }

    pub fn events(&self) -> Vec<LogEvent> {
        self.events.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl LogSink for MemorySink {
    fn post(&self, event: &LogEvent) {
        let mut events = self.events.lock();
        if events.len() == self.capacity {
            events.pop_front();
        }
        events.push_back(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(method: &str) -> LogEvent {
        LogEvent {
            method_name: method.to_string(),
            ..LogEvent::default()
        }
    }

    #[test]
    fn test_memory_sink_evicts_oldest() {
        let sink = MemorySink::new(2);
        sink.post(&event("a"));
        sink.post(&event("b"));
        sink.post(&event("c"));

        let names: Vec<_> = sink.events().into_iter().map(|e| e.method_name).collect();
        assert_eq!(names, vec!["b", "c"]);
    }

    #[test]
    fn test_tracing_sink_accepts_event() {
        TracingSink.post(&event("a"));
    }
}
