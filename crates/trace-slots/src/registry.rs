//! Slot Registry: resolves configured slot names into stage instances
use crate::config::{ConfigError, TraceConfig};
use crate::limiter::LimiterSlot;
use crate::logging::LoggingSlot;
use crate::sink::LogSink;
use crate::validation::ValidationSlot;
use std::collections::HashMap;
use std::sync::Arc;
use trace_core::{default_terminal, ChainDefinition, Stage};

pub struct SlotRegistry {
    slots: HashMap<String, Arc<dyn Stage>>,
}

impl SlotRegistry {
    pub fn new() -> Self {
        Self {
            slots: HashMap::new(),
        }
    }

    /// Registers `logging`, `validation`, `limiter` and `invoke` from config.
    pub fn with_defaults(config: &TraceConfig, sinks: Vec<Arc<dyn LogSink>>) -> Self {
        let mut registry = Self::new();
        registry.register(
            "logging",
            Arc::new(LoggingSlot::new(sinks, config.logging.clone())),
        );
        registry.register("validation", Arc::new(ValidationSlot));
        registry.register(
            "limiter",
            Arc::new(LimiterSlot::new(config.limiter.controller())),
        );
        registry.register("invoke", default_terminal());
        registry
    }

    /// Later registrations under the same name win.
    pub fn register(&mut self, name: impl Into<String>, stage: Arc<dyn Stage>) {
        self.slots.insert(name.into(), stage);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Stage>> {
        self.slots.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.slots.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Builds the chain named by `config.slots`. An unknown name is an
    /// absent entry and fails with its position.
    pub fn build_chain(&self, config: &TraceConfig) -> Result<ChainDefinition, ConfigError> {
        let resolved = config.slots.iter().map(|name| {
            let stage = self.get(name);
            if stage.is_none() {
                tracing::warn!(slot = %name, "unknown slot name");
            }
            stage
        });
        Ok(ChainDefinition::build(resolved)?)
    }
}

impl Default for SlotRegistry {
    fn default() -> Self {
        Self::new()
    }
}
