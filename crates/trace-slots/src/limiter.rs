//! Flow-control slot: admits or rejects invocations per operation
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use trace_core::{InvocationContext, Stage, TraceError, Visibility};

pub const LIMITER_STAGE_ID: &str = "limiter.v1";

/// Admission held for the duration of the downstream call. Dropping it
/// releases whatever the controller reserved.
pub struct FlowEntry {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl FlowEntry {
    pub fn noop() -> Self {
        Self { release: None }
    }

    pub fn on_exit(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }
}

impl Drop for FlowEntry {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

/// Decides whether a call on `resource` may proceed.
pub trait FlowController: Send + Sync {
    /// `Err` carries the rejection reason.
    fn entry(&self, resource: &str) -> Result<FlowEntry, String>;
}

/// Admits everything.
#[derive(Debug, Default)]
pub struct AllowAll;

impl FlowController for AllowAll {
    fn entry(&self, _resource: &str) -> Result<FlowEntry, String> {
        Ok(FlowEntry::noop())
    }
}

struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn new(capacity: u32) -> Self {
        Self {
            tokens: capacity as f64,
            last_refill: Instant::now(),
        }
    }

    fn allow(&mut self, capacity: u32, refill_per_sec: f64) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * refill_per_sec).min(capacity as f64);
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Per-resource token bucket.
pub struct TokenBucketController {
    buckets: DashMap<String, TokenBucket>,
    capacity: u32,
    refill_per_sec: f64,
}

impl TokenBucketController {
    pub fn new(capacity: u32, refill_per_sec: f64) -> Self {
        Self {
            buckets: DashMap::new(),
            capacity,
            refill_per_sec,
        }
    }
}

impl FlowController for TokenBucketController {
    fn entry(&self, resource: &str) -> Result<FlowEntry, String> {
        if self.capacity == 0 {
            return Ok(FlowEntry::noop());
        }

        let mut bucket = self
            .buckets
            .entry(resource.to_string())
            .or_insert_with(|| TokenBucket::new(self.capacity));
        if bucket.allow(self.capacity, self.refill_per_sec) {
            Ok(FlowEntry::noop())
        } else {
            Err(format!("rate limit of {} exhausted", self.capacity))
        }
    }
}

/// Caps in-flight calls per resource.
pub struct ConcurrencyController {
    in_flight: DashMap<String, Arc<AtomicUsize>>,
    max_concurrent: usize,
}

impl ConcurrencyController {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            in_flight: DashMap::new(),
            max_concurrent,
        }
    }

    pub fn in_flight(&self, resource: &str) -> usize {
        self.in_flight
            .get(resource)
            .map(|c| c.load(Ordering::SeqCst))
            .unwrap_or(0)
    }
}

impl FlowController for ConcurrencyController {
    fn entry(&self, resource: &str) -> Result<FlowEntry, String> {
        let counter = self
            .in_flight
            .entry(resource.to_string())
            .or_default()
            .clone();

        let admitted = counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < self.max_concurrent).then_some(n + 1)
            })
            .is_ok();

        if admitted {
            Ok(FlowEntry::on_exit(move || {
                counter.fetch_sub(1, Ordering::SeqCst);
            }))
        } else {
            Err(format!("{} calls already in flight", self.max_concurrent))
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LimiterSettings {
    /// Token bucket size; 0 disables rate limiting.
    pub capacity: u32,
    pub refill_per_sec: f64,
    /// In-flight cap; takes precedence over the bucket when set.
    pub max_concurrent: Option<usize>,
}

impl LimiterSettings {
    pub fn controller(&self) -> Arc<dyn FlowController> {
        match self.max_concurrent {
            Some(max) => Arc::new(ConcurrencyController::new(max)),
            None if self.capacity > 0 => {
                Arc::new(TokenBucketController::new(self.capacity, self.refill_per_sec))
            }
            None => Arc::new(AllowAll),
        }
    }
}

/// Guards public operations with a [`FlowController`].
///
/// A rejected call never advances: the failure is recorded on the context
/// and returned as [`TraceError::Blocked`].
pub struct LimiterSlot {
    controller: Arc<dyn FlowController>,
}

impl LimiterSlot {
    pub fn new(controller: Arc<dyn FlowController>) -> Self {
        Self { controller }
    }
}

impl Stage for LimiterSlot {
    fn id(&self) -> &'static str {
        LIMITER_STAGE_ID
    }

    fn invoke(&self, ctx: &mut InvocationContext) -> Result<(), TraceError> {
        // Non-public operations are internal calls and are not guarded.
        if ctx.descriptor().visibility != Visibility::Public {
            return ctx.advance();
        }

        let resource = ctx.descriptor().key();
        let _entry = match self.controller.entry(&resource) {
            Ok(entry) => entry,
            Err(reason) => {
                tracing::warn!(
                    trace_id = %ctx.trace_id(),
                    operation = %ctx.descriptor().simplified_name(),
                    %reason,
                    "invocation blocked"
                );
                let err = TraceError::Blocked { resource, reason };
                ctx.set_failure(err.clone());
                return Err(err);
            }
        };

        ctx.advance()
    }
}
