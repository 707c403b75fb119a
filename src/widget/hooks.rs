//! Host-facing hooks: the opaque relay and optional diagnostics
//!
//! Every failure path in the widget is silent by default. Installing a
//! diagnostics hook makes them observable without changing behaviour.

use super::scheduler::TaskHandle;
use serde_json::Value;
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Something the widget ignored or degraded on
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// No container with the configured id exists
    MountPointMissing { container_id: String },
    /// Mounting failed for another reason
    MountFailed { reason: String },
    /// A message came from an origin other than the remote origin
    OriginRejected { origin: String },
    /// A trusted message was not a valid envelope
    MalformedMessage { reason: String },
    /// A trusted message had a type this version does not handle
    UnknownMessage { kind: String },
    /// An operation was invoked on a widget that never mounted
    InertCall { operation: &'static str },
    /// `widget:resize` asked for a non-finite or sub-pixel height
    ResizeRejected { requested: f64 },
    /// `widget:resize` asked for more than the allowed height
    ResizeClamped { requested: u32, applied: u32 },
    /// A `widget:message` relay exceeded the relay rate limit
    RelayThrottled,
    /// Posting into the iframe failed
    DeliveryFailed { kind: &'static str, reason: String },
    /// A scheduled task fired after being superseded
    StaleTask { handle: TaskHandle },
}

/// Receives `widget:message` payloads
pub type RelayHook = Box<dyn FnMut(&Value) + Send>;

/// Receives diagnostics
pub type DiagnosticHook = Box<dyn FnMut(&Diagnostic) + Send>;

/// Hooks installed by the host
#[derive(Default)]
pub struct WidgetHooks {
    relay: Option<RelayHook>,
    diagnostics: Option<DiagnosticHook>,
}

impl WidgetHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe agent events relayed through `widget:message`.
    pub fn on_relay(mut self, hook: impl FnMut(&Value) + Send + 'static) -> Self {
        self.relay = Some(Box::new(hook));
        self
    }

    /// Collect relayed payloads into `queue` instead of calling out while
    /// the widget is borrowed; the host drains it once the widget call
    /// has returned.
    pub fn queue_relays(self, queue: &RelayQueue) -> Self {
        let queue = queue.clone();
        self.on_relay(move |data| queue.push(data.clone()))
    }

    /// Observe diagnostics.
    pub fn on_diagnostic(mut self, hook: impl FnMut(&Diagnostic) + Send + 'static) -> Self {
        self.diagnostics = Some(Box::new(hook));
        self
    }

    pub(crate) fn relay(&mut self, data: &Value) {
        if let Some(hook) = self.relay.as_mut() {
            hook(data);
        }
    }

    pub(crate) fn report(&mut self, diagnostic: Diagnostic) {
        if let Some(hook) = self.diagnostics.as_mut() {
            hook(&diagnostic);
        }
    }
}

impl fmt::Debug for WidgetHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WidgetHooks")
            .field("relay", &self.relay.is_some())
            .field("diagnostics", &self.diagnostics.is_some())
            .finish()
    }
}

/// Relayed payloads waiting for delivery to the host page
#[derive(Debug, Clone, Default)]
pub struct RelayQueue {
    inner: Arc<Mutex<VecDeque<Value>>>,
}

impl RelayQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, data: Value) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(data);
    }

    /// Take every queued payload, oldest first
    pub fn drain(&self) -> Vec<Value> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
