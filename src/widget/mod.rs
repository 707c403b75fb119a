//! Embeddable agent widget
//!
//! A `Widget` owns one iframe pointed at the remote agent origin, a toggle
//! button, and the restricted message channel between the two windows.
//!
//! ```text
//!   host page                           remote origin
//!  ┌──────────────────────────┐        ┌───────────────────────┐
//!  │ #ai-agent-widget         │        │  /widget?agentId=...  │
//!  │  ┌────────────────────┐  │ config │                       │
//!  │  │ iframe ────────────┼──┼──────► │  embedded agent UI    │
//!  │  └────────────────────┘  │ ◄──────┤  ready/close/resize/  │
//!  │  [ toggle button ]       │ origin │  message              │
//!  └──────────────────────────┘ guard  └───────────────────────┘
//! ```
//!
//! The widget is driven from outside: the host routes button clicks to
//! `toggle`, every received message to `handle_message`, and every fired
//! scheduler task to `run_task`.

pub mod config;
pub mod headless;
pub mod hooks;
pub mod lifecycle;
pub mod render;
pub mod scheduler;
pub mod style;

pub use config::{BorderRadius, ButtonSize, Position, Theme, WidgetConfig, WidgetOptions};
pub use headless::{HeadlessDom, PostedMessage};
pub use hooks::{Diagnostic, RelayQueue, WidgetHooks};
pub use lifecycle::{Effect, Event, Visibility};
pub use render::{ElementKind, NodeId, RenderTarget};
pub use scheduler::{Deferral, ManualScheduler, Scheduler, Task, TaskHandle};

use crate::error::{Error, Result};
use crate::protocol::{InboundMessage, Origin, OutboundMessage};
use crate::relay::{RelayLimit, RelayLimiter};
use lifecycle::Transition;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// Id of the host-provided container element
pub const DEFAULT_CONTAINER_ID: &str = "ai-agent-widget";

/// Path of the embedded agent UI on the remote origin
pub const DEFAULT_FRAME_PATH: &str = "/widget";

/// Delay between concealing the iframe and removing it from layout
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(300);

/// Largest share of the viewport height a resize may claim
pub const DEFAULT_MAX_HEIGHT_RATIO: f64 = 0.8;

const BUTTON_TEXT: &str = "\u{1F4AC}";
const FRAME_TITLE: &str = "AI agent chat";

/// Host-side settings that are not part of the agent-facing config
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetSettings {
    /// The only origin messages are accepted from and posted to
    pub remote_origin: Origin,
    pub container_id: String,
    pub frame_path: String,
    pub settle_delay: Duration,
    pub max_height_ratio: f64,
    /// Smallest height a resize can apply; 0 disables the floor
    pub min_height_px: u32,
    pub relay_limit: Option<RelayLimit>,
}

impl Default for WidgetSettings {
    fn default() -> Self {
        Self {
            remote_origin: Origin::default(),
            container_id: DEFAULT_CONTAINER_ID.to_string(),
            frame_path: DEFAULT_FRAME_PATH.to_string(),
            settle_delay: DEFAULT_SETTLE_DELAY,
            max_height_ratio: DEFAULT_MAX_HEIGHT_RATIO,
            min_height_px: 0,
            relay_limit: None,
        }
    }
}

/// Elements created at mount; never recreated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WidgetNodes {
    pub container: NodeId,
    pub frame: NodeId,
    pub button: NodeId,
}

/// Point-in-time view of a widget
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetSnapshot {
    pub agent_id: String,
    pub state: Visibility,
    pub is_open: bool,
    pub inert: bool,
    pub frame_height: Option<u32>,
    pub pending_task: Option<u64>,
}

/// Builder for mounting a widget
#[derive(Debug)]
pub struct WidgetBuilder {
    config: WidgetConfig,
    settings: WidgetSettings,
    hooks: WidgetHooks,
}

impl WidgetBuilder {
    pub fn new(config: WidgetConfig) -> Self {
        Self {
            config,
            settings: WidgetSettings::default(),
            hooks: WidgetHooks::default(),
        }
    }

    /// Set the host-side settings
    pub fn settings(mut self, settings: WidgetSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Install relay and diagnostics hooks
    pub fn hooks(mut self, hooks: WidgetHooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Mount, degrading to an inert widget on failure.
    pub fn mount<R: RenderTarget, S: Scheduler>(self, render: R, scheduler: S) -> Widget<R, S> {
        let mut widget = self.assemble(render, scheduler);
        if let Err(e) = widget.attach() {
            tracing::error!(
                agent_id = %widget.config.agent_id(),
                container = %widget.settings.container_id,
                error = %e,
                "Failed to mount agent widget; it will stay inert"
            );
        }
        widget
    }

    /// Mount, returning the failure instead of degrading.
    pub fn try_mount<R: RenderTarget, S: Scheduler>(
        self,
        render: R,
        scheduler: S,
    ) -> Result<Widget<R, S>> {
        let mut widget = self.assemble(render, scheduler);
        widget.attach()?;
        Ok(widget)
    }

    fn assemble<R: RenderTarget, S: Scheduler>(self, render: R, scheduler: S) -> Widget<R, S> {
        let limiter = self.settings.relay_limit.map(RelayLimiter::new);
        Widget {
            config: self.config,
            settings: self.settings,
            hooks: self.hooks,
            render,
            scheduler,
            nodes: None,
            state: Visibility::Closed,
            pending: None,
            frame_height: None,
            limiter,
        }
    }
}

/// A mounted (or inert) agent widget
#[derive(Debug)]
pub struct Widget<R, S> {
    config: WidgetConfig,
    settings: WidgetSettings,
    hooks: WidgetHooks,
    render: R,
    scheduler: S,
    /// `None` when mounting failed; every operation is then a no-op
    nodes: Option<WidgetNodes>,
    state: Visibility,
    pending: Option<TaskHandle>,
    frame_height: Option<u32>,
    limiter: Option<RelayLimiter>,
}

impl<R: RenderTarget, S: Scheduler> Widget<R, S> {
    /// Mount with default hooks; see `WidgetBuilder::mount`.
    pub fn mount(config: WidgetConfig, settings: WidgetSettings, render: R, scheduler: S) -> Self {
        WidgetBuilder::new(config).settings(settings).mount(render, scheduler)
    }

    /// Mount with default hooks; see `WidgetBuilder::try_mount`.
    pub fn try_mount(
        config: WidgetConfig,
        settings: WidgetSettings,
        render: R,
        scheduler: S,
    ) -> Result<Self> {
        WidgetBuilder::new(config)
            .settings(settings)
            .try_mount(render, scheduler)
    }

    fn attach(&mut self) -> Result<()> {
        match self.build() {
            Ok(nodes) => {
                self.nodes = Some(nodes);
                tracing::info!(
                    agent_id = %self.config.agent_id(),
                    origin = %self.settings.remote_origin,
                    position = %self.config.position(),
                    "Agent widget mounted"
                );
                Ok(())
            }
            Err(e) => {
                let diagnostic = match &e {
                    Error::MountPoint(id) => Diagnostic::MountPointMissing {
                        container_id: id.clone(),
                    },
                    other => Diagnostic::MountFailed {
                        reason: other.to_string(),
                    },
                };
                self.hooks.report(diagnostic);
                Err(e)
            }
        }
    }

    fn build(&mut self) -> Result<WidgetNodes> {
        let container = self
            .render
            .mount_point(&self.settings.container_id)
            .ok_or_else(|| Error::MountPoint(self.settings.container_id.clone()))?;
        for (property, value) in style::container_style(self.config.position()) {
            self.render.set_style(container, property, value);
        }

        let frame = self.render.create_element(ElementKind::Iframe)?;
        let src = self
            .config
            .iframe_url(&self.settings.remote_origin, &self.settings.frame_path);
        self.render.set_attribute(frame, "src", &src);
        self.render.set_attribute(frame, "allow", "microphone");
        self.render.set_attribute(frame, "title", FRAME_TITLE);
        for (property, value) in style::frame_style() {
            self.render.set_style(frame, property, value);
        }

        let button = self.render.create_element(ElementKind::Button)?;
        self.render.set_attribute(button, "type", "button");
        self.render.set_attribute(button, "aria-label", "Open chat");
        self.render.set_attribute(button, "aria-expanded", "false");
        self.render.set_text(button, BUTTON_TEXT);
        for (property, value) in style::button_style(&self.config) {
            self.render.set_style(button, property, value);
        }

        self.render.append_child(container, frame)?;
        self.render.append_child(container, button)?;

        Ok(WidgetNodes {
            container,
            frame,
            button,
        })
    }

    /// Button click: flip visibility.
    pub fn toggle(&mut self) {
        self.trigger("toggle", Event::Toggle);
    }

    /// Open if closed.
    pub fn open(&mut self) {
        self.trigger("open", Event::OpenRequested);
    }

    /// Close if open.
    pub fn close(&mut self) {
        self.trigger("close", Event::CloseRequested);
    }

    fn trigger(&mut self, operation: &'static str, event: Event) {
        if self.nodes.is_none() {
            self.hooks.report(Diagnostic::InertCall { operation });
            return;
        }
        self.dispatch(event);
    }

    /// Deliver a fired scheduler task.
    ///
    /// Only the most recently scheduled task is honoured; anything else was
    /// superseded by a later transition.
    pub fn run_task(&mut self, handle: TaskHandle, task: Task) {
        if self.nodes.is_none() {
            return;
        }
        if self.pending != Some(handle) {
            tracing::trace!(handle = handle.raw(), ?task, "Ignoring superseded widget task");
            self.hooks.report(Diagnostic::StaleTask { handle });
            return;
        }
        self.pending = None;
        self.dispatch(task.into());
    }

    /// Handle a message received from `origin`.
    ///
    /// Messages from any origin other than the remote origin are dropped
    /// before the payload is looked at.
    pub fn handle_message(&mut self, origin: &str, payload: &Value) {
        if !self.accepts_origin(origin) {
            self.hooks.report(Diagnostic::OriginRejected {
                origin: origin.to_string(),
            });
            return;
        }
        if self.nodes.is_none() {
            self.hooks.report(Diagnostic::InertCall {
                operation: "handle_message",
            });
            return;
        }

        let message = match InboundMessage::decode(payload) {
            Ok(message) => message,
            Err(e) => {
                self.hooks.report(Diagnostic::MalformedMessage {
                    reason: e.to_string(),
                });
                return;
            }
        };

        match message {
            InboundMessage::Ready => {
                self.post(OutboundMessage::Config(self.config.clone()));
            }
            InboundMessage::Close => self.dispatch(Event::CloseRequested),
            InboundMessage::Resize { height } => self.resize(height),
            InboundMessage::Relay(data) => self.relay(&data),
            InboundMessage::Unknown(kind) => {
                self.hooks.report(Diagnostic::UnknownMessage { kind });
            }
        }
    }

    pub fn accepts_origin(&self, origin: &str) -> bool {
        self.settings.remote_origin.matches(origin)
    }

    fn dispatch(&mut self, event: Event) {
        let Transition { next, effects } = lifecycle::transition(self.state, event);
        if next != self.state {
            tracing::debug!(from = ?self.state, to = ?next, ?event, "Widget visibility transition");
        }
        self.state = next;
        for effect in effects {
            self.apply(effect);
        }
    }

    fn apply(&mut self, effect: Effect) {
        let Some(nodes) = self.nodes else {
            return;
        };
        match effect {
            Effect::CancelPending => {
                if let Some(handle) = self.pending.take() {
                    self.scheduler.cancel(handle);
                }
            }
            Effect::ShowFrame => self.render.set_style(nodes.frame, "display", "block"),
            Effect::Reveal => {
                self.render.set_style(nodes.frame, "opacity", "1");
                self.render
                    .set_style(nodes.frame, "transform", style::RESTING_TRANSFORM);
            }
            Effect::Conceal => {
                self.render.set_style(nodes.frame, "opacity", "0");
                self.render
                    .set_style(nodes.frame, "transform", style::HIDDEN_TRANSFORM);
            }
            Effect::HideFrame => self.render.set_style(nodes.frame, "display", "none"),
            Effect::ScheduleReveal => {
                self.pending = Some(self.scheduler.schedule(Deferral::NextFrame, Task::Reveal));
            }
            Effect::ScheduleSettle => {
                let delay = Deferral::After(self.settings.settle_delay);
                self.pending = Some(self.scheduler.schedule(delay, Task::Settle));
            }
            Effect::NotifyVisibility(is_visible) => {
                self.render.set_attribute(
                    nodes.button,
                    "aria-expanded",
                    if is_visible { "true" } else { "false" },
                );
                self.post(OutboundMessage::visibility(is_visible));
            }
        }
    }

    fn resize(&mut self, requested: f64) {
        let Some(nodes) = self.nodes else {
            return;
        };
        if !requested.is_finite() || requested < 1.0 {
            self.hooks.report(Diagnostic::ResizeRejected { requested });
            return;
        }

        let floor = f64::from(self.settings.min_height_px).max(1.0);
        let wanted = requested.round().max(floor);
        let applied = match self.height_ceiling() {
            Some(ceiling) if wanted > ceiling => {
                let applied = ceiling.max(floor) as u32;
                self.hooks.report(Diagnostic::ResizeClamped {
                    requested: wanted as u32,
                    applied,
                });
                applied
            }
            Some(_) => wanted as u32,
            None => {
                tracing::debug!(requested, "Viewport height unknown; resize not clamped");
                wanted as u32
            }
        };

        self.render
            .set_style(nodes.frame, "height", &format!("{}px", applied));
        self.frame_height = Some(applied);
    }

    /// `floor(max_height_ratio * viewport height)`, in whole pixels; `None`
    /// while the viewport reports no usable height
    fn height_ceiling(&self) -> Option<f64> {
        let viewport = self.render.viewport_height();
        if !viewport.is_finite() || viewport <= 0.0 {
            return None;
        }
        Some((self.settings.max_height_ratio * viewport).floor())
    }

    fn relay(&mut self, data: &Value) {
        if let Some(limiter) = self.limiter.as_mut() {
            if !limiter.allow(self.scheduler.now()) {
                self.hooks.report(Diagnostic::RelayThrottled);
                return;
            }
        }
        self.hooks.relay(data);
    }

    fn post(&mut self, message: OutboundMessage) {
        let Some(nodes) = self.nodes else {
            return;
        };
        let kind = message.kind();
        if let Err(e) = self.render.post_message(
            nodes.frame,
            &message.to_value(),
            self.settings.remote_origin.as_str(),
        ) {
            tracing::debug!(kind, error = %e, "Failed to post message to agent frame");
            self.hooks.report(Diagnostic::DeliveryFailed {
                kind,
                reason: e.to_string(),
            });
        }
    }

    /// `Opening` or `Open`
    pub fn is_open(&self) -> bool {
        self.state.is_open()
    }

    pub fn state(&self) -> Visibility {
        self.state
    }

    /// Height applied by the last accepted resize
    pub fn frame_height(&self) -> Option<u32> {
        self.frame_height
    }

    /// Mounting failed and the widget ignores everything
    pub fn is_inert(&self) -> bool {
        self.nodes.is_none()
    }

    pub fn nodes(&self) -> Option<WidgetNodes> {
        self.nodes
    }

    pub fn pending_task(&self) -> Option<TaskHandle> {
        self.pending
    }

    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }

    pub fn settings(&self) -> &WidgetSettings {
        &self.settings
    }

    pub fn render(&self) -> &R {
        &self.render
    }

    pub fn render_mut(&mut self) -> &mut R {
        &mut self.render
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    pub fn snapshot(&self) -> WidgetSnapshot {
        WidgetSnapshot {
            agent_id: self.config.agent_id().to_string(),
            state: self.state,
            is_open: self.is_open(),
            inert: self.is_inert(),
            frame_height: self.frame_height,
            pending_task: self.pending.map(TaskHandle::raw),
        }
    }
}

impl<R: RenderTarget> Widget<R, ManualScheduler> {
    /// Fire every task waiting for the next animation frame.
    pub fn flush_frame(&mut self) {
        for (handle, task) in self.scheduler.next_frame() {
            self.run_task(handle, task);
        }
    }

    /// Advance the manual clock and fire the timers that came due.
    pub fn advance(&mut self, by: Duration) {
        for (handle, task) in self.scheduler.advance(by) {
            self.run_task(handle, task);
        }
    }
}
