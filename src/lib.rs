//! Agent Embed - Embeddable chat widget for hosted AI agents
//!
//! Agent Embed lets a third-party page host a conversational agent served
//! from a remote origin. The page gets a floating toggle button and an
//! iframe; the two windows talk over a small, origin-restricted
//! postMessage protocol.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                            Host Page                              │
//! │  window.aiAgentWidgetConfig ──► embed::bootstrap                  │
//! │                                      │                            │
//! │  ┌───────────────────────────────────▼─────────────────────────┐  │
//! │  │                          Widget                              │  │
//! │  │  ┌──────────────┐ ┌────────────────┐ ┌───────────────────┐  │  │
//! │  │  │ WidgetConfig │ │   lifecycle    │ │  Origin guard     │  │  │
//! │  │  │ (immutable)  │ │ Closed/Opening │ │  + InboundMessage │  │  │
//! │  │  │              │ │ Open/Closing   │ │    decode         │  │  │
//! │  │  └──────────────┘ └───────┬────────┘ └─────────┬─────────┘  │  │
//! │  │          RenderTarget ◄───┤ Scheduler           │ relay hook │  │
//! │  └───────────────────────────┼─────────────────────┼───────────┘  │
//! │        HeadlessDom / WebDom  │  Manual / Timer /   │              │
//! │                              │  Browser scheduler  ▼              │
//! │                              │            window.aiAgentWidget-   │
//! │                              │            OnMessage               │
//! └──────────────────────────────┼────────────────────────────────────┘
//!                                │ postMessage (widget:config,
//!                                │              widget:visibility)
//! ┌──────────────────────────────▼────────────────────────────────────┐
//! │          Remote origin: /widget?agentId=...&theme=...             │
//! │   sends widget:ready, widget:close, widget:resize, widget:message │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Features
//!
//! ### Fail-soft embedding
//! - A missing container leaves an inert widget, never a broken page
//! - Spoofed, malformed and unknown messages are dropped
//! - Optional diagnostics hook to observe every silent failure
//!
//! ### Race-free visibility
//! - Pure state machine with explicit effects
//! - Deferred reveal/settle steps are cancellable tasks, superseded by
//!   every new transition
//!
//! ## Modules
//!
//! - [`widget`]: the widget, its configuration, styles and state machine
//! - [`protocol`]: origin handling and the postMessage wire format
//! - [`relay`]: rate limiting for relayed agent events
//! - [`embed`]: host page bootstrap and embed snippet
//! - [`runtime`]: tokio driver with a timer-wheel scheduler
//! - [`config`]: Configuration management

pub mod config;
pub mod embed;
pub mod error;
pub mod protocol;
pub mod relay;
pub mod runtime;
pub mod widget;

#[cfg(all(feature = "browser", target_arch = "wasm32"))]
pub mod browser;

pub use config::EmbedConfig;
pub use error::{Error, Result};
pub use widget::{Widget, WidgetConfig, WidgetOptions};
