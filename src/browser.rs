//! web-sys backend
//!
//! Mounts the widget into the real page when the loader script runs:
//! reads `window.aiAgentWidgetConfig`, renders into the DOM, installs the
//! single message listener and exposes `window.aiAgentWidget`.

use crate::embed::{self, GLOBAL_CONFIG_KEY, INSTANCE_KEY};
use crate::error::{Error, Result};
use crate::protocol::Origin;
use crate::widget::{
    Deferral, ElementKind, NodeId, RelayQueue, RenderTarget, Scheduler, Task, TaskHandle,
    Widget, WidgetHooks, WidgetOptions, WidgetSettings,
};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::time::Duration;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlElement, HtmlIFrameElement, MessageEvent, Window};

/// Global function the host page can define to receive relayed agent events
const RELAY_CALLBACK_KEY: &str = "aiAgentWidgetOnMessage";

/// Set to a truthy value to log diagnostics to the console
const DEBUG_KEY: &str = "aiAgentWidgetDebug";

type BrowserWidget = Widget<WebDom, BrowserScheduler>;

thread_local! {
    static WIDGET: RefCell<Option<BrowserWidget>> = const { RefCell::new(None) };
    static RELAYED: RelayQueue = RelayQueue::new();
}

/// Run `f` against the mounted widget, then hand any relayed agent events
/// to the page. The page callback runs after the borrow is released so it
/// may call back into `window.aiAgentWidget`.
fn with_widget<T>(f: impl FnOnce(&mut BrowserWidget) -> T) -> Option<T> {
    let result = WIDGET.with(|slot| match slot.try_borrow_mut() {
        Ok(mut guard) => guard.as_mut().map(f),
        Err(_) => {
            web_sys::console::warn_1(&"AI agent widget: re-entrant call ignored".into());
            None
        }
    });
    deliver_relayed();
    result
}

fn deliver_relayed() {
    let pending = RELAYED.with(RelayQueue::drain);
    if pending.is_empty() {
        return;
    }
    let Some(window) = web_sys::window() else {
        return;
    };
    let Ok(callback) = js_sys::Reflect::get(&window, &JsValue::from_str(RELAY_CALLBACK_KEY)) else {
        return;
    };
    let Some(callback) = callback.dyn_ref::<js_sys::Function>() else {
        return;
    };
    for data in pending {
        let payload = serde_json::to_string(&data)
            .ok()
            .and_then(|text| js_sys::JSON::parse(&text).ok())
            .unwrap_or(JsValue::NULL);
        let _ = callback.call1(&JsValue::NULL, &payload);
    }
}

fn js_error(context: &str, value: JsValue) -> Error {
    Error::Render(format!("{}: {:?}", context, value))
}

/// Render target over the live DOM
pub struct WebDom {
    window: Window,
    document: Document,
    elements: Vec<Element>,
}

impl WebDom {
    pub fn new(window: Window, document: Document) -> Self {
        Self {
            window,
            document,
            elements: Vec::new(),
        }
    }

    pub fn element(&self, node: NodeId) -> Option<&Element> {
        self.elements.get(node.index())
    }

    fn track(&mut self, element: Element) -> NodeId {
        self.elements.push(element);
        NodeId::new(self.elements.len() - 1)
    }

    fn require(&self, node: NodeId) -> Result<&Element> {
        self.element(node)
            .ok_or_else(|| Error::Render(format!("Unknown node {}", node.index())))
    }
}

impl RenderTarget for WebDom {
    fn mount_point(&mut self, id: &str) -> Option<NodeId> {
        let element = self.document.get_element_by_id(id)?;
        Some(self.track(element))
    }

    fn create_element(&mut self, kind: ElementKind) -> Result<NodeId> {
        let element = self
            .document
            .create_element(kind.tag_name())
            .map_err(|e| js_error("create_element", e))?;
        Ok(self.track(element))
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        let parent = self.require(parent)?;
        let child = self.require(child)?;
        parent
            .append_child(child)
            .map(|_| ())
            .map_err(|e| js_error("append_child", e))
    }

    fn set_style(&mut self, node: NodeId, property: &str, value: &str) {
        if let Some(element) = self.element(node).and_then(|e| e.dyn_ref::<HtmlElement>()) {
            let _ = element.style().set_property(property, value);
        }
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        if let Some(element) = self.element(node) {
            let _ = element.set_attribute(name, value);
        }
    }

    fn set_text(&mut self, node: NodeId, text: &str) {
        if let Some(element) = self.element(node) {
            element.set_text_content(Some(text));
        }
    }

    fn viewport_height(&self) -> f64 {
        self.window
            .inner_height()
            .ok()
            .and_then(|h| h.as_f64())
            .unwrap_or(0.0)
    }

    fn post_message(&mut self, frame: NodeId, message: &Value, target_origin: &str) -> Result<()> {
        let target = self
            .require(frame)?
            .dyn_ref::<HtmlIFrameElement>()
            .ok_or_else(|| Error::Render(format!("Node {} is not an iframe", frame.index())))?
            .content_window()
            .ok_or_else(|| Error::Render("Iframe has no content window".to_string()))?;
        let payload = js_sys::JSON::parse(&serde_json::to_string(message)?)
            .map_err(|e| js_error("JSON.parse", e))?;
        target
            .post_message(&payload, target_origin)
            .map_err(|e| js_error("postMessage", e))
    }
}

enum Pending {
    Frame(i32),
    Timeout(i32),
}

/// Scheduler over `requestAnimationFrame` and `setTimeout`
pub struct BrowserScheduler {
    window: Window,
    next_id: u64,
    pending: HashMap<TaskHandle, Pending>,
    started: f64,
}

impl BrowserScheduler {
    pub fn new(window: Window) -> Self {
        let started = Self::clock(&window);
        Self {
            window,
            next_id: 0,
            pending: HashMap::new(),
            started,
        }
    }

    fn clock(window: &Window) -> f64 {
        window.performance().map(|p| p.now()).unwrap_or(0.0)
    }

    fn fired(&mut self, handle: TaskHandle) {
        self.pending.remove(&handle);
    }
}

impl Scheduler for BrowserScheduler {
    fn schedule(&mut self, deferral: Deferral, task: Task) -> TaskHandle {
        let handle = TaskHandle::new(self.next_id);
        self.next_id += 1;

        let callback = Closure::once_into_js(move || {
            with_widget(|widget| {
                widget.scheduler_mut().fired(handle);
                widget.run_task(handle, task);
            });
        });
        let function = callback.unchecked_ref::<js_sys::Function>();

        let scheduled = match deferral {
            Deferral::NextFrame => self
                .window
                .request_animation_frame(function)
                .map(Pending::Frame),
            Deferral::After(delay) => {
                let millis = i32::try_from(delay.as_millis()).unwrap_or(i32::MAX);
                self.window
                    .set_timeout_with_callback_and_timeout_and_arguments_0(function, millis)
                    .map(Pending::Timeout)
            }
        };
        match scheduled {
            Ok(pending) => {
                self.pending.insert(handle, pending);
            }
            Err(e) => web_sys::console::warn_2(&"AI agent widget: failed to schedule".into(), &e),
        }
        handle
    }

    fn cancel(&mut self, handle: TaskHandle) {
        match self.pending.remove(&handle) {
            Some(Pending::Frame(id)) => {
                let _ = self.window.cancel_animation_frame(id);
            }
            Some(Pending::Timeout(id)) => self.window.clear_timeout_with_handle(id),
            None => {}
        }
    }

    fn now(&self) -> Duration {
        let elapsed = (Self::clock(&self.window) - self.started).max(0.0);
        Duration::from_secs_f64(elapsed / 1000.0)
    }
}

/// Live instance exposed as `window.aiAgentWidget`
#[wasm_bindgen]
pub struct AgentWidgetHandle;

#[wasm_bindgen]
impl AgentWidgetHandle {
    pub fn toggle(&self) {
        with_widget(|w| w.toggle());
    }

    pub fn open(&self) {
        with_widget(|w| w.open());
    }

    pub fn close(&self) {
        with_widget(|w| w.close());
    }

    #[wasm_bindgen(js_name = isOpen)]
    pub fn is_open(&self) -> bool {
        with_widget(|w| w.is_open()).unwrap_or(false)
    }
}

fn read_global(window: &Window, key: &str) -> Option<Value> {
    let value = js_sys::Reflect::get(window, &JsValue::from_str(key)).ok()?;
    if value.is_undefined() || value.is_null() {
        return None;
    }
    js_to_json(&value)
}

fn js_to_json(value: &JsValue) -> Option<Value> {
    let text = js_sys::JSON::stringify(value).ok()?.as_string()?;
    serde_json::from_str(&text).ok()
}

fn remote_origin() -> Origin {
    option_env!("AGENT_EMBED_REMOTE_ORIGIN")
        .and_then(|origin| Origin::parse(origin).ok())
        .unwrap_or_default()
}

fn browser_hooks() -> WidgetHooks {
    RELAYED
        .with(|queue| WidgetHooks::new().queue_relays(queue))
        .on_diagnostic(|diagnostic| {
            let Some(window) = web_sys::window() else {
                return;
            };
            let enabled = js_sys::Reflect::get(&window, &JsValue::from_str(DEBUG_KEY))
                .map(|v| v.is_truthy())
                .unwrap_or(false);
            if enabled {
                web_sys::console::debug_1(&format!("AI agent widget: {:?}", diagnostic).into());
            }
        })
}

/// Entry point run when the loader script is instantiated
#[wasm_bindgen(start)]
pub fn start() {
    let Some(window) = web_sys::window() else {
        return;
    };
    let Some(document) = window.document() else {
        return;
    };

    let settings = WidgetSettings {
        remote_origin: remote_origin(),
        ..Default::default()
    };
    let container_id = settings.container_id.clone();
    let Some(widget) = embed::bootstrap(
        read_global(&window, GLOBAL_CONFIG_KEY).as_ref(),
        &WidgetOptions::default(),
        settings,
        browser_hooks(),
        WebDom::new(window.clone(), document),
        BrowserScheduler::new(window.clone()),
    ) else {
        return;
    };

    if widget.is_inert() {
        web_sys::console::error_1(
            &format!("AI agent widget: container #{} not found", container_id).into(),
        );
    }
    install(widget, &window);
}

fn install(widget: BrowserWidget, window: &Window) {
    let button = widget
        .nodes()
        .and_then(|nodes| widget.render().element(nodes.button).cloned());
    WIDGET.with(|slot| *slot.borrow_mut() = Some(widget));

    let on_message = Closure::<dyn FnMut(MessageEvent)>::new(|event: MessageEvent| {
        let origin = event.origin();
        with_widget(|widget| {
            // Foreign payloads are never converted, let alone decoded
            let payload = if widget.accepts_origin(&origin) {
                js_to_json(&event.data()).unwrap_or(Value::Null)
            } else {
                Value::Null
            };
            widget.handle_message(&origin, &payload);
        });
    });
    let _ = window.add_event_listener_with_callback("message", on_message.as_ref().unchecked_ref());
    on_message.forget();

    if let Some(button) = button {
        let on_click = Closure::<dyn FnMut(web_sys::Event)>::new(|_event: web_sys::Event| {
            with_widget(|widget| widget.toggle());
        });
        let _ = button.add_event_listener_with_callback("click", on_click.as_ref().unchecked_ref());
        on_click.forget();
    }

    let _ = js_sys::Reflect::set(
        window,
        &JsValue::from_str(INSTANCE_KEY),
        &JsValue::from(AgentWidgetHandle),
    );
}
