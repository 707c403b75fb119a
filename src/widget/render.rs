//! Render target capability
//!
//! The widget never touches a DOM directly. A `RenderTarget` provides the
//! mount point lookup, the element factory and the handful of mutations the
//! widget needs; the browser backend implements it with web-sys and
//! `HeadlessDom` implements it in memory.

use crate::error::Result;
use serde_json::Value;

/// Opaque handle to an element owned by a render target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

/// Elements the widget creates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Iframe,
    Button,
}

impl ElementKind {
    pub fn tag_name(self) -> &'static str {
        match self {
            ElementKind::Iframe => "iframe",
            ElementKind::Button => "button",
        }
    }
}

/// Host page surface the widget renders into
pub trait RenderTarget {
    /// Find the host-provided container by element id.
    fn mount_point(&mut self, id: &str) -> Option<NodeId>;

    /// Create a detached element.
    fn create_element(&mut self, kind: ElementKind) -> Result<NodeId>;

    /// Append `child` to `parent`.
    fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()>;

    fn set_style(&mut self, node: NodeId, property: &str, value: &str);

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str);

    fn set_text(&mut self, node: NodeId, text: &str);

    /// Inner height of the host window, in CSS pixels.
    fn viewport_height(&self) -> f64;

    /// Post `message` into the iframe's window, restricted to `target_origin`.
    fn post_message(&mut self, frame: NodeId, message: &Value, target_origin: &str) -> Result<()>;
}
