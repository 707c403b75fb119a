//! In-memory render target
//!
//! Records every element, style, attribute and posted message so the widget
//! can run without a browser (tests, the `simulate` command).

use super::render::{ElementKind, NodeId, RenderTarget};
use crate::error::{Error, Result};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// Default inner height of the simulated window
pub const DEFAULT_VIEWPORT_HEIGHT: f64 = 800.0;

/// A recorded element
#[derive(Debug, Clone, Default, Serialize)]
pub struct HeadlessNode {
    pub tag: String,
    pub id: Option<String>,
    pub styles: BTreeMap<String, String>,
    pub attributes: BTreeMap<String, String>,
    pub text: String,
    pub children: Vec<usize>,
}

/// A message posted into an iframe
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostedMessage {
    pub frame: usize,
    pub target_origin: String,
    pub payload: Value,
}

/// In-memory DOM
#[derive(Debug, Clone)]
pub struct HeadlessDom {
    nodes: Vec<HeadlessNode>,
    ids: HashMap<String, NodeId>,
    viewport_height: f64,
    outbox: Vec<PostedMessage>,
}

impl Default for HeadlessDom {
    fn default() -> Self {
        Self::new(DEFAULT_VIEWPORT_HEIGHT)
    }
}

impl HeadlessDom {
    /// Empty page (no mount point) with the given window inner height
    pub fn new(viewport_height: f64) -> Self {
        Self {
            nodes: Vec::new(),
            ids: HashMap::new(),
            viewport_height,
            outbox: Vec::new(),
        }
    }

    /// Page that already contains a `<div id="{id}">`
    pub fn with_container(id: &str) -> Self {
        let mut dom = Self::default();
        dom.add_container(id);
        dom
    }

    /// Insert a `<div>` with the given id
    pub fn add_container(&mut self, id: &str) -> NodeId {
        let node = self.push(HeadlessNode {
            tag: "div".to_string(),
            id: Some(id.to_string()),
            ..Default::default()
        });
        self.ids.insert(id.to_string(), node);
        node
    }

    pub fn set_viewport_height(&mut self, height: f64) {
        self.viewport_height = height;
    }

    pub fn node(&self, node: NodeId) -> Option<&HeadlessNode> {
        self.nodes.get(node.index())
    }

    pub fn style(&self, node: NodeId, property: &str) -> Option<&str> {
        self.node(node)?.styles.get(property).map(String::as_str)
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.node(node)?.attributes.get(name).map(String::as_str)
    }

    /// First element with the given tag name
    pub fn find_by_tag(&self, tag: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|n| n.tag == tag)
            .map(NodeId::new)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Messages posted so far, oldest first
    pub fn outbox(&self) -> &[PostedMessage] {
        &self.outbox
    }

    /// Drain the posted messages
    pub fn take_outbox(&mut self) -> Vec<PostedMessage> {
        std::mem::take(&mut self.outbox)
    }

    fn push(&mut self, node: HeadlessNode) -> NodeId {
        self.nodes.push(node);
        NodeId::new(self.nodes.len() - 1)
    }

    fn node_mut(&mut self, node: NodeId) -> Option<&mut HeadlessNode> {
        self.nodes.get_mut(node.index())
    }
}

impl RenderTarget for HeadlessDom {
    fn mount_point(&mut self, id: &str) -> Option<NodeId> {
        self.ids.get(id).copied()
    }

    fn create_element(&mut self, kind: ElementKind) -> Result<NodeId> {
        Ok(self.push(HeadlessNode {
            tag: kind.tag_name().to_string(),
            ..Default::default()
        }))
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        if self.node(child).is_none() {
            return Err(Error::Render(format!("Unknown node {}", child.index())));
        }
        let parent = self
            .node_mut(parent)
            .ok_or_else(|| Error::Render(format!("Unknown node {}", parent.index())))?;
        parent.children.push(child.index());
        Ok(())
    }

    fn set_style(&mut self, node: NodeId, property: &str, value: &str) {
        if let Some(node) = self.node_mut(node) {
            node.styles.insert(property.to_string(), value.to_string());
        }
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        if let Some(node) = self.node_mut(node) {
            node.attributes.insert(name.to_string(), value.to_string());
        }
    }

    fn set_text(&mut self, node: NodeId, text: &str) {
        if let Some(node) = self.node_mut(node) {
            node.text = text.to_string();
        }
    }

    fn viewport_height(&self) -> f64 {
        self.viewport_height
    }

    fn post_message(&mut self, frame: NodeId, message: &Value, target_origin: &str) -> Result<()> {
        match self.node(frame) {
            Some(node) if node.tag == ElementKind::Iframe.tag_name() => {}
            _ => {
                return Err(Error::Render(format!(
                    "Node {} is not an iframe",
                    frame.index()
                )))
            }
        }
        self.outbox.push(PostedMessage {
            frame: frame.index(),
            target_origin: target_origin.to_string(),
            payload: message.clone(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mount_point_lookup() {
        let mut dom = HeadlessDom::with_container("ai-agent-widget");
        assert!(dom.mount_point("ai-agent-widget").is_some());
        assert!(dom.mount_point("other").is_none());
    }

    #[test]
    fn test_append_and_style() {
        let mut dom = HeadlessDom::with_container("root");
        let root = dom.mount_point("root").unwrap();
        let button = dom.create_element(ElementKind::Button).unwrap();
        dom.append_child(root, button).unwrap();
        dom.set_style(button, "width", "60px");
        assert_eq!(dom.node(root).unwrap().children, vec![button.index()]);
        assert_eq!(dom.style(button, "width"), Some("60px"));
        assert_eq!(dom.find_by_tag("button"), Some(button));
    }

    #[test]
    fn test_append_unknown_node_fails() {
        let mut dom = HeadlessDom::with_container("root");
        let root = dom.mount_point("root").unwrap();
        assert!(dom.append_child(root, NodeId::new(42)).is_err());
    }

    #[test]
    fn test_post_message_only_to_iframes() {
        let mut dom = HeadlessDom::with_container("root");
        let frame = dom.create_element(ElementKind::Iframe).unwrap();
        let button = dom.create_element(ElementKind::Button).unwrap();
        let payload = json!({ "type": "widget:visibility" });

        dom.post_message(frame, &payload, "https://a.example").unwrap();
        assert!(dom.post_message(button, &payload, "https://a.example").is_err());

        let sent = dom.take_outbox();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].target_origin, "https://a.example");
        assert!(dom.outbox().is_empty());
    }
}
