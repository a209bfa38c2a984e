//! In-memory document host.
//!
//! A [`SnapshotDocument`] is an arena of document, element and text nodes
//! with laid-out boxes already attached. It answers every
//! [`DocumentHost`] query without a browser, records the pointer events
//! dispatched on it and keeps assigned values, so requests can be run and
//! checked deterministically.
//!
//! ```rust
//! use weblocator::{ElementSpec, Rect, SnapshotDocument};
//!
//! let mut doc = SnapshotDocument::new();
//! let body = doc.body();
//! let div = doc.append_element(
//!     body,
//!     ElementSpec::new("div").attr("id", "a").rect(Rect::new(0.0, 0.0, 50.0, 10.0)),
//! );
//! doc.append_text(div, "Hi", Rect::new(0.0, 0.0, 12.0, 10.0));
//! assert_eq!(doc.text_content_of(div), "Hi");
//! ```

mod fixture;
mod selector;
mod xpath;

pub use fixture::{AttributeMap, BodyFixture, DocumentFixture, ElementFixture, NodeFixture};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::dom::{DocumentHost, DomFault, PointerEvent};
use crate::geometry::Rect;
use crate::record::Attribute;

/// Index of a node in a [`SnapshotDocument`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(usize);

impl NodeId {
    /// Raw arena index
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Description of an element to append
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementSpec {
    tag: String,
    attributes: Vec<Attribute>,
    value: Option<String>,
    rect: Rect,
    unreadable: bool,
}

impl ElementSpec {
    /// Element with the given tag, no attributes and a collapsed box
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            ..Self::default()
        }
    }

    /// Add an attribute; a repeated name replaces the earlier value
    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|a| a.name == name) {
            Some(existing) => existing.value = value,
            None => self.attributes.push(Attribute { name, value }),
        }
        self
    }

    /// Set the laid-out box
    #[must_use]
    pub const fn rect(mut self, rect: Rect) -> Self {
        self.rect = rect;
        self
    }

    /// Set the editable value
    #[must_use]
    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Make every property read on this element fail
    #[must_use]
    pub const fn unreadable(mut self) -> Self {
        self.unreadable = true;
        self
    }
}

/// A pointer event dispatched on the document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchedEvent {
    /// Event target
    pub target: NodeId,
    /// The event
    pub event: PointerEvent,
}

#[derive(Debug, Clone)]
struct ElementData {
    tag: String,
    attributes: Vec<Attribute>,
    value: Option<String>,
    rect: Rect,
    unreadable: bool,
}

#[derive(Debug, Clone)]
enum NodeData {
    Document,
    Element(ElementData),
    Text { text: String, rect: Rect },
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    data: NodeData,
}

/// In-memory document with precomputed layout
#[derive(Debug, Clone)]
pub struct SnapshotDocument {
    nodes: Vec<Node>,
    body: NodeId,
    events: Vec<DispatchedEvent>,
}

impl Default for SnapshotDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotDocument {
    /// Empty `html` document with `head` and `body`
    #[must_use]
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                data: NodeData::Document,
            }],
            body: NodeId(0),
            events: Vec::new(),
        };
        let html = doc.append_element(doc.root(), ElementSpec::new("html"));
        doc.append_element(html, ElementSpec::new("head"));
        doc.body = doc.append_element(html, ElementSpec::new("body"));
        doc
    }

    /// The document node
    #[must_use]
    pub const fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// The `body` element
    #[must_use]
    pub const fn body(&self) -> NodeId {
        self.body
    }

    /// The `head` element
    #[must_use]
    pub fn head(&self) -> NodeId {
        self.nodes[self.body.0]
            .parent
            .and_then(|html| self.nodes[html.0].children.first().copied())
            .unwrap_or(self.body)
    }

    /// Number of nodes, the document node included
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the document holds only its skeleton
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes[self.body.0].children.is_empty()
    }

    /// Append an element under `parent` and return its id
    pub fn append_element(&mut self, parent: NodeId, spec: ElementSpec) -> NodeId {
        self.push_node(
            parent,
            NodeData::Element(ElementData {
                tag: spec.tag,
                attributes: spec.attributes,
                value: spec.value,
                rect: spec.rect,
                unreadable: spec.unreadable,
            }),
        )
    }

    /// Append a text node under `parent` and return its id
    pub fn append_text(&mut self, parent: NodeId, text: impl Into<String>, rect: Rect) -> NodeId {
        self.push_node(
            parent,
            NodeData::Text {
                text: text.into(),
                rect,
            },
        )
    }

    /// Replace the body's attributes and box
    pub fn configure_body(&mut self, attributes: Vec<Attribute>, rect: Rect) {
        if let NodeData::Element(data) = &mut self.nodes[self.body.0].data {
            data.attributes = attributes;
            data.rect = rect;
        }
    }

    fn push_node(&mut self, parent: NodeId, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: Some(parent),
            children: Vec::new(),
            data,
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Pointer events dispatched so far, oldest first
    #[must_use]
    pub fn events(&self) -> &[DispatchedEvent] {
        &self.events
    }

    /// Forget recorded events
    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    /// Current editable value of an element
    #[must_use]
    pub fn value_of(&self, node: NodeId) -> Option<&str> {
        self.element(node).and_then(|e| e.value.as_deref())
    }

    /// Concatenated text of the node's subtree
    #[must_use]
    pub fn text_content_of(&self, node: NodeId) -> String {
        match &self.nodes[node.0].data {
            NodeData::Text { text, .. } => text.clone(),
            _ => self
                .descendants(node)
                .into_iter()
                .filter_map(|id| self.text(id))
                .collect(),
        }
    }

    /// Nodes below `node` in document order, `node` excluded
    #[must_use]
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.nodes[node.0].children.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.nodes[id.0].children.iter().rev());
        }
        out
    }

    /// Preorder position of every node
    pub(crate) fn document_order(&self) -> HashMap<NodeId, usize> {
        std::iter::once(self.root())
            .chain(self.descendants(self.root()))
            .enumerate()
            .map(|(i, id)| (id, i))
            .collect()
    }

    fn element(&self, node: NodeId) -> Option<&ElementData> {
        match &self.nodes.get(node.0)?.data {
            NodeData::Element(data) => Some(data),
            _ => None,
        }
    }

    fn readable(&self, node: NodeId, property: &str) -> Result<&ElementData, DomFault> {
        let data = self.element(node).ok_or(DomFault::NotAnElement)?;
        if data.unreadable {
            return Err(DomFault::unreadable(property));
        }
        Ok(data)
    }

    pub(crate) fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    pub(crate) fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.0].children
    }

    pub(crate) fn is_element(&self, node: NodeId) -> bool {
        self.element(node).is_some()
    }

    pub(crate) fn is_text(&self, node: NodeId) -> bool {
        matches!(self.nodes[node.0].data, NodeData::Text { .. })
    }

    pub(crate) fn tag(&self, node: NodeId) -> Option<&str> {
        self.element(node).map(|e| e.tag.as_str())
    }

    pub(crate) fn text(&self, node: NodeId) -> Option<&str> {
        match &self.nodes[node.0].data {
            NodeData::Text { text, .. } => Some(text),
            _ => None,
        }
    }

    /// Attribute lookup for the query engines; ignores the read fault flag
    pub(crate) fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        self.element(node)?
            .attributes
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
            .map(|a| a.value.as_str())
    }

    pub(crate) fn element_siblings(&self, node: NodeId) -> (Vec<NodeId>, Vec<NodeId>) {
        let Some(parent) = self.parent(node) else {
            return (Vec::new(), Vec::new());
        };
        let siblings: Vec<NodeId> = self
            .children(parent)
            .iter()
            .copied()
            .filter(|&id| self.is_element(id))
            .collect();
        let pos = siblings.iter().position(|&id| id == node).unwrap_or(0);
        let before = siblings[..pos].iter().rev().copied().collect();
        let after = siblings.get(pos + 1..).map(<[_]>::to_vec).unwrap_or_default();
        (before, after)
    }
}

impl DocumentHost for SnapshotDocument {
    type Node = NodeId;

    fn element_by_id(&self, id: &str) -> Option<NodeId> {
        if id.is_empty() {
            return None;
        }
        self.descendants(self.root())
            .into_iter()
            .find(|&node| self.attr(node, "id") == Some(id))
    }

    fn all_elements(&self) -> Vec<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .filter(|&id| self.is_element(id))
            .collect()
    }

    fn body_elements(&self) -> Vec<NodeId> {
        self.descendants(self.body)
            .into_iter()
            .filter(|&id| self.is_element(id))
            .collect()
    }

    fn body_text_nodes(&self) -> Vec<NodeId> {
        self.descendants(self.body)
            .into_iter()
            .filter(|&id| self.is_text(id))
            .collect()
    }

    fn elements_by_tag_name(&self, tag: &str) -> Vec<NodeId> {
        self.all_elements()
            .into_iter()
            .filter(|&id| tag == "*" || self.tag(id).is_some_and(|t| t.eq_ignore_ascii_case(tag)))
            .collect()
    }

    fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>, DomFault> {
        let list = selector::parse(selector).map_err(|reason| DomFault::InvalidSelector {
            selector: selector.to_string(),
            reason,
        })?;
        Ok(self
            .all_elements()
            .into_iter()
            .filter(|&id| list.matches(self, id))
            .collect())
    }

    fn evaluate_path(&self, expression: &str) -> Result<Vec<NodeId>, DomFault> {
        xpath::evaluate(self, expression).map_err(|reason| DomFault::InvalidPathExpression {
            expression: expression.to_string(),
            reason,
        })
    }

    fn element_id(&self, node: &NodeId) -> Result<String, DomFault> {
        let data = self.readable(*node, "id")?;
        Ok(attribute_value(data, "id").unwrap_or_default())
    }

    fn attribute(&self, node: &NodeId, name: &str) -> Result<Option<String>, DomFault> {
        let data = self.readable(*node, name)?;
        Ok(attribute_value(data, name))
    }

    fn attributes(&self, node: &NodeId) -> Result<Vec<Attribute>, DomFault> {
        Ok(self.readable(*node, "attributes")?.attributes.clone())
    }

    fn class_name(&self, node: &NodeId) -> Result<String, DomFault> {
        let data = self.readable(*node, "className")?;
        Ok(attribute_value(data, "class").unwrap_or_default())
    }

    fn tag_name(&self, node: &NodeId) -> Result<String, DomFault> {
        Ok(self.readable(*node, "tagName")?.tag.to_ascii_uppercase())
    }

    fn inner_text(&self, node: &NodeId) -> Result<String, DomFault> {
        self.readable(*node, "innerText")?;
        Ok(self.text_content_of(*node))
    }

    fn value(&self, node: &NodeId) -> Result<Option<String>, DomFault> {
        Ok(self.readable(*node, "value")?.value.clone())
    }

    fn text_content(&self, node: &NodeId) -> Result<String, DomFault> {
        if self.is_element(*node) {
            self.readable(*node, "textContent")?;
        }
        Ok(self.text_content_of(*node))
    }

    fn parent_element(&self, node: &NodeId) -> Option<NodeId> {
        self.parent(*node).filter(|&p| self.is_element(p))
    }

    fn bounding_rect(&self, node: &NodeId) -> Result<Rect, DomFault> {
        Ok(self.readable(*node, "boundingClientRect")?.rect)
    }

    fn text_range_rect(&self, node: &NodeId) -> Result<Rect, DomFault> {
        match &self.nodes[node.0].data {
            NodeData::Text { rect, .. } => Ok(*rect),
            NodeData::Element(_) => self.bounding_rect(node),
            NodeData::Document => Ok(Rect::collapsed()),
        }
    }

    fn dispatch_pointer(&mut self, node: &NodeId, event: PointerEvent) -> Result<(), DomFault> {
        self.events.push(DispatchedEvent {
            target: *node,
            event,
        });
        Ok(())
    }

    fn assign_value(&mut self, node: &NodeId, value: &str) -> Result<(), DomFault> {
        match &mut self.nodes[node.0].data {
            NodeData::Element(data) => {
                data.value = Some(value.to_string());
                Ok(())
            }
            _ => Err(DomFault::NotAnElement),
        }
    }
}

fn attribute_value(data: &ElementData, name: &str) -> Option<String> {
    data.attributes
        .iter()
        .find(|a| a.name.eq_ignore_ascii_case(name))
        .map(|a| a.value.clone())
}
