//! Document host abstraction.
//!
//! The locator never touches a concrete document. Everything it needs from
//! the live tree goes through [`DocumentHost`], so the same traversal code
//! runs against a browser page (see the `web` module on `wasm32`) and against
//! an in-memory [`SnapshotDocument`](crate::SnapshotDocument) in tests.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::geometry::Rect;
use crate::record::{Attribute, ElementRecord, Record, TextRecord};

/// A failure raised by the document while inspecting one node.
///
/// Faults are values handed back to the traversal loop, which logs them and
/// moves on to the next candidate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomFault {
    /// A property or attribute getter threw
    #[error("cannot read {property}")]
    Unreadable {
        /// Property being read
        property: String,
    },

    /// Node has no element parent
    #[error("node has no parent element")]
    Detached,

    /// Operation needs an element but got another node type
    #[error("node is not an element")]
    NotAnElement,

    /// Selector could not be parsed
    #[error("invalid selector {selector:?}: {reason}")]
    InvalidSelector {
        /// Selector as given
        selector: String,
        /// Parse failure
        reason: String,
    },

    /// Path expression could not be parsed or evaluated
    #[error("invalid path expression {expression:?}: {reason}")]
    InvalidPathExpression {
        /// Expression as given
        expression: String,
        /// Parse failure
        reason: String,
    },

    /// Any other exception thrown by the script engine
    #[error("script error: {message}")]
    Script {
        /// Message carried by the exception
        message: String,
    },
}

impl DomFault {
    /// Create an unreadable-property fault
    #[must_use]
    pub fn unreadable(property: impl Into<String>) -> Self {
        Self::Unreadable {
            property: property.into(),
        }
    }
}

/// Kind of synthetic pointer event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerKind {
    /// Pointer pressed (`mousedown`)
    Press,
    /// Pointer released (`mouseup`)
    Release,
    /// Single combined activation (`click`)
    Click,
}

impl PointerKind {
    /// DOM event type name
    #[must_use]
    pub const fn event_type(self) -> &'static str {
        match self {
            Self::Press => "mousedown",
            Self::Release => "mouseup",
            Self::Click => "click",
        }
    }
}

/// A synthetic pointer event to dispatch on a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointerEvent {
    /// Event kind
    pub kind: PointerKind,
    /// Whether the event bubbles
    pub bubbles: bool,
    /// Whether the event is cancelable
    pub cancelable: bool,
}

impl PointerEvent {
    /// Bubbling, cancelable event of the given kind
    #[must_use]
    pub const fn new(kind: PointerKind) -> Self {
        Self {
            kind,
            bubbles: true,
            cancelable: true,
        }
    }
}

/// Live-document capability used by the locator.
///
/// Node handles are only valid for the request that produced them; nothing
/// here is cached across calls. Sequence-returning methods yield nodes in
/// document order.
pub trait DocumentHost {
    /// Handle to a node in the document
    type Node: Clone + fmt::Debug;

    /// Native identifier lookup
    fn element_by_id(&self, id: &str) -> Option<Self::Node>;

    /// Every element in the document, `html` included
    fn all_elements(&self) -> Vec<Self::Node>;

    /// Elements strictly below `body`
    fn body_elements(&self) -> Vec<Self::Node>;

    /// Text nodes below `body`
    fn body_text_nodes(&self) -> Vec<Self::Node>;

    /// Native tag lookup; `*` matches every element
    fn elements_by_tag_name(&self, tag: &str) -> Vec<Self::Node>;

    /// Native selector query
    fn query_selector_all(&self, selector: &str) -> Result<Vec<Self::Node>, DomFault>;

    /// Evaluate a path expression against the document
    fn evaluate_path(&self, expression: &str) -> Result<Vec<Self::Node>, DomFault>;

    /// The element's `id` property (empty when unset)
    fn element_id(&self, node: &Self::Node) -> Result<String, DomFault>;

    /// A single attribute, `None` when absent
    fn attribute(&self, node: &Self::Node, name: &str) -> Result<Option<String>, DomFault>;

    /// All attributes in source order
    fn attributes(&self, node: &Self::Node) -> Result<Vec<Attribute>, DomFault>;

    /// The element's full `class` attribute (empty when unset)
    fn class_name(&self, node: &Self::Node) -> Result<String, DomFault>;

    /// The element's tag name as the document reports it
    fn tag_name(&self, node: &Self::Node) -> Result<String, DomFault>;

    /// Rendered text of the element's subtree
    fn inner_text(&self, node: &Self::Node) -> Result<String, DomFault>;

    /// The element's editable value, `None` when it has none
    fn value(&self, node: &Self::Node) -> Result<Option<String>, DomFault>;

    /// Text content of any node
    fn text_content(&self, node: &Self::Node) -> Result<String, DomFault>;

    /// Nearest element ancestor
    fn parent_element(&self, node: &Self::Node) -> Option<Self::Node>;

    /// Element box in viewport coordinates
    fn bounding_rect(&self, node: &Self::Node) -> Result<Rect, DomFault>;

    /// Box of a range spanning exactly the node's contents
    fn text_range_rect(&self, node: &Self::Node) -> Result<Rect, DomFault>;

    /// Dispatch a synthetic pointer event on the node
    fn dispatch_pointer(&mut self, node: &Self::Node, event: PointerEvent)
        -> Result<(), DomFault>;

    /// Assign the element's editable value
    fn assign_value(&mut self, node: &Self::Node, value: &str) -> Result<(), DomFault>;
}

/// A node produced by a strategy, not yet filtered for visibility
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidate<N> {
    /// An element node
    Element(N),
    /// A text node, labelled by its nearest element ancestor
    Text(N),
}

impl<N: Clone + fmt::Debug> Candidate<N> {
    /// The underlying node handle
    #[must_use]
    pub const fn node(&self) -> &N {
        match self {
            Self::Element(node) | Self::Text(node) => node,
        }
    }

    /// Box the visibility filter looks at
    pub fn geometry<H>(&self, host: &H) -> Result<Rect, DomFault>
    where
        H: DocumentHost<Node = N>,
    {
        match self {
            Self::Element(node) => host.bounding_rect(node),
            Self::Text(node) => host.text_range_rect(node),
        }
    }

    /// Read the label fields and geometry into a fresh record
    pub fn record<H>(&self, host: &H) -> Result<Record, DomFault>
    where
        H: DocumentHost<Node = N>,
    {
        match self {
            Self::Element(node) => element_record(host, node).map(Record::Element),
            Self::Text(node) => text_record(host, node).map(Record::Text),
        }
    }
}

fn element_record<H: DocumentHost>(host: &H, node: &H::Node) -> Result<ElementRecord, DomFault> {
    let inner = host.inner_text(node)?;
    let text = if inner.trim().is_empty() {
        host.value(node)?
    } else {
        Some(inner)
    };

    Ok(ElementRecord {
        id: host.element_id(node)?,
        text,
        name: host.attribute(node, "name")?,
        class_name: host.class_name(node)?,
        tag_name: host.tag_name(node)?,
        rect: host.bounding_rect(node)?,
        attributes: host.attributes(node)?,
    })
}

fn text_record<H: DocumentHost>(host: &H, node: &H::Node) -> Result<TextRecord, DomFault> {
    let text = host.text_content(node)?;
    let parent = host.parent_element(node).ok_or(DomFault::Detached)?;

    Ok(TextRecord {
        id: host.element_id(&parent)?,
        text,
        name: host.attribute(&parent, "name")?,
        class_name: host.class_name(&parent)?,
        tag_name: host.tag_name(&parent)?,
        rect: host.text_range_rect(node)?,
    })
}
