//! Declarative document fixtures.
//!
//! Fixtures describe a page's `head` and `body` as nested nodes with their
//! laid-out boxes, in YAML or JSON:
//!
//! ```yaml
//! body:
//!   rect: { left: 0, top: 0, width: 360, height: 640 }
//!   children:
//!     - tag: div
//!       attrs: { id: a, name: n }
//!       rect: { left: 0, top: 0, width: 100, height: 20 }
//!       children:
//!         - text: Hi
//!           rect: { left: 0, top: 0, width: 14, height: 20 }
//! ```
//!
//! Attribute maps keep the order they are written in.

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::Path;

use super::{ElementSpec, NodeId, SnapshotDocument};
use crate::config::load_path;
use crate::geometry::Rect;
use crate::record::Attribute;
use crate::result::{LocatorError, LocatorResult};

/// Attributes in written order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeMap(pub Vec<Attribute>);

impl Serialize for AttributeMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for attribute in &self.0 {
            map.serialize_entry(&attribute.name, &attribute.value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for AttributeMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(AttributeMapVisitor)
    }
}

struct AttributeMapVisitor;

impl<'de> Visitor<'de> for AttributeMapVisitor {
    type Value = AttributeMap;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of attribute names to scalar values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut attributes = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((name, value)) = access.next_entry::<String, Scalar>()? {
            attributes.push(Attribute::new(name, value.0));
        }
        Ok(AttributeMap(attributes))
    }
}

/// Attribute value written as any scalar
struct Scalar(String);

impl<'de> Deserialize<'de> for Scalar {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ScalarVisitor;

        impl Visitor<'_> for ScalarVisitor {
            type Value = Scalar;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a string, number or boolean")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Scalar, E> {
                Ok(Scalar(v.to_string()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<Scalar, E> {
                Ok(Scalar(v))
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<Scalar, E> {
                Ok(Scalar(v.to_string()))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Scalar, E> {
                Ok(Scalar(v.to_string()))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Scalar, E> {
                Ok(Scalar(v.to_string()))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Scalar, E> {
                Ok(Scalar(v.to_string()))
            }

            fn visit_unit<E: de::Error>(self) -> Result<Scalar, E> {
                Ok(Scalar(String::new()))
            }
        }

        deserializer.deserialize_any(ScalarVisitor)
    }
}

/// A text or element node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeFixture {
    /// Text node
    Text {
        /// Text content
        text: String,
        /// Box of the text's range
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rect: Option<Rect>,
    },
    /// Element node
    Element(ElementFixture),
}

/// An element and its subtree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementFixture {
    /// Tag name
    pub tag: String,
    /// Attributes in written order
    #[serde(default)]
    pub attrs: AttributeMap,
    /// Laid-out box; collapsed when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rect: Option<Rect>,
    /// Editable value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Property reads on this element fail
    #[serde(default)]
    pub unreadable: bool,
    /// Child nodes
    #[serde(default)]
    pub children: Vec<NodeFixture>,
}

/// The `body` element
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BodyFixture {
    /// Body attributes
    #[serde(default)]
    pub attrs: AttributeMap,
    /// Body box
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rect: Option<Rect>,
    /// Child nodes
    #[serde(default)]
    pub children: Vec<NodeFixture>,
}

/// A whole page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentFixture {
    /// Children of `head`
    #[serde(default)]
    pub head: Vec<NodeFixture>,
    /// The `body` element
    #[serde(default)]
    pub body: BodyFixture,
}

impl DocumentFixture {
    /// Parse a YAML fixture
    pub fn from_yaml_str(source: &str) -> LocatorResult<Self> {
        Ok(serde_yaml_ng::from_str(source)?)
    }

    /// Parse a JSON fixture
    pub fn from_json_str(source: &str) -> LocatorResult<Self> {
        Ok(serde_json::from_str(source)?)
    }

    /// Load a fixture file; `.json` files are read as JSON, anything else as YAML
    pub fn from_path(path: impl AsRef<Path>) -> LocatorResult<Self> {
        load_path(path.as_ref())
    }

    /// Build the document this fixture describes
    pub fn build(&self) -> LocatorResult<SnapshotDocument> {
        let mut doc = SnapshotDocument::new();
        doc.configure_body(
            self.body.attrs.0.clone(),
            self.body.rect.unwrap_or_default(),
        );
        let head = doc.head();
        append_all(&mut doc, head, &self.head)?;
        let body = doc.body();
        append_all(&mut doc, body, &self.body.children)?;
        Ok(doc)
    }
}

fn append_all(doc: &mut SnapshotDocument, parent: NodeId, nodes: &[NodeFixture]) -> LocatorResult<()> {
    for node in nodes {
        match node {
            NodeFixture::Text { text, rect } => {
                doc.append_text(parent, text.clone(), rect.unwrap_or_default());
            }
            NodeFixture::Element(element) => {
                if element.tag.trim().is_empty() {
                    return Err(LocatorError::fixture("element with an empty tag"));
                }
                let mut spec = ElementSpec::new(element.tag.trim())
                    .rect(element.rect.unwrap_or_default());
                for attribute in &element.attrs.0 {
                    spec = spec.attr(attribute.name.clone(), attribute.value.clone());
                }
                if let Some(value) = &element.value {
                    spec = spec.value(value.clone());
                }
                if element.unreadable {
                    spec = spec.unreadable();
                }
                let id = doc.append_element(parent, spec);
                append_all(doc, id, &element.children)?;
            }
        }
    }
    Ok(())
}

impl SnapshotDocument {
    /// Build a document from a fixture
    pub fn from_fixture(fixture: &DocumentFixture) -> LocatorResult<Self> {
        fixture.build()
    }
}
