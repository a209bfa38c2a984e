//! Record encoding for the outbound channel.
//!
//! A record is one line of fields joined by [`FIELD_DELIMITER`], in fixed
//! order: id, text, name, className, tagName, left, top, width, height and,
//! for element records only, the attribute list. Attribute pairs are written
//! `name::value` and joined by [`ATTRIBUTE_DELIMITER`].
//!
//! Field values are not escaped. A value containing a delimiter sequence
//! shifts every later field when the line is decoded; the harness on the
//! other end splits naively, so the layout is kept byte-compatible.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::{format_coordinate, Rect};

/// Separator between record fields
pub const FIELD_DELIMITER: &str = ";,";

/// Separator between an attribute's name and value
pub const ATTRIBUTE_SEPARATOR: &str = "::";

/// Separator between attribute pairs
pub const ATTRIBUTE_DELIMITER: &str = "#$";

/// Written in the name field when the element has no `name` attribute
pub const ABSENT_NAME: &str = "null";

/// Written in the text field when an element has neither text nor a value
pub const ABSENT_TEXT: &str = "undefined";

/// Fields in a text record
pub const TEXT_RECORD_FIELDS: usize = 9;

/// Fields in an element record
pub const ELEMENT_RECORD_FIELDS: usize = 10;

/// A single element attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    /// Attribute name
    pub name: String,
    /// Attribute value
    pub value: String,
}

impl Attribute {
    /// Create a new attribute
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Report for a matched element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementRecord {
    /// `id` property
    pub id: String,
    /// Rendered text, or the editable value when the text is blank
    pub text: Option<String>,
    /// `name` attribute
    pub name: Option<String>,
    /// Full `class` attribute
    pub class_name: String,
    /// Tag name
    pub tag_name: String,
    /// Element box
    pub rect: Rect,
    /// Attributes in source order
    pub attributes: Vec<Attribute>,
}

/// Report for a matched text node, labelled by its parent element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRecord {
    /// Parent's `id` property
    pub id: String,
    /// The node's text content, untrimmed
    pub text: String,
    /// Parent's `name` attribute
    pub name: Option<String>,
    /// Parent's full `class` attribute
    pub class_name: String,
    /// Parent's tag name
    pub tag_name: String,
    /// Box of a range spanning the text
    pub rect: Rect,
}

/// Either kind of record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Record {
    /// Element record
    Element(ElementRecord),
    /// Text record
    Text(TextRecord),
}

/// Failure to decode a channel line
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// Line has a field count that matches neither record kind
    #[error("expected {TEXT_RECORD_FIELDS} or {ELEMENT_RECORD_FIELDS} fields, found {found}")]
    FieldCount {
        /// Fields found after splitting
        found: usize,
    },

    /// A geometry field is not a number
    #[error("field {field} is not a number: {value:?}")]
    Coordinate {
        /// Field name
        field: &'static str,
        /// Raw field text
        value: String,
    },
}

impl Record {
    /// Encode as a single channel line
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            Self::Element(record) => record.encode(),
            Self::Text(record) => record.encode(),
        }
    }

    /// Decode a channel line.
    ///
    /// Nine fields decode as a text record, ten as an element record. Field
    /// values that contained a delimiter when encoded do not survive.
    pub fn decode(line: &str) -> Result<Self, RecordError> {
        let fields: Vec<&str> = line.split(FIELD_DELIMITER).collect();
        match fields.len() {
            TEXT_RECORD_FIELDS => Ok(Self::Text(TextRecord {
                id: fields[0].to_string(),
                text: fields[1].to_string(),
                name: decode_optional(fields[2], ABSENT_NAME),
                class_name: fields[3].to_string(),
                tag_name: fields[4].to_string(),
                rect: decode_rect(&fields[5..9])?,
            })),
            ELEMENT_RECORD_FIELDS => Ok(Self::Element(ElementRecord {
                id: fields[0].to_string(),
                text: decode_optional(fields[1], ABSENT_TEXT),
                name: decode_optional(fields[2], ABSENT_NAME),
                class_name: fields[3].to_string(),
                tag_name: fields[4].to_string(),
                rect: decode_rect(&fields[5..9])?,
                attributes: decode_attributes(fields[9]),
            })),
            found => Err(RecordError::FieldCount { found }),
        }
    }

    /// Whether any field value contains a wire delimiter
    #[must_use]
    pub fn has_delimiter_collision(&self) -> bool {
        let collides = |value: &str| value.contains(FIELD_DELIMITER);
        match self {
            Self::Element(r) => {
                collides(&r.id)
                    || r.text.as_deref().is_some_and(collides)
                    || r.name.as_deref().is_some_and(collides)
                    || collides(&r.class_name)
                    || collides(&r.tag_name)
                    || r.attributes.iter().any(|a| {
                        collides(&a.name)
                            || collides(&a.value)
                            || a.name.contains(ATTRIBUTE_SEPARATOR)
                            || a.name.contains(ATTRIBUTE_DELIMITER)
                            || a.value.contains(ATTRIBUTE_DELIMITER)
                    })
            }
            Self::Text(r) => {
                collides(&r.id)
                    || collides(&r.text)
                    || r.name.as_deref().is_some_and(collides)
                    || collides(&r.class_name)
                    || collides(&r.tag_name)
            }
        }
    }

    /// Box carried by the record
    #[must_use]
    pub const fn rect(&self) -> &Rect {
        match self {
            Self::Element(r) => &r.rect,
            Self::Text(r) => &r.rect,
        }
    }
}

impl ElementRecord {
    /// Encode as a single channel line
    #[must_use]
    pub fn encode(&self) -> String {
        let mut line = label_fields(
            &self.id,
            self.text.as_deref().unwrap_or(ABSENT_TEXT),
            self.name.as_deref(),
            &self.class_name,
            &self.tag_name,
            &self.rect,
        );
        line.push_str(FIELD_DELIMITER);
        line.push_str(&encode_attributes(&self.attributes));
        line
    }
}

impl TextRecord {
    /// Encode as a single channel line
    #[must_use]
    pub fn encode(&self) -> String {
        label_fields(
            &self.id,
            &self.text,
            self.name.as_deref(),
            &self.class_name,
            &self.tag_name,
            &self.rect,
        )
    }
}

fn label_fields(
    id: &str,
    text: &str,
    name: Option<&str>,
    class_name: &str,
    tag_name: &str,
    rect: &Rect,
) -> String {
    let mut line = String::new();
    let fields = [
        id,
        text,
        name.unwrap_or(ABSENT_NAME),
        class_name,
        tag_name,
    ];
    for field in fields {
        line.push_str(field);
        line.push_str(FIELD_DELIMITER);
    }
    let geometry = [rect.left, rect.top, rect.width, rect.height].map(format_coordinate);
    line.push_str(&geometry.join(FIELD_DELIMITER));
    line
}

/// Join attributes as `name::value` pairs
#[must_use]
pub fn encode_attributes(attributes: &[Attribute]) -> String {
    attributes
        .iter()
        .map(|a| format!("{}{ATTRIBUTE_SEPARATOR}{}", a.name, a.value))
        .collect::<Vec<_>>()
        .join(ATTRIBUTE_DELIMITER)
}

/// Split an attribute field back into pairs.
///
/// A pair without a separator maps the name to itself. Empty entries are
/// dropped.
#[must_use]
pub fn decode_attributes(field: &str) -> Vec<Attribute> {
    field
        .split(ATTRIBUTE_DELIMITER)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once(ATTRIBUTE_SEPARATOR) {
            Some((name, value)) => Attribute::new(name, value),
            None => Attribute::new(entry, entry),
        })
        .collect()
}

fn decode_optional(field: &str, absent: &str) -> Option<String> {
    (field != absent).then(|| field.to_string())
}

fn decode_rect(fields: &[&str]) -> Result<Rect, RecordError> {
    const NAMES: [&str; 4] = ["left", "top", "width", "height"];
    let mut values = [0.0_f64; 4];
    for (i, raw) in fields.iter().enumerate() {
        values[i] = raw.parse().map_err(|_| RecordError::Coordinate {
            field: NAMES[i],
            value: (*raw).to_string(),
        })?;
    }
    Ok(Rect::new(values[0], values[1], values[2], values[3]))
}
