//! Receiving side of the channel.
//!
//! The harness intercepts every line the page pushes, keeps the ones that
//! belong to the agent and turns record lines into [`WebElement`]s with an
//! on-screen click point. Decoding here is deliberately lenient: it mirrors
//! what existing harnesses accept, so a malformed geometry field degrades to
//! zero instead of dropping the element.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, trace};

use crate::channel::COMPLETION_SENTINEL;
use crate::config::HarnessConfig;
use crate::record::{ATTRIBUTE_DELIMITER, ATTRIBUTE_SEPARATOR, FIELD_DELIMITER};

/// Routing decision for one line received from the page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelMessage<'a> {
    /// The completion sentinel
    Finished,
    /// A record line for the agent
    Record(&'a str),
    /// Anything else; belongs to the page's own prompt handler
    Foreign(&'a str),
}

impl<'a> ChannelMessage<'a> {
    /// Classify a line
    #[must_use]
    pub fn classify(line: &'a str) -> Self {
        if line == COMPLETION_SENTINEL {
            Self::Finished
        } else if line.contains(FIELD_DELIMITER) || line.contains(COMPLETION_SENTINEL) {
            Self::Record(line)
        } else {
            Self::Foreign(line)
        }
    }

    /// Whether the agent consumes this line
    #[must_use]
    pub const fn is_agent_line(&self) -> bool {
        !matches!(self, Self::Foreign(_))
    }
}

/// A located element as the harness sees it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebElement {
    /// Identifier field
    pub id: String,
    /// Text field
    pub text: String,
    /// Name field
    pub name: String,
    /// Class field
    pub class_name: String,
    /// Tag field
    pub tag_name: String,
    /// Attributes; a repeated name keeps the last value
    pub attributes: BTreeMap<String, String>,
    /// Screen x of the click point
    pub location_x: i64,
    /// Screen y of the click point
    pub location_y: i64,
}

impl WebElement {
    /// Decode a record line.
    ///
    /// Returns `None` for lines with fewer than five fields. Geometry fields
    /// are read in order until one fails to parse; it and every later
    /// geometry field count as zero and the attribute field is ignored.
    #[must_use]
    pub fn decode(line: &str, config: &HarnessConfig) -> Option<Self> {
        let fields: Vec<&str> = line.split(FIELD_DELIMITER).collect();
        if fields.len() < 5 {
            debug!(fields = fields.len(), "record line too short");
            return None;
        }

        let mut geometry = [0_i64; 4];
        let mut complete = true;
        for (slot, raw) in geometry.iter_mut().zip(fields.iter().skip(5)) {
            match parse_rounded(raw) {
                Some(value) => *slot = value,
                None => {
                    complete = false;
                    break;
                }
            }
        }
        complete &= fields.len() > 9;

        let attributes = if complete {
            harness_attributes(fields[9])
        } else {
            BTreeMap::new()
        };

        let [x, y, width, height] = geometry;
        Some(Self {
            id: fields[0].to_string(),
            text: fields[1].to_string(),
            name: fields[2].to_string(),
            class_name: fields[3].to_string(),
            tag_name: fields[4].to_string(),
            attributes,
            location_x: click_point(config.origin_x, x, width, config.scale),
            location_y: click_point(config.origin_y, y, height, config.scale),
        })
    }
}

/// Attribute map as the receiving side reads it.
///
/// Each entry is split on every separator with trailing empty pieces
/// dropped: the first piece is the name and the second the value. An entry
/// left with a single piece (`disabled`, `title::`) maps the name to itself.
/// Entries with no pieces left (empty, or only separators) are skipped.
fn harness_attributes(field: &str) -> BTreeMap<String, String> {
    let mut attributes = BTreeMap::new();
    for entry in field.split(ATTRIBUTE_DELIMITER) {
        let mut pieces: Vec<&str> = entry.split(ATTRIBUTE_SEPARATOR).collect();
        while pieces.last().is_some_and(|piece| piece.is_empty()) {
            pieces.pop();
        }
        match pieces.as_slice() {
            [] => {}
            [name] => {
                attributes.insert((*name).to_string(), (*name).to_string());
            }
            [name, value, ..] => {
                attributes.insert((*name).to_string(), (*value).to_string());
            }
        }
    }
    attributes
}

/// Round half up, the way the receiving side always has. Non-finite values
/// count as unparseable; out-of-range ones saturate.
fn parse_rounded(raw: &str) -> Option<i64> {
    let value: f64 = raw.trim().parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    #[allow(clippy::cast_possible_truncation)]
    Some((value + 0.5).floor() as i64)
}

/// Screen coordinate of a box's midpoint, saturating at the `i64` range
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn click_point(origin: i64, start: i64, extent: i64, scale: f64) -> i64 {
    let offset = start as f64 + (extent / 2) as f64;
    (origin as f64 + offset * scale) as i64
}

impl HarnessConfig {
    /// Whether the element's click point lies above the view's bottom edge
    #[must_use]
    pub const fn is_sufficiently_shown(&self, element: &WebElement) -> bool {
        self.origin_y.saturating_add(self.view_height) > element.location_y
    }
}

/// Accumulates the elements of one request.
#[derive(Debug, Clone, Default)]
pub struct ElementCollector {
    config: HarnessConfig,
    elements: Vec<WebElement>,
    finished: bool,
}

impl ElementCollector {
    /// Create a collector
    #[must_use]
    pub fn new(config: HarnessConfig) -> Self {
        Self {
            config,
            elements: Vec::new(),
            finished: false,
        }
    }

    /// Forget the previous request
    pub fn prepare_for_start(&mut self) {
        self.finished = false;
        self.elements.clear();
    }

    /// Route one line; returns whether the agent consumed it
    pub fn accept(&mut self, line: &str) -> bool {
        match ChannelMessage::classify(line) {
            ChannelMessage::Finished => {
                trace!("request finished");
                self.finished = true;
                true
            }
            ChannelMessage::Record(record) => {
                if let Some(element) = WebElement::decode(record, &self.config) {
                    self.elements.push(element);
                }
                true
            }
            ChannelMessage::Foreign(_) => false,
        }
    }

    /// Whether the sentinel has arrived
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// Elements decoded so far
    #[must_use]
    pub fn elements(&self) -> &[WebElement] {
        &self.elements
    }

    /// Elements whose click point is inside the view
    #[must_use]
    pub fn sufficiently_shown(&self) -> Vec<&WebElement> {
        self.elements
            .iter()
            .filter(|e| self.config.is_sufficiently_shown(e))
            .collect()
    }

    /// Harness settings in use
    #[must_use]
    pub const fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Call `pump` until the sentinel arrives or the timeout passes,
    /// sleeping the poll interval between calls. Returns whether it arrived.
    pub fn wait_until_finished(&mut self, mut pump: impl FnMut(&mut Self)) -> bool {
        let deadline = Instant::now() + self.config.timeout();
        loop {
            pump(self);
            if self.finished {
                return true;
            }
            if Instant::now() >= deadline {
                debug!(timeout_ms = self.config.timeout_ms, "gave up waiting for sentinel");
                return false;
            }
            std::thread::sleep(self.config.poll_interval());
        }
    }
}
