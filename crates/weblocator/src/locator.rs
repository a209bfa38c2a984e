//! Strategy lookup and the activate/report dispatch policy.
//!
//! Every strategy reduces to the same loop: walk the nodes the strategy
//! produces, keep the ones that match the query, then either activate the
//! first match or report every visible one. A fault while inspecting one node
//! is logged and the walk moves on. Only a rejected path expression or a
//! broken output channel ends a request early.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, trace, warn};

use crate::channel::OutputSink;
use crate::config::{ActivationStyle, LocatorConfig};
use crate::dom::{Candidate, DocumentHost, DomFault, PointerEvent, PointerKind};
use crate::record::Record;
use crate::result::{LocatorError, LocatorResult};

/// Mode flag value that selects activation
pub const ACTIVATE_FLAG: &str = "true";

/// One technique for finding nodes that match a query value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strategy {
    /// Identifier lookup, with a full scan when the lookup misses
    ById,
    /// Path expression evaluated against the document
    ByPathExpression,
    /// Selector query
    BySelector,
    /// Exact match on the `name` attribute
    ByName,
    /// Exact match on the whole `class` attribute
    ByClassName,
    /// Tag lookup
    ByTagName,
    /// Exact match on a text node's content
    ByTextContent,
}

impl Strategy {
    /// Every strategy, in wire order
    pub const ALL: [Self; 7] = [
        Self::ById,
        Self::ByPathExpression,
        Self::BySelector,
        Self::ByName,
        Self::ByClassName,
        Self::ByTagName,
        Self::ByTextContent,
    ];
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ById => "id",
            Self::ByPathExpression => "path expression",
            Self::BySelector => "selector",
            Self::ByName => "name",
            Self::ByClassName => "class name",
            Self::ByTagName => "tag name",
            Self::ByTextContent => "text content",
        };
        f.write_str(name)
    }
}

/// What a query request does with its matches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Mode {
    /// Activate the first match and stop
    Activate,
    /// Report every visible match
    #[default]
    Report,
}

impl Mode {
    /// Interpret an inbound mode flag; only the literal `"true"` activates
    #[must_use]
    pub fn from_flag(flag: &str) -> Self {
        if flag == ACTIVATE_FLAG {
            Self::Activate
        } else {
            Self::Report
        }
    }

    /// The flag that selects this mode
    #[must_use]
    pub const fn as_flag(self) -> &'static str {
        match self {
            Self::Activate => ACTIVATE_FLAG,
            Self::Report => "false",
        }
    }
}

/// A single locator request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatorQuery {
    /// Lookup technique
    pub strategy: Strategy,
    /// Query value
    pub value: String,
    /// Activate or report
    pub mode: Mode,
}

impl LocatorQuery {
    /// Create a query
    #[must_use]
    pub fn new(strategy: Strategy, value: impl Into<String>, mode: Mode) -> Self {
        Self {
            strategy,
            value: value.into(),
            mode,
        }
    }

    /// Report-mode query
    #[must_use]
    pub fn report(strategy: Strategy, value: impl Into<String>) -> Self {
        Self::new(strategy, value, Mode::Report)
    }

    /// Activate-mode query
    #[must_use]
    pub fn activate(strategy: Strategy, value: impl Into<String>) -> Self {
        Self::new(strategy, value, Mode::Activate)
    }
}

/// Summary of a finished request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Outcome {
    /// Record lines pushed before the sentinel
    pub emitted: usize,
    /// Whether a node was activated
    pub activated: bool,
    /// Whether a value was assigned
    pub assigned: bool,
    /// Candidates dropped because of a fault
    pub skipped: usize,
}

/// Match test applied lazily as the walk reaches each node
#[derive(Debug, Clone, Copy)]
enum Filter<'q> {
    Any,
    Id(&'q str),
    Name(&'q str),
    ClassName(&'q str),
    Text(&'q str),
}

/// Runs requests against a document, pushing output to a sink.
///
/// The locator borrows both collaborators for its lifetime; nothing it finds
/// outlives the request that found it.
pub struct Locator<'a, H: DocumentHost, S: OutputSink> {
    host: &'a mut H,
    sink: &'a mut S,
    config: LocatorConfig,
}

impl<H: DocumentHost, S: OutputSink> fmt::Debug for Locator<'_, H, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Locator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<'a, H: DocumentHost, S: OutputSink> Locator<'a, H, S> {
    /// Create a locator with the default configuration
    pub fn new(host: &'a mut H, sink: &'a mut S) -> Self {
        Self {
            host,
            sink,
            config: LocatorConfig::default(),
        }
    }

    /// Replace the configuration
    #[must_use]
    pub fn with_config(mut self, config: LocatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Current configuration
    #[must_use]
    pub const fn config(&self) -> &LocatorConfig {
        &self.config
    }

    /// Run a query request to completion.
    ///
    /// Ends with exactly one sentinel unless the path expression is rejected
    /// or the sink fails.
    pub fn run(&mut self, query: &LocatorQuery) -> LocatorResult<Outcome> {
        debug!(strategy = %query.strategy, value = %query.value, mode = ?query.mode, "locating");
        let mut outcome = Outcome::default();
        let (nodes, filter) = self.traverse(query.strategy, &query.value)?;

        for candidate in nodes {
            if !self.accepts(&candidate, filter, &mut outcome) {
                continue;
            }
            match query.mode {
                Mode::Activate => match self.activate(candidate.node()) {
                    Ok(()) => {
                        outcome.activated = true;
                        break;
                    }
                    Err(fault) => {
                        debug!(node = ?candidate.node(), %fault, "activation failed, trying next");
                        outcome.skipped += 1;
                    }
                },
                Mode::Report => self.report(&candidate, &mut outcome)?,
            }
        }

        self.sink.finish()?;
        Ok(outcome)
    }

    /// Assign `text` to the value of the first match.
    ///
    /// A text-content match assigns to the text's parent element. No match
    /// is a no-op. Never emits a record.
    pub fn set_value(&mut self, strategy: Strategy, value: &str, text: &str) -> LocatorResult<Outcome> {
        debug!(%strategy, value, "setting value");
        let mut outcome = Outcome::default();
        let (nodes, filter) = self.traverse(strategy, value)?;

        for candidate in nodes {
            if !self.accepts(&candidate, filter, &mut outcome) {
                continue;
            }
            let target = match &candidate {
                Candidate::Element(node) => Some(node.clone()),
                Candidate::Text(node) => self.host.parent_element(node),
            };
            match target.map(|node| self.host.assign_value(&node, text)) {
                Some(Ok(())) => outcome.assigned = true,
                Some(Err(fault)) => {
                    warn!(node = ?candidate.node(), %fault, "value assignment failed");
                    outcome.skipped += 1;
                }
                None => {
                    debug!(node = ?candidate.node(), "matched text has no parent element");
                    outcome.skipped += 1;
                }
            }
            break;
        }

        self.sink.finish()?;
        Ok(outcome)
    }

    pub(crate) fn host(&self) -> &H {
        self.host
    }

    pub(crate) fn finish(&mut self) -> LocatorResult<()> {
        self.sink.finish()
    }

    /// Nodes the strategy walks, in traversal order, and the test each must pass
    fn traverse<'q>(
        &self,
        strategy: Strategy,
        value: &'q str,
    ) -> LocatorResult<(Vec<Candidate<H::Node>>, Filter<'q>)> {
        let elements = |nodes: Vec<H::Node>| -> Vec<Candidate<H::Node>> {
            nodes.into_iter().map(Candidate::Element).collect()
        };

        Ok(match strategy {
            Strategy::ById => match self.host.element_by_id(value) {
                Some(node) => (vec![Candidate::Element(node)], Filter::Any),
                None => {
                    trace!(id = value, "identifier lookup missed, scanning");
                    (elements(self.host.all_elements()), Filter::Id(value))
                }
            },
            Strategy::ByPathExpression => {
                let nodes = self.host.evaluate_path(value).map_err(|fault| {
                    let message = match fault {
                        DomFault::InvalidPathExpression { reason, .. } => reason,
                        other => other.to_string(),
                    };
                    LocatorError::PathExpression {
                        expression: value.to_string(),
                        message,
                    }
                })?;
                (elements(nodes), Filter::Any)
            }
            Strategy::BySelector => match self.host.query_selector_all(value) {
                Ok(nodes) => (elements(nodes), Filter::Any),
                Err(fault) => {
                    warn!(selector = value, %fault, "selector rejected, treating as no match");
                    (Vec::new(), Filter::Any)
                }
            },
            Strategy::ByName => (elements(self.host.body_elements()), Filter::Name(value)),
            Strategy::ByClassName => {
                (elements(self.host.body_elements()), Filter::ClassName(value))
            }
            Strategy::ByTagName => (elements(self.host.elements_by_tag_name(value)), Filter::Any),
            Strategy::ByTextContent => (
                self.host
                    .body_text_nodes()
                    .into_iter()
                    .map(Candidate::Text)
                    .collect(),
                Filter::Text(value),
            ),
        })
    }

    fn accepts(&self, candidate: &Candidate<H::Node>, filter: Filter<'_>, outcome: &mut Outcome) -> bool {
        match self.matches(candidate.node(), filter) {
            Ok(matched) => matched,
            Err(fault) => {
                debug!(node = ?candidate.node(), %fault, "skipping candidate");
                outcome.skipped += 1;
                false
            }
        }
    }

    fn matches(&self, node: &H::Node, filter: Filter<'_>) -> Result<bool, DomFault> {
        let host = &*self.host;
        Ok(match filter {
            Filter::Any => true,
            Filter::Id(id) => host.element_id(node)? == id,
            Filter::Name(name) => host
                .attribute(node, "name")?
                .is_some_and(|attr| trimmed_equal(&attr, name)),
            Filter::ClassName(class) => trimmed_equal(&host.class_name(node)?, class),
            Filter::Text(text) => host.text_content(node)?.trim() == text.trim(),
        })
    }

    fn activate(&mut self, node: &H::Node) -> Result<(), DomFault> {
        let kinds: &[PointerKind] = match self.config.activation {
            ActivationStyle::PressRelease => &[PointerKind::Press, PointerKind::Release],
            ActivationStyle::Click => &[PointerKind::Click],
        };
        for &kind in kinds {
            self.host.dispatch_pointer(node, PointerEvent::new(kind))?;
        }
        trace!(?node, "activated");
        Ok(())
    }

    /// Encode and push one candidate if it is visible.
    pub(crate) fn report(&mut self, candidate: &Candidate<H::Node>, outcome: &mut Outcome) -> LocatorResult<()> {
        let record = match reportable(&*self.host, candidate) {
            Ok(Some(record)) => record,
            Ok(None) => return Ok(()),
            Err(fault) => {
                debug!(node = ?candidate.node(), %fault, "skipping candidate");
                outcome.skipped += 1;
                return Ok(());
            }
        };

        if self.config.warn_on_delimiter_collision && record.has_delimiter_collision() {
            warn!(node = ?candidate.node(), "field value contains a wire delimiter; record will not decode cleanly");
        }
        let line = record.encode();
        trace!(%line, "emitting record");
        self.sink.push(&line)?;
        outcome.emitted += 1;
        Ok(())
    }
}

/// The record for a candidate, or `None` when it is not reportable
fn reportable<H: DocumentHost>(host: &H, candidate: &Candidate<H::Node>) -> Result<Option<Record>, DomFault> {
    let rect = candidate.geometry(host)?;
    if !rect.is_visible() {
        trace!(node = ?candidate.node(), ?rect, "not visible");
        return Ok(None);
    }
    let record = candidate.record(host)?;
    match &record {
        Record::Text(text) if text.text.trim().is_empty() => Ok(None),
        _ => Ok(Some(record)),
    }
}

/// Attribute match: a blank attribute never matches
fn trimmed_equal(attribute: &str, query: &str) -> bool {
    let attribute = attribute.trim();
    !attribute.is_empty() && attribute == query.trim()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::channel::MemorySink;
    use crate::geometry::Rect;
    use crate::snapshot::{ElementSpec, NodeId, SnapshotDocument};

    fn visible(top: f64) -> Rect {
        Rect::new(0.0, top, 80.0, 20.0)
    }

    fn page() -> SnapshotDocument {
        let mut doc = SnapshotDocument::new();
        let body = doc.body();
        let form = doc.append_element(body, ElementSpec::new("form").attr("id", "f").rect(visible(0.0)));
        for (i, name) in ["email", "password"].into_iter().enumerate() {
            doc.append_element(
                form,
                ElementSpec::new("input")
                    .attr("name", name)
                    .attr("class", " field ")
                    .value("")
                    .rect(visible(20.0 * (i as f64 + 1.0))),
            );
        }
        let button = doc.append_element(
            body,
            ElementSpec::new("button").attr("class", "btn primary").rect(visible(60.0)),
        );
        doc.append_text(button, " Sign in ", visible(60.0));
        doc.append_element(body, ElementSpec::new("button").attr("class", "btn").rect(Rect::collapsed()));
        doc
    }

    fn run(doc: &mut SnapshotDocument, query: &LocatorQuery) -> (Outcome, MemorySink) {
        let mut sink = MemorySink::new();
        let outcome = Locator::new(doc, &mut sink).run(query).unwrap();
        (outcome, sink)
    }

    fn decoded(sink: &MemorySink) -> Vec<Record> {
        sink.records().into_iter().map(|l| Record::decode(l).unwrap()).collect()
    }

    mod mode_tests {
        use super::*;

        #[test]
        fn test_mode_flag() {
            assert_eq!(Mode::from_flag("true"), Mode::Activate);
            assert_eq!(Mode::from_flag("TRUE"), Mode::Report);
            assert_eq!(Mode::from_flag("false"), Mode::Report);
            assert_eq!(Mode::from_flag(""), Mode::Report);
            assert_eq!(Mode::from_flag(Mode::Activate.as_flag()), Mode::Activate);
        }

        #[test]
        fn test_strategy_display() {
            assert_eq!(Strategy::ByTextContent.to_string(), "text content");
            assert_eq!(Strategy::ALL.len(), 7);
        }
    }

    mod strategy_tests {
        use super::*;

        #[test]
        fn test_by_name_trims_attribute() {
            let mut doc = page();
            let (outcome, sink) = run(&mut doc, &LocatorQuery::report(Strategy::ByName, " email"));
            assert_eq!(outcome.emitted, 1);
            let Record::Element(record) = &decoded(&sink)[0] else {
                panic!("expected element record");
            };
            assert_eq!(record.name.as_deref(), Some("email"));
        }

        #[test]
        fn test_by_class_name_matches_whole_attribute() {
            let mut doc = page();
            let (outcome, _) = run(&mut doc, &LocatorQuery::report(Strategy::ByClassName, "btn"));
            // the only exact "btn" is collapsed
            assert_eq!(outcome.emitted, 0);
            let (outcome, _) = run(&mut doc, &LocatorQuery::report(Strategy::ByClassName, "btn primary"));
            assert_eq!(outcome.emitted, 1);
            let (outcome, _) = run(&mut doc, &LocatorQuery::report(Strategy::ByClassName, "field"));
            assert_eq!(outcome.emitted, 2);
        }

        #[test]
        fn test_by_text_content_reports_text_record() {
            let mut doc = page();
            let (outcome, sink) = run(&mut doc, &LocatorQuery::report(Strategy::ByTextContent, "Sign in"));
            assert_eq!(outcome.emitted, 1);
            let Record::Text(record) = &decoded(&sink)[0] else {
                panic!("expected text record");
            };
            assert_eq!(record.text, " Sign in ");
            assert_eq!(record.tag_name, "BUTTON");
            assert_eq!(record.class_name, "btn primary");
        }

        #[test]
        fn test_by_tag_name_filters_invisible() {
            let mut doc = page();
            let (outcome, sink) = run(&mut doc, &LocatorQuery::report(Strategy::ByTagName, "BUTTON"));
            assert_eq!(outcome.emitted, 1);
            assert_eq!(sink.sentinel_count(), 1);
        }

        #[test]
        fn test_by_id_scans_when_lookup_misses() {
            let mut doc = SnapshotDocument::new();
            let body = doc.body();
            doc.append_element(body, ElementSpec::new("p").attr("id", "x").unreadable());
            let (outcome, sink) = run(&mut doc, &LocatorQuery::report(Strategy::ById, "missing"));
            assert_eq!(outcome.emitted, 0);
            assert_eq!(outcome.skipped, 1);
            assert_eq!(sink.lines(), ["robotium-finished"]);
        }

        #[test]
        fn test_selector_fault_is_no_match() {
            let mut doc = page();
            let (outcome, sink) = run(&mut doc, &LocatorQuery::report(Strategy::BySelector, "div[["));
            assert_eq!(outcome, Outcome::default());
            assert!(sink.is_finished());
        }

        #[test]
        fn test_path_expression_fault_leaves_request_open() {
            let mut doc = page();
            let mut sink = MemorySink::new();
            let err = Locator::new(&mut doc, &mut sink)
                .run(&LocatorQuery::report(Strategy::ByPathExpression, "//input["))
                .unwrap_err();
            assert!(matches!(err, LocatorError::PathExpression { .. }));
            assert!(err.leaves_request_open());
            assert!(sink.lines().is_empty());
        }

        #[test]
        fn test_path_expression_reports_every_result() {
            let mut doc = page();
            let (outcome, _) = run(&mut doc, &LocatorQuery::report(Strategy::ByPathExpression, "//input"));
            assert_eq!(outcome.emitted, 2);
        }
    }

    mod activation_tests {
        use super::*;

        #[test]
        fn test_activates_first_match_only() {
            let mut doc = page();
            let (outcome, sink) = run(&mut doc, &LocatorQuery::activate(Strategy::ByTagName, "input"));
            assert!(outcome.activated);
            assert_eq!(sink.lines(), ["robotium-finished"]);
            let kinds: Vec<PointerKind> = doc.events().iter().map(|e| e.event.kind).collect();
            assert_eq!(kinds, vec![PointerKind::Press, PointerKind::Release]);
            let first: NodeId = doc.elements_by_tag_name("input")[0];
            assert!(doc.events().iter().all(|e| e.target == first));
        }

        #[test]
        fn test_activation_ignores_visibility() {
            let mut doc = page();
            let (outcome, _) = run(&mut doc, &LocatorQuery::activate(Strategy::ByClassName, "btn"));
            assert!(outcome.activated);
            assert_eq!(doc.events().len(), 2);
        }

        #[test]
        fn test_click_activation_style() {
            let mut doc = page();
            let mut sink = MemorySink::new();
            let config = LocatorConfig::default().with_activation(ActivationStyle::Click);
            Locator::new(&mut doc, &mut sink)
                .with_config(config)
                .run(&LocatorQuery::activate(Strategy::ById, "f"))
                .unwrap();
            assert_eq!(doc.events().len(), 1);
            assert_eq!(doc.events()[0].event.kind, PointerKind::Click);
        }

        #[test]
        fn test_text_match_activates_text_node() {
            let mut doc = page();
            let text = doc.body_text_nodes()[0];
            run(&mut doc, &LocatorQuery::activate(Strategy::ByTextContent, "Sign in"));
            assert_eq!(doc.events()[0].target, text);
        }

        #[test]
        fn test_no_match_no_activation() {
            let mut doc = page();
            let (outcome, sink) = run(&mut doc, &LocatorQuery::activate(Strategy::ByName, "nope"));
            assert!(!outcome.activated);
            assert!(doc.events().is_empty());
            assert_eq!(sink.sentinel_count(), 1);
        }
    }

    mod set_value_tests {
        use super::*;

        fn set(doc: &mut SnapshotDocument, strategy: Strategy, value: &str, text: &str) -> (Outcome, MemorySink) {
            let mut sink = MemorySink::new();
            let outcome = Locator::new(doc, &mut sink).set_value(strategy, value, text).unwrap();
            (outcome, sink)
        }

        #[test]
        fn test_assigns_first_match_only() {
            let mut doc = page();
            let (outcome, sink) = set(&mut doc, Strategy::ByClassName, "field", "x");
            assert!(outcome.assigned);
            assert_eq!(sink.lines(), ["robotium-finished"]);
            let inputs = doc.elements_by_tag_name("input");
            assert_eq!(doc.value_of(inputs[0]), Some("x"));
            assert_eq!(doc.value_of(inputs[1]), Some(""));
        }

        #[test]
        fn test_text_match_assigns_parent() {
            let mut doc = page();
            set(&mut doc, Strategy::ByTextContent, "Sign in", "go");
            let button = doc.elements_by_tag_name("button")[0];
            assert_eq!(doc.value_of(button), Some("go"));
        }

        #[test]
        fn test_no_match_is_noop() {
            let mut doc = page();
            let (outcome, sink) = set(&mut doc, Strategy::BySelector, "#missing", "x");
            assert!(!outcome.assigned);
            assert_eq!(sink.lines(), ["robotium-finished"]);
        }

        #[test]
        fn test_path_expression_set_value() {
            let mut doc = page();
            set(&mut doc, Strategy::ByPathExpression, "//input[@name='password']", "pw");
            let inputs = doc.elements_by_tag_name("input");
            assert_eq!(doc.value_of(inputs[1]), Some("pw"));
        }
    }
}
