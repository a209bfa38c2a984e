//! End-to-end request scenarios against snapshot documents.
//!
//! Each test builds a page, runs one request through [`Request::execute`]
//! and checks what crossed the channel and what changed in the document.

#![allow(clippy::unwrap_used)]

use pretty_assertions::assert_eq;
use weblocator::{
    DocumentFixture, DocumentHost, ElementCollector, ElementSpec, HarnessConfig, LocatorConfig,
    LocatorError, MemorySink, PointerKind, Rect, Record, Request, SnapshotDocument,
    COMPLETION_SENTINEL,
};

const PAGE: &str = r"
body:
  rect: { left: 0, top: 0, width: 360, height: 640 }
  children:
    - tag: div
      attrs: { id: a, name: n }
      rect: { left: 0, top: 0, width: 100, height: 20 }
      children:
        - text: Hi
          rect: { left: 0, top: 0, width: 14, height: 20 }
    - tag: a
      attrs: { class: btn, href: /one }
      rect: { left: 0, top: 30, width: 60, height: 20 }
      children:
        - text: One
          rect: { left: 4, top: 30, width: 20, height: 20 }
    - tag: a
      attrs: { class: btn, href: /two }
      rect: { left: 70, top: 30, width: 60, height: 20 }
      children:
        - text: Two
          rect: { left: 74, top: 30, width: 20, height: 20 }
    - tag: button
      attrs: { id: first }
      rect: { left: 0, top: 60, width: 80, height: 24 }
    - tag: button
      attrs: { id: second }
      rect: { left: 90, top: 60, width: 80, height: 24 }
    - tag: input
      attrs: { name: email, type: email }
      value: ''
      rect: { left: 0, top: 90, width: 200, height: 24 }
";

fn page() -> SnapshotDocument {
    DocumentFixture::from_yaml_str(PAGE).unwrap().build().unwrap()
}

fn execute(doc: &mut SnapshotDocument, call: &str) -> MemorySink {
    let mut sink = MemorySink::new();
    call.parse::<Request>()
        .unwrap()
        .execute(doc, &mut sink, &LocatorConfig::default())
        .unwrap();
    sink
}

fn records(sink: &MemorySink) -> Vec<Record> {
    sink.records()
        .into_iter()
        .map(|line| Record::decode(line).unwrap())
        .collect()
}

#[test]
fn test_report_by_identifier() {
    let mut doc = page();
    let sink = execute(&mut doc, r#"id("a", "false");"#);

    let records = records(&sink);
    assert_eq!(records.len(), 1);
    let Record::Element(record) = &records[0] else {
        panic!("expected element record");
    };
    assert_eq!(record.id, "a");
    assert_eq!(record.text.as_deref(), Some("Hi"));
    assert_eq!(record.name.as_deref(), Some("n"));
    assert_eq!(sink.lines().last().unwrap(), COMPLETION_SENTINEL);
}

#[test]
fn test_missing_identifier_sends_sentinel_only() {
    let mut doc = page();
    let sink = execute(&mut doc, r#"id("nope", "false");"#);
    assert_eq!(sink.lines(), [COMPLETION_SENTINEL]);
}

#[test]
fn test_report_by_class_in_document_order() {
    let mut doc = page();
    let sink = execute(&mut doc, r#"className("btn", "false");"#);

    let hrefs: Vec<String> = records(&sink)
        .into_iter()
        .map(|record| match record {
            Record::Element(e) => e
                .attributes
                .into_iter()
                .find(|a| a.name == "href")
                .unwrap()
                .value,
            Record::Text(_) => panic!("expected element record"),
        })
        .collect();
    assert_eq!(hrefs, vec!["/one", "/two"]);
    assert!(doc.events().is_empty());
}

#[test]
fn test_activate_by_tag() {
    let mut doc = page();
    let sink = execute(&mut doc, r#"tagName("button", "true");"#);

    assert_eq!(sink.lines(), [COMPLETION_SENTINEL]);
    let first = doc.elements_by_tag_name("button")[0];
    let kinds: Vec<PointerKind> = doc.events().iter().map(|e| e.event.kind).collect();
    assert_eq!(kinds, vec![PointerKind::Press, PointerKind::Release]);
    assert!(doc.events().iter().all(|e| e.target == first));
    assert!(doc.events().iter().all(|e| e.event.bubbles && e.event.cancelable));
}

#[test]
fn test_set_value_by_name() {
    let mut doc = page();
    let sink = execute(&mut doc, r#"enterTextByName("email", "me@example.com");"#);

    assert_eq!(sink.lines(), [COMPLETION_SENTINEL]);
    let input = doc.elements_by_tag_name("input")[0];
    assert_eq!(doc.value_of(input), Some("me@example.com"));
}

#[test]
fn test_report_by_text_content() {
    let mut doc = page();
    let sink = execute(&mut doc, r#"textContent(" Two ", "false");"#);
    let records = records(&sink);
    assert_eq!(records.len(), 1);
    assert!(matches!(&records[0], Record::Text(t) if t.text == "Two" && t.tag_name == "A"));
}

#[test]
fn test_selector_and_path_expression_agree() {
    let mut doc = page();
    let by_selector = execute(&mut doc, r#"cssSelector("a.btn", "false");"#);
    let by_path = execute(&mut doc, r#"xpath("//a[@class='btn']", "false");"#);
    assert_eq!(by_selector.lines(), by_path.lines());
    assert_eq!(by_selector.records().len(), 2);
}

#[test]
fn test_rejected_path_expression_surfaces() {
    let mut doc = page();
    let mut sink = MemorySink::new();
    let err = Request::parse("xpath", &["//a[", "false"])
        .unwrap()
        .execute(&mut doc, &mut sink, &LocatorConfig::default())
        .unwrap_err();
    assert!(matches!(err, LocatorError::PathExpression { .. }));
    assert!(sink.lines().is_empty());
}

#[test]
fn test_faulty_candidate_is_skipped() {
    let mut doc = SnapshotDocument::new();
    let body = doc.body();
    for (class, unreadable) in [("row", false), ("row", true), ("row", false)] {
        let mut spec = ElementSpec::new("li")
            .attr("class", class)
            .rect(Rect::new(0.0, 0.0, 10.0, 10.0));
        if unreadable {
            spec = spec.unreadable();
        }
        doc.append_element(body, spec);
    }
    let sink = execute(&mut doc, r#"className("row", "false");"#);
    assert_eq!(sink.records().len(), 2);
    assert_eq!(sink.sentinel_count(), 1);
}

#[test]
fn test_report_is_idempotent() {
    let mut doc = page();
    let first = execute(&mut doc, "allWebElements();");
    let second = execute(&mut doc, "allWebElements();");
    assert_eq!(first, second);
}

#[test]
fn test_harness_collects_agent_output() {
    let mut doc = page();
    let sink = execute(&mut doc, "allTexts();");

    let mut collector = ElementCollector::new(
        HarnessConfig::default()
            .with_origin(0, 100)
            .with_view_height(140),
    );
    collector.prepare_for_start();
    for line in sink.lines() {
        assert!(collector.accept(line));
    }
    assert!(collector.is_finished());
    let texts: Vec<&str> = collector.elements().iter().map(|e| e.text.as_str()).collect();
    assert_eq!(texts, vec!["Hi", "One", "Two"]);
    // "One" and "Two" land on the view's bottom edge
    assert_eq!(collector.sufficiently_shown().len(), 1);
}
