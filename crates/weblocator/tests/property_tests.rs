//! Property tests for the locator over generated documents.

#![allow(clippy::unwrap_used)]

use proptest::prelude::*;
use weblocator::{
    Attribute, ElementRecord, ElementSpec, Locator, LocatorQuery, MemorySink, Record, Rect,
    SnapshotDocument, Strategy as LookupStrategy, TextRecord, COMPLETION_SENTINEL,
};

#[derive(Debug, Clone)]
struct Item {
    class: &'static str,
    rect: Rect,
}

fn item() -> impl Strategy<Value = Item> {
    (
        prop::sample::select(vec!["btn", "link", "btn primary"]),
        -3.0f64..20.0,
        -3.0f64..20.0,
        prop::sample::select(vec![0.0, 1.0, 25.5]),
        prop::sample::select(vec![0.0, 2.0, 12.0]),
    )
        .prop_map(|(class, left, top, width, height)| Item {
            class,
            rect: Rect::new(left, top, width, height),
        })
}

fn build(items: &[Item]) -> SnapshotDocument {
    let mut doc = SnapshotDocument::new();
    let body = doc.body();
    for (i, item) in items.iter().enumerate() {
        doc.append_element(
            body,
            ElementSpec::new("span")
                .attr("id", format!("e{i}"))
                .attr("class", item.class)
                .rect(item.rect),
        );
    }
    doc
}

fn field() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 _.-]{0,12}"
}

fn coordinate() -> impl Strategy<Value = f64> {
    (0i32..4000).prop_map(|v| f64::from(v) / 4.0)
}

fn rect() -> impl Strategy<Value = Rect> {
    (coordinate(), coordinate(), coordinate(), coordinate())
        .prop_map(|(l, t, w, h)| Rect::new(l, t, w, h))
}

fn attribute() -> impl Strategy<Value = Attribute> {
    ("[a-z][a-z-]{0,8}", "[a-zA-Z0-9 /.:]{0,10}").prop_map(|(n, v)| Attribute::new(n, v))
}

proptest! {
    #[test]
    fn prop_report_emits_one_record_per_visible_match(items in prop::collection::vec(item(), 0..12)) {
        let mut doc = build(&items);
        let mut sink = MemorySink::new();
        Locator::new(&mut doc, &mut sink)
            .run(&LocatorQuery::report(LookupStrategy::ByClassName, "btn"))
            .unwrap();

        let expected: Vec<String> = items
            .iter()
            .enumerate()
            .filter(|(_, item)| item.class == "btn" && item.rect.is_visible())
            .map(|(i, _)| format!("e{i}"))
            .collect();
        let ids: Vec<String> = sink
            .records()
            .into_iter()
            .map(|line| match Record::decode(line).unwrap() {
                Record::Element(e) => e.id,
                Record::Text(t) => t.id,
            })
            .collect();
        prop_assert_eq!(ids, expected);
        prop_assert_eq!(sink.sentinel_count(), 1);
        prop_assert!(sink.is_finished());
    }

    #[test]
    fn prop_activate_emits_nothing_and_activates_at_most_once(
        items in prop::collection::vec(item(), 0..12),
        query in prop::sample::select(vec!["btn", "link", "missing"]),
    ) {
        let mut doc = build(&items);
        let mut sink = MemorySink::new();
        let outcome = Locator::new(&mut doc, &mut sink)
            .run(&LocatorQuery::activate(LookupStrategy::ByClassName, query))
            .unwrap();

        prop_assert_eq!(sink.lines(), [COMPLETION_SENTINEL]);
        let any_match = items.iter().any(|item| item.class == query);
        prop_assert_eq!(outcome.activated, any_match);
        prop_assert_eq!(doc.events().len(), if any_match { 2 } else { 0 });
    }

    #[test]
    fn prop_report_is_idempotent(items in prop::collection::vec(item(), 0..12)) {
        let mut doc = build(&items);
        let query = LocatorQuery::report(LookupStrategy::ByTagName, "span");
        let mut first = MemorySink::new();
        Locator::new(&mut doc, &mut first).run(&query).unwrap();
        let mut second = MemorySink::new();
        Locator::new(&mut doc, &mut second).run(&query).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_zero_area_is_never_visible(left in -10.0f64..10.0, top in -10.0f64..10.0, extent in 0.0f64..50.0) {
        prop_assert!(!Rect::new(left, top, 0.0, extent).is_visible());
        prop_assert!(!Rect::new(left, top, extent, 0.0).is_visible());
    }

    #[test]
    fn prop_element_record_round_trips(
        id in field(),
        text in prop::option::of(field()),
        name in prop::option::of(field()),
        class_name in field(),
        tag_name in "[A-Z]{1,8}",
        rect in rect(),
        attributes in prop::collection::vec(attribute(), 0..5),
    ) {
        prop_assume!(text.as_deref() != Some("undefined"));
        prop_assume!(name.as_deref() != Some("null"));
        let record = Record::Element(ElementRecord { id, text, name, class_name, tag_name, rect, attributes });
        prop_assert_eq!(Record::decode(&record.encode()).unwrap(), record);
    }

    #[test]
    fn prop_text_record_round_trips(
        id in field(),
        text in "[a-zA-Z0-9 ]{1,20}",
        name in prop::option::of(field()),
        tag_name in "[A-Z]{1,8}",
        rect in rect(),
    ) {
        prop_assume!(name.as_deref() != Some("null"));
        let record = Record::Text(TextRecord { id, text, name, class_name: String::new(), tag_name, rect });
        let line = record.encode();
        prop_assert_ne!(line.as_str(), COMPLETION_SENTINEL);
        prop_assert_eq!(Record::decode(&line).unwrap(), record);
    }
}
