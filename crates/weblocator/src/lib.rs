//! Weblocator: page-embedded element locator agent
//!
//! The agent runs inside a rendered page on behalf of an external test
//! harness that has no DOM access of its own. Each request names a lookup
//! strategy and a query. The agent either activates the first match or
//! reports every visible match as a delimited text record, then pushes a
//! completion sentinel down the one-way channel.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  id("a","false");  ┌───────────────────────────────┐
//! │   Harness    │───────────────────►│ Request ─► Locator ─► Record  │
//! │ (collector)  │◄───────────────────│     │          │         │    │
//! └──────────────┘  a;,Hi;,n;,...     │     ▼          ▼         ▼    │
//!                   robotium-finished │  DocumentHost        OutputSink│
//!                                     └───────────────────────────────┘
//! ```
//!
//! [`DocumentHost`] abstracts the live document: [`SnapshotDocument`] is an
//! in-memory host for tests and tooling, and on `wasm32` the `web` module
//! binds the real page. [`OutputSink`] abstracts the channel.
//!
//! ```rust
//! use weblocator::{
//!     ElementSpec, Locator, LocatorQuery, MemorySink, Rect, SnapshotDocument, Strategy,
//! };
//!
//! let mut doc = SnapshotDocument::new();
//! let body = doc.body();
//! let div = doc.append_element(
//!     body,
//!     ElementSpec::new("div").attr("id", "a").rect(Rect::new(0.0, 0.0, 80.0, 20.0)),
//! );
//! doc.append_text(div, "Hi", Rect::new(0.0, 0.0, 12.0, 20.0));
//!
//! let mut sink = MemorySink::new();
//! let outcome = Locator::new(&mut doc, &mut sink)
//!     .run(&LocatorQuery::report(Strategy::ById, "a"))
//!     .unwrap();
//! assert_eq!(outcome.emitted, 1);
//! assert_eq!(sink.lines()[1], "robotium-finished");
//! ```

#![warn(missing_docs)]

mod channel;
mod config;
mod dom;
mod geometry;
mod harness;
mod locator;
mod record;
mod request;
mod result;
mod snapshot;
mod sweep;

/// Browser binding, only built for `wasm32`
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use channel::{MemorySink, OutputSink, WriterSink, COMPLETION_SENTINEL};
pub use config::{
    ActivationStyle, Config, HarnessConfig, LocatorConfig, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_TIMEOUT_MS,
};
pub use dom::{Candidate, DocumentHost, DomFault, PointerEvent, PointerKind};
pub use geometry::{format_coordinate, Rect};
pub use harness::{ChannelMessage, ElementCollector, WebElement};
pub use locator::{Locator, LocatorQuery, Mode, Outcome, Strategy, ACTIVATE_FLAG};
pub use record::{
    decode_attributes, encode_attributes, Attribute, ElementRecord, Record, RecordError,
    TextRecord, ABSENT_NAME, ABSENT_TEXT, ATTRIBUTE_DELIMITER, ATTRIBUTE_SEPARATOR,
    ELEMENT_RECORD_FIELDS, FIELD_DELIMITER, TEXT_RECORD_FIELDS,
};
pub use request::{Request, ALL_TEXTS, ALL_WEB_ELEMENTS, QUERY_FUNCTIONS, SET_VALUE_FUNCTIONS};
pub use result::{LocatorError, LocatorResult};
pub use snapshot::{
    AttributeMap, BodyFixture, DispatchedEvent, DocumentFixture, ElementFixture, ElementSpec,
    NodeFixture, NodeId, SnapshotDocument,
};
