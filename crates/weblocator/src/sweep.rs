//! Whole-document reporting.

use tracing::debug;

use crate::channel::OutputSink;
use crate::dom::{Candidate, DocumentHost};
use crate::locator::{Locator, Outcome};
use crate::result::LocatorResult;

impl<H: DocumentHost, S: OutputSink> Locator<'_, H, S> {
    /// Report every visible element in the document, `head` included.
    pub fn all_web_elements(&mut self) -> LocatorResult<Outcome> {
        let nodes = self.host().all_elements();
        debug!(count = nodes.len(), "sweeping elements");
        self.sweep(nodes.into_iter().map(Candidate::Element))
    }

    /// Report every visible, non-blank text node under `body`.
    pub fn all_texts(&mut self) -> LocatorResult<Outcome> {
        let nodes = self.host().body_text_nodes();
        debug!(count = nodes.len(), "sweeping text nodes");
        self.sweep(nodes.into_iter().map(Candidate::Text))
    }

    fn sweep(&mut self, candidates: impl Iterator<Item = Candidate<H::Node>>) -> LocatorResult<Outcome> {
        let mut outcome = Outcome::default();
        for candidate in candidates {
            self.report(&candidate, &mut outcome)?;
        }
        self.finish()?;
        Ok(outcome)
    }
}
