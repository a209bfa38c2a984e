//! Call execution against fixtures, and harness-side decoding

use serde::{Deserialize, Serialize};
use std::io::BufRead;
use std::path::Path;
use tracing::{debug, info};
use weblocator::{
    DispatchedEvent, DocumentFixture, ElementCollector, MemorySink, Outcome, Request, WebElement,
};

use crate::config::CliConfig;
use crate::error::{CliError, CliResult};

/// Everything one call produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// The call that ran
    pub request: Request,
    /// Channel lines in push order, sentinel included
    pub lines: Vec<String>,
    /// Request summary
    pub outcome: Outcome,
    /// Pointer events dispatched on the document
    pub events: Vec<DispatchedEvent>,
}

/// Decoded harness view of a request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecodeReport {
    /// Whether the completion sentinel arrived
    pub finished: bool,
    /// Lines that did not belong to the agent
    pub foreign: usize,
    /// Decoded elements
    pub elements: Vec<WebElement>,
}

/// Runs calls and decodes output with one set of settings
#[derive(Debug, Clone)]
pub struct CallRunner {
    config: CliConfig,
}

impl CallRunner {
    /// Create a runner
    #[must_use]
    pub const fn new(config: CliConfig) -> Self {
        Self { config }
    }

    /// Settings in use
    #[must_use]
    pub const fn config(&self) -> &CliConfig {
        &self.config
    }

    /// Resolve a request from call text or a function name with arguments
    pub fn resolve_request(
        call: Option<&str>,
        function: Option<&str>,
        args: &[String],
    ) -> CliResult<Request> {
        match (call, function) {
            (Some(call), None) => Ok(call.parse()?),
            (None, Some(function)) => Ok(Request::parse(function, args)?),
            (Some(_), Some(_)) => Err(CliError::invalid_argument(
                "give either call text or --function, not both",
            )),
            (None, None) => Err(CliError::invalid_argument(
                "a call is required, e.g. 'id(\"login\", \"false\");'",
            )),
        }
    }

    /// Load `fixture` and run `request` against it
    pub fn run(&self, fixture: &Path, request: &Request) -> CliResult<RunReport> {
        let mut doc = DocumentFixture::from_path(fixture)?.build()?;
        info!(fixture = %fixture.display(), nodes = doc.len(), "loaded fixture");

        let mut sink = MemorySink::new();
        let outcome = request.execute(&mut doc, &mut sink, &self.config.settings.locator)?;
        debug!(
            call = %request,
            emitted = outcome.emitted,
            activated = outcome.activated,
            assigned = outcome.assigned,
            skipped = outcome.skipped,
            "call finished"
        );

        Ok(RunReport {
            request: request.clone(),
            lines: sink.lines().to_vec(),
            outcome,
            events: doc.events().to_vec(),
        })
    }

    /// Feed agent output lines through a collector until the sentinel or
    /// the end of input
    pub fn decode(&self, input: impl BufRead) -> CliResult<DecodeReport> {
        let mut collector = ElementCollector::new(self.config.settings.harness.clone());
        collector.prepare_for_start();
        let mut foreign = 0;
        for line in input.lines() {
            let line = line?;
            if !collector.accept(&line) {
                foreign += 1;
            }
            if collector.is_finished() {
                break;
            }
        }
        debug!(
            elements = collector.elements().len(),
            foreign,
            finished = collector.is_finished(),
            "decoded agent output"
        );

        Ok(DecodeReport {
            finished: collector.is_finished(),
            foreign,
            elements: collector.elements().to_vec(),
        })
    }

    /// Whether an element's click point lies inside the configured view
    #[must_use]
    pub fn is_shown(&self, element: &WebElement) -> bool {
        self.config.settings.harness.is_sufficiently_shown(element)
    }
}
