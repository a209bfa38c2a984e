//! The one-way outbound channel.
//!
//! Every request pushes zero or more record lines, each as soon as it is
//! encoded, followed by exactly one [`COMPLETION_SENTINEL`]. The harness
//! treats the sentinel, and only the sentinel, as end-of-request.

use std::io::Write;

use crate::result::{LocatorError, LocatorResult};

/// Marks the end of a request
pub const COMPLETION_SENTINEL: &str = "robotium-finished";

/// Single-method capability through which the agent reports.
pub trait OutputSink {
    /// Push one line to the harness
    fn push(&mut self, line: &str) -> LocatorResult<()>;

    /// Push the completion sentinel
    fn finish(&mut self) -> LocatorResult<()> {
        self.push(COMPLETION_SENTINEL)
    }
}

impl<S: OutputSink + ?Sized> OutputSink for &mut S {
    fn push(&mut self, line: &str) -> LocatorResult<()> {
        (**self).push(line)
    }
}

/// Sink that keeps every pushed line in memory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemorySink {
    lines: Vec<String>,
}

impl MemorySink {
    /// Create an empty sink
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All lines pushed so far, sentinel included
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Lines pushed before the first sentinel
    #[must_use]
    pub fn records(&self) -> Vec<&str> {
        self.lines
            .iter()
            .map(String::as_str)
            .take_while(|line| *line != COMPLETION_SENTINEL)
            .collect()
    }

    /// Number of sentinels pushed
    #[must_use]
    pub fn sentinel_count(&self) -> usize {
        self.lines
            .iter()
            .filter(|line| *line == COMPLETION_SENTINEL)
            .count()
    }

    /// Whether the last line pushed is the sentinel
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.lines.last().is_some_and(|l| l == COMPLETION_SENTINEL)
    }

    /// Drop all lines
    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

impl OutputSink for MemorySink {
    fn push(&mut self, line: &str) -> LocatorResult<()> {
        self.lines.push(line.to_string());
        Ok(())
    }
}

/// Sink writing one line per push to an [`io::Write`](std::io::Write)
#[derive(Debug)]
pub struct WriterSink<W: Write> {
    writer: W,
}

impl<W: Write> WriterSink<W> {
    /// Wrap a writer
    pub const fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Recover the writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> OutputSink for WriterSink<W> {
    fn push(&mut self, line: &str) -> LocatorResult<()> {
        writeln!(self.writer, "{line}").map_err(|e| LocatorError::sink(e.to_string()))?;
        self.writer
            .flush()
            .map_err(|e| LocatorError::sink(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_collects_lines() {
        let mut sink = MemorySink::new();
        sink.push("a;,b").unwrap();
        sink.finish().unwrap();
        assert_eq!(sink.lines(), ["a;,b", COMPLETION_SENTINEL]);
        assert_eq!(sink.records(), vec!["a;,b"]);
        assert_eq!(sink.sentinel_count(), 1);
        assert!(sink.is_finished());
    }

    #[test]
    fn test_memory_sink_clear() {
        let mut sink = MemorySink::new();
        sink.finish().unwrap();
        sink.clear();
        assert!(sink.lines().is_empty());
        assert!(!sink.is_finished());
    }

    #[test]
    fn test_writer_sink_writes_lines() {
        let mut sink = WriterSink::new(Vec::new());
        sink.push("x;,y").unwrap();
        sink.finish().unwrap();
        let out = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(out, "x;,y\nrobotium-finished\n");
    }

    #[test]
    fn test_mut_ref_forwards() {
        fn finish_via<S: OutputSink>(mut sink: S) {
            sink.finish().unwrap();
        }

        let mut sink = MemorySink::new();
        finish_via(&mut sink);
        assert_eq!(sink.sentinel_count(), 1);
    }
}
