//! Result and error types for the locator agent.

use thiserror::Error;

/// Result type for locator operations
pub type LocatorResult<T> = Result<T, LocatorError>;

/// Errors that end a request abnormally.
///
/// Most lookup problems never reach this type: a miss is an empty result and
/// a fault on one candidate is logged and skipped. What remains here are the
/// failures a request cannot recover from.
#[derive(Debug, Error)]
pub enum LocatorError {
    /// The document rejected a path expression
    #[error("Path expression {expression:?} failed: {message}")]
    PathExpression {
        /// Expression as received
        expression: String,
        /// Reason reported by the document
        message: String,
    },

    /// Inbound call named a function the agent does not export
    #[error("Unknown function: {name}")]
    UnknownFunction {
        /// Function name as received
        name: String,
    },

    /// Inbound call had the wrong number of arguments
    #[error("{function} expects {expected} argument(s), got {actual}")]
    Arity {
        /// Function name
        function: String,
        /// Arguments the function takes
        expected: usize,
        /// Arguments supplied
        actual: usize,
    },

    /// Invocation text is not of the form `name("arg", ...);`
    #[error("Malformed call {call:?}: {message}")]
    MalformedCall {
        /// Invocation as received
        call: String,
        /// What is wrong with it
        message: String,
    },

    /// Output channel refused a line
    #[error("Output channel failed: {message}")]
    Sink {
        /// Error message
        message: String,
    },

    /// Configuration could not be loaded
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Document fixture is malformed
    #[error("Fixture error: {message}")]
    Fixture {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LocatorError {
    /// Create a sink error
    #[must_use]
    pub fn sink(message: impl Into<String>) -> Self {
        Self::Sink {
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a fixture error
    #[must_use]
    pub fn fixture(message: impl Into<String>) -> Self {
        Self::Fixture {
            message: message.into(),
        }
    }

    /// Whether the harness still receives the completion sentinel.
    ///
    /// A rejected path expression surfaces without one, as does a broken
    /// channel. Argument errors are raised before any traversal starts.
    #[must_use]
    pub const fn leaves_request_open(&self) -> bool {
        matches!(self, Self::PathExpression { .. } | Self::Sink { .. })
    }
}
