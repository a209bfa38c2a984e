//! Inbound dispatch.
//!
//! The harness drives the agent by evaluating one function call per request,
//! e.g. `cssSelector("button.primary", "true");`. [`Request`] is the typed
//! form of such a call: it can be parsed from a function name and arguments
//! or from the call text itself, rendered back to call text, and executed.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::channel::OutputSink;
use crate::config::LocatorConfig;
use crate::dom::DocumentHost;
use crate::locator::{Locator, LocatorQuery, Mode, Outcome, Strategy};
use crate::result::{LocatorError, LocatorResult};

/// Query functions and the strategy each selects
pub const QUERY_FUNCTIONS: [(&str, Strategy); 7] = [
    ("id", Strategy::ById),
    ("xpath", Strategy::ByPathExpression),
    ("cssSelector", Strategy::BySelector),
    ("name", Strategy::ByName),
    ("className", Strategy::ByClassName),
    ("tagName", Strategy::ByTagName),
    ("textContent", Strategy::ByTextContent),
];

/// Set-value functions and the strategy each selects
pub const SET_VALUE_FUNCTIONS: [(&str, Strategy); 7] = [
    ("enterTextById", Strategy::ById),
    ("enterTextByXpath", Strategy::ByPathExpression),
    ("enterTextByCssSelector", Strategy::BySelector),
    ("enterTextByName", Strategy::ByName),
    ("enterTextByClassName", Strategy::ByClassName),
    ("enterTextByTagName", Strategy::ByTagName),
    ("enterTextByTextContent", Strategy::ByTextContent),
];

/// Element sweep function
pub const ALL_WEB_ELEMENTS: &str = "allWebElements";

/// Text sweep function
pub const ALL_TEXTS: &str = "allTexts";

/// One inbound call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "request", rename_all = "snake_case")]
pub enum Request {
    /// Locate with a strategy, then activate or report
    Query(LocatorQuery),
    /// Assign a value to the first match
    SetValue {
        /// Lookup technique
        strategy: Strategy,
        /// Query value
        value: String,
        /// Value to assign
        text: String,
    },
    /// Report every visible element
    AllWebElements,
    /// Report every visible text node
    AllTexts,
}

impl Request {
    /// Build a request from a function name and its string arguments.
    pub fn parse<A: AsRef<str>>(function: &str, args: &[A]) -> LocatorResult<Self> {
        let arg = |i: usize| args[i].as_ref().to_string();

        if let Some(strategy) = lookup(&QUERY_FUNCTIONS, function) {
            check_arity(function, 2, args.len())?;
            return Ok(Self::Query(LocatorQuery::new(
                strategy,
                arg(0),
                Mode::from_flag(args[1].as_ref()),
            )));
        }
        if let Some(strategy) = lookup(&SET_VALUE_FUNCTIONS, function) {
            check_arity(function, 2, args.len())?;
            return Ok(Self::SetValue {
                strategy,
                value: arg(0),
                text: arg(1),
            });
        }
        match function {
            ALL_WEB_ELEMENTS => {
                check_arity(function, 0, args.len())?;
                Ok(Self::AllWebElements)
            }
            ALL_TEXTS => {
                check_arity(function, 0, args.len())?;
                Ok(Self::AllTexts)
            }
            _ => Err(LocatorError::UnknownFunction {
                name: function.to_string(),
            }),
        }
    }

    /// Name of the function this request calls
    #[must_use]
    pub fn function_name(&self) -> &'static str {
        let name_of = |table: &[(&'static str, Strategy)], strategy: Strategy| {
            table
                .iter()
                .find(|(_, s)| *s == strategy)
                .map_or("", |(name, _)| *name)
        };
        match self {
            Self::Query(query) => name_of(&QUERY_FUNCTIONS[..], query.strategy),
            Self::SetValue { strategy, .. } => name_of(&SET_VALUE_FUNCTIONS[..], *strategy),
            Self::AllWebElements => ALL_WEB_ELEMENTS,
            Self::AllTexts => ALL_TEXTS,
        }
    }

    /// Arguments as passed to the function
    #[must_use]
    pub fn arguments(&self) -> Vec<&str> {
        match self {
            Self::Query(query) => vec![query.value.as_str(), query.mode.as_flag()],
            Self::SetValue { value, text, .. } => vec![value.as_str(), text.as_str()],
            Self::AllWebElements | Self::AllTexts => Vec::new(),
        }
    }

    /// Render the call text the harness evaluates in the page
    #[must_use]
    pub fn to_script(&self) -> String {
        let args: Vec<String> = self.arguments().into_iter().map(quote).collect();
        format!("{}({});", self.function_name(), args.join(", "))
    }

    /// Run the request against a document, pushing output to `sink`.
    pub fn execute<H, S>(&self, host: &mut H, sink: &mut S, config: &LocatorConfig) -> LocatorResult<Outcome>
    where
        H: DocumentHost,
        S: OutputSink,
    {
        let mut locator = Locator::new(host, sink).with_config(config.clone());
        match self {
            Self::Query(query) => locator.run(query),
            Self::SetValue {
                strategy,
                value,
                text,
            } => locator.set_value(*strategy, value, text),
            Self::AllWebElements => locator.all_web_elements(),
            Self::AllTexts => locator.all_texts(),
        }
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_script())
    }
}

impl FromStr for Request {
    type Err = LocatorError;

    /// Parse call text such as `id("a", "true");`
    fn from_str(call: &str) -> Result<Self, Self::Err> {
        let malformed = |message: &str| LocatorError::MalformedCall {
            call: call.to_string(),
            message: message.to_string(),
        };
        let body = call.trim();
        let body = body.strip_suffix(';').unwrap_or(body).trim_end();
        let open = body.find('(').ok_or_else(|| malformed("missing '('"))?;
        let inner = body[open + 1..]
            .strip_suffix(')')
            .ok_or_else(|| malformed("missing ')'"))?;
        let function = body[..open].trim();
        if function.is_empty() {
            return Err(malformed("missing function name"));
        }
        let args: Vec<String> = serde_json::from_str(&format!("[{inner}]"))
            .map_err(|e| malformed(&format!("arguments must be string literals ({e})")))?;
        Self::parse(function, &args)
    }
}

fn lookup(table: &[(&str, Strategy)], function: &str) -> Option<Strategy> {
    table
        .iter()
        .find(|(name, _)| *name == function)
        .map(|(_, strategy)| *strategy)
}

fn check_arity(function: &str, expected: usize, actual: usize) -> LocatorResult<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(LocatorError::Arity {
            function: function.to_string(),
            expected,
            actual,
        })
    }
}

/// Quote a string as a script literal
fn quote(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("{value:?}"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::channel::MemorySink;
    use crate::geometry::Rect;
    use crate::snapshot::{ElementSpec, SnapshotDocument};

    mod parse_tests {
        use super::*;

        #[test]
        fn test_query_functions() {
            for (name, strategy) in QUERY_FUNCTIONS {
                let request = Request::parse(name, &["q", "true"]).unwrap();
                assert_eq!(request, Request::Query(LocatorQuery::activate(strategy, "q")));
                assert_eq!(request.function_name(), name);
            }
        }

        #[test]
        fn test_non_true_flag_reports() {
            let request = Request::parse("id", &["a", "yes"]).unwrap();
            assert_eq!(request, Request::Query(LocatorQuery::report(Strategy::ById, "a")));
        }

        #[test]
        fn test_set_value_functions() {
            for (name, strategy) in SET_VALUE_FUNCTIONS {
                let request = Request::parse(name, &["q", "v"]).unwrap();
                assert!(matches!(request, Request::SetValue { strategy: s, .. } if s == strategy));
                assert_eq!(request.function_name(), name);
            }
        }

        #[test]
        fn test_sweeps_take_no_arguments() {
            let none: [&str; 0] = [];
            assert_eq!(Request::parse("allTexts", &none).unwrap(), Request::AllTexts);
            let err = Request::parse("allWebElements", &["x"]).unwrap_err();
            assert!(matches!(err, LocatorError::Arity { expected: 0, actual: 1, .. }));
        }

        #[test]
        fn test_unknown_function() {
            let err = Request::parse("clickElement", &["x"]).unwrap_err();
            assert!(matches!(err, LocatorError::UnknownFunction { ref name } if name == "clickElement"));
        }

        #[test]
        fn test_arity_names_function() {
            let err = Request::parse("xpath", &["//a"]).unwrap_err();
            assert_eq!(err.to_string(), "xpath expects 2 argument(s), got 1");
        }
    }

    mod script_tests {
        use super::*;

        #[test]
        fn test_to_script() {
            let request = Request::Query(LocatorQuery::activate(Strategy::ById, "a"));
            assert_eq!(request.to_script(), r#"id("a", "true");"#);
            assert_eq!(Request::AllWebElements.to_script(), "allWebElements();");
        }

        #[test]
        fn test_to_script_escapes() {
            let request = Request::SetValue {
                strategy: Strategy::ByName,
                value: "q\"x".to_string(),
                text: "line\nbreak".to_string(),
            };
            assert_eq!(request.to_script(), r#"enterTextByName("q\"x", "line\nbreak");"#);
        }

        #[test]
        fn test_call_text_parses_back() {
            let request = Request::SetValue {
                strategy: Strategy::ByTextContent,
                value: "Sign \"in\"".to_string(),
                text: "\\".to_string(),
            };
            assert_eq!(request.to_script().parse::<Request>().unwrap(), request);
            assert_eq!("allTexts()".parse::<Request>().unwrap(), Request::AllTexts);
        }

        #[test]
        fn test_malformed_call() {
            for call in ["id", "id(\"a\", \"true\"", "(\"a\")", "id(a, true);"] {
                let err = call.parse::<Request>().unwrap_err();
                assert!(matches!(err, LocatorError::MalformedCall { .. }), "{call}");
            }
        }
    }

    #[test]
    fn test_execute_dispatches() {
        let mut doc = SnapshotDocument::new();
        let body = doc.body();
        let input = doc.append_element(
            body,
            ElementSpec::new("input")
                .attr("id", "e")
                .value("")
                .rect(Rect::new(0.0, 0.0, 10.0, 10.0)),
        );
        let mut sink = MemorySink::new();
        let config = LocatorConfig::default();

        let outcome = "id(\"e\", \"false\");"
            .parse::<Request>()
            .unwrap()
            .execute(&mut doc, &mut sink, &config)
            .unwrap();
        assert_eq!(outcome.emitted, 1);

        sink.clear();
        Request::parse("enterTextById", &["e", "hello"])
            .unwrap()
            .execute(&mut doc, &mut sink, &config)
            .unwrap();
        assert_eq!(doc.value_of(input), Some("hello"));
        assert_eq!(sink.lines(), ["robotium-finished"]);
    }
}
