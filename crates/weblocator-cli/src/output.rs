//! Output formatting

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use weblocator::WebElement;

use crate::error::CliResult;
use crate::runner::RunReport;

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
}

impl OutputFormat {
    /// Serialize a value in the structured formats.
    ///
    /// Returns `None` for [`OutputFormat::Text`], which each command renders
    /// its own way.
    pub fn structured<T: Serialize>(self, value: &T) -> CliResult<Option<String>> {
        match self {
            Self::Text => Ok(None),
            Self::Json => Ok(Some(serde_json::to_string_pretty(value)?)),
            Self::Yaml => Ok(Some(serde_yaml_ng::to_string(value)?)),
        }
    }
}

/// Render a run as the raw channel lines, one per line
#[must_use]
pub fn render_run_text(report: &RunReport) -> String {
    let mut out = String::new();
    for line in &report.lines {
        out.push_str(line);
        out.push('\n');
    }
    out
}

/// Render decoded elements as an aligned table
#[must_use]
pub fn render_elements_text(elements: &[&WebElement]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<8} {:<16} {:<20} {:>6} {:>6}",
        "TAG", "ID", "TEXT", "X", "Y"
    );
    for element in elements {
        let _ = writeln!(
            out,
            "{:<8} {:<16} {:<20} {:>6} {:>6}",
            element.tag_name,
            truncate(&element.id, 16),
            truncate(&element.text, 20),
            element.location_x,
            element.location_y
        );
    }
    let _ = writeln!(out, "{} element(s)", elements.len());
    out
}

fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        value.to_string()
    } else {
        let kept: String = value.chars().take(width.saturating_sub(1)).collect();
        format!("{kept}~")
    }
}
