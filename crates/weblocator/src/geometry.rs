//! Viewport geometry and the visibility filter.
//!
//! A candidate is reportable only when its box has area and its origin is
//! not left of or above the viewport. Overflow to the right or below is not
//! checked, and no distinction is made between clipped and fully shown boxes.

use serde::{Deserialize, Serialize};

/// Bounding box in viewport coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Distance from the viewport's left edge
    pub left: f64,
    /// Distance from the viewport's top edge
    pub top: f64,
    /// Box width
    pub width: f64,
    /// Box height
    pub height: f64,
}

impl Rect {
    /// Create a new rectangle
    #[must_use]
    pub const fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Zero-area rectangle at the origin, the box of a collapsed node
    #[must_use]
    pub const fn collapsed() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }

    /// Whether a candidate with this box passes the visibility filter
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.left >= 0.0 && self.top >= 0.0
    }

    /// Centre point, used by the harness as the click target
    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        (self.left + self.width / 2.0, self.top + self.height / 2.0)
    }
}

/// Render a coordinate the way a script engine prints a number.
///
/// Whole values drop their fraction (`12`, not `12.0`) and negative zero
/// prints as `0`. Non-finite values print as `NaN`/`Infinity`. Magnitudes
/// below `1e-6` or from `1e21` up use exponent form with an explicit sign
/// (`1e-7`, `1.5e+21`).
#[must_use]
pub fn format_coordinate(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }
    let magnitude = value.abs();
    if (1e-6..1e21).contains(&magnitude) {
        return format!("{value}");
    }
    let exponent = format!("{value:e}");
    match exponent.split_once('e') {
        Some((mantissa, power)) if !power.starts_with('-') => format!("{mantissa}e+{power}"),
        _ => exponent,
    }
}
