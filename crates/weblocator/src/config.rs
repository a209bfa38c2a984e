//! Agent and harness configuration.
//!
//! Both halves load from YAML or JSON. Every field has a default, so an empty
//! document is a valid configuration:
//!
//! ```yaml
//! locator:
//!   activation: press-release
//!   warn_on_delimiter_collision: true
//! harness:
//!   origin_x: 0
//!   origin_y: 48
//!   view_height: 1800
//!   scale: 2.0
//! ```

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::result::{LocatorError, LocatorResult};

/// Default wait for a request to finish
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Default pause between completion checks
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 300;

/// How an Activate-mode request triggers its target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActivationStyle {
    /// `mousedown` followed by `mouseup`
    #[default]
    PressRelease,
    /// A single `click` event
    Click,
}

/// In-page agent settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    /// Pointer event sequence used for activation
    pub activation: ActivationStyle,
    /// Log a warning when an emitted field contains a wire delimiter
    pub warn_on_delimiter_collision: bool,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            activation: ActivationStyle::PressRelease,
            warn_on_delimiter_collision: true,
        }
    }
}

impl LocatorConfig {
    /// Set the activation style
    #[must_use]
    pub const fn with_activation(mut self, activation: ActivationStyle) -> Self {
        self.activation = activation;
        self
    }
}

/// Harness-side settings for turning records into screen coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Screen x of the embedding view's top-left corner
    pub origin_x: i64,
    /// Screen y of the embedding view's top-left corner
    pub origin_y: i64,
    /// Height of the embedding view on screen
    pub view_height: i64,
    /// Page-to-screen scale factor
    pub scale: f64,
    /// How long to wait for the sentinel, in milliseconds
    pub timeout_ms: u64,
    /// Pause between completion checks, in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            origin_x: 0,
            origin_y: 0,
            view_height: 0,
            scale: 1.0,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl HarnessConfig {
    /// Set the view's screen origin
    #[must_use]
    pub const fn with_origin(mut self, x: i64, y: i64) -> Self {
        self.origin_x = x;
        self.origin_y = y;
        self
    }

    /// Set the view height
    #[must_use]
    pub const fn with_view_height(mut self, height: i64) -> Self {
        self.view_height = height;
        self
    }

    /// Set the scale factor
    #[must_use]
    pub const fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    /// Wait timeout
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Poll interval
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    fn validate(self) -> LocatorResult<Self> {
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(LocatorError::config(format!(
                "scale must be a positive number, got {}",
                self.scale
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(LocatorError::config("poll_interval_ms must be non-zero"));
        }
        Ok(self)
    }
}

/// Combined configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Agent settings
    pub locator: LocatorConfig,
    /// Harness settings
    pub harness: HarnessConfig,
}

impl Config {
    /// Parse YAML
    pub fn from_yaml_str(source: &str) -> LocatorResult<Self> {
        let config: Self = serde_yaml_ng::from_str(source)?;
        config.validated()
    }

    /// Parse JSON
    pub fn from_json_str(source: &str) -> LocatorResult<Self> {
        let config: Self = serde_json::from_str(source)?;
        config.validated()
    }

    /// Load a file; `.json` is read as JSON, anything else as YAML
    pub fn from_path(path: impl AsRef<Path>) -> LocatorResult<Self> {
        load_path::<Self>(path.as_ref())?.validated()
    }

    fn validated(self) -> LocatorResult<Self> {
        Ok(Self {
            locator: self.locator,
            harness: self.harness.validate()?,
        })
    }
}

impl LocatorConfig {
    /// Parse YAML
    pub fn from_yaml_str(source: &str) -> LocatorResult<Self> {
        Ok(serde_yaml_ng::from_str(source)?)
    }

    /// Load a file; `.json` is read as JSON, anything else as YAML
    pub fn from_path(path: impl AsRef<Path>) -> LocatorResult<Self> {
        load_path(path.as_ref())
    }
}

impl HarnessConfig {
    /// Parse YAML
    pub fn from_yaml_str(source: &str) -> LocatorResult<Self> {
        serde_yaml_ng::from_str::<Self>(source)?.validate()
    }

    /// Load a file; `.json` is read as JSON, anything else as YAML
    pub fn from_path(path: impl AsRef<Path>) -> LocatorResult<Self> {
        load_path::<Self>(path.as_ref())?.validate()
    }
}

/// Read a file as JSON when its extension is `.json`, YAML otherwise
pub(crate) fn load_path<T: DeserializeOwned>(path: &Path) -> LocatorResult<T> {
    let source = std::fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        Ok(serde_json::from_str(&source)?)
    } else {
        Ok(serde_yaml_ng::from_str(&source)?)
    }
}
