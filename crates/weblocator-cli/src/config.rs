//! CLI configuration and logging setup

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use weblocator::Config;

use crate::error::{CliError, CliResult};

/// Verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Verbosity {
    /// Errors only
    Quiet,
    /// Warnings and errors
    #[default]
    Normal,
    /// Informational messages
    Verbose,
    /// Per-request detail
    Debug,
    /// Per-candidate detail
    Trace,
}

impl Verbosity {
    /// Resolve from the `-v` count and `-q` flag; quiet wins
    #[must_use]
    pub const fn from_flags(verbose: u8, quiet: bool) -> Self {
        if quiet {
            return Self::Quiet;
        }
        match verbose {
            0 => Self::Normal,
            1 => Self::Verbose,
            2 => Self::Debug,
            _ => Self::Trace,
        }
    }

    /// Check if quiet mode
    #[must_use]
    pub const fn is_quiet(self) -> bool {
        matches!(self, Self::Quiet)
    }

    /// Default log filter directive for this level
    #[must_use]
    pub const fn filter(self) -> &'static str {
        match self {
            Self::Quiet => "error",
            Self::Normal => "warn",
            Self::Verbose => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

/// Settings resolved from flags and the optional configuration file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliConfig {
    /// Verbosity level
    pub verbosity: Verbosity,
    /// Agent and harness settings
    pub settings: Config,
}

impl CliConfig {
    /// Create a config with default settings
    #[must_use]
    pub fn new(verbosity: Verbosity) -> Self {
        Self {
            verbosity,
            settings: Config::default(),
        }
    }

    /// Load settings from `path`, or keep the defaults when there is none
    pub fn load(verbosity: Verbosity, path: Option<&Path>) -> CliResult<Self> {
        let settings = match path {
            Some(path) => Config::from_path(path)
                .map_err(|e| CliError::config(format!("{}: {e}", path.display())))?,
            None => Config::default(),
        };
        Ok(Self {
            verbosity,
            settings,
        })
    }
}

/// Install the stderr log subscriber.
///
/// `RUST_LOG` overrides the level implied by the verbosity flags. A second
/// call is a no-op.
pub fn init_logging(verbosity: Verbosity) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(verbosity.filter()));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    mod verbosity_tests {
        use super::*;

        #[test]
        fn test_from_flags() {
            assert_eq!(Verbosity::from_flags(0, false), Verbosity::Normal);
            assert_eq!(Verbosity::from_flags(1, false), Verbosity::Verbose);
            assert_eq!(Verbosity::from_flags(2, false), Verbosity::Debug);
            assert_eq!(Verbosity::from_flags(3, false), Verbosity::Trace);
            assert_eq!(Verbosity::from_flags(9, false), Verbosity::Trace);
        }

        #[test]
        fn test_quiet_wins() {
            assert!(Verbosity::from_flags(2, true).is_quiet());
        }

        #[test]
        fn test_filter() {
            assert_eq!(Verbosity::Quiet.filter(), "error");
            assert_eq!(Verbosity::Normal.filter(), "warn");
            assert_eq!(Verbosity::Trace.filter(), "trace");
        }
    }

    mod load_tests {
        use super::*;

        #[test]
        fn test_load_without_path_uses_defaults() {
            let config = CliConfig::load(Verbosity::Normal, None).unwrap();
            assert_eq!(config, CliConfig::new(Verbosity::Normal));
        }

        #[test]
        fn test_load_yaml_file() {
            let mut file = NamedTempFile::new().unwrap();
            writeln!(file, "harness:\n  origin_y: 48\n  scale: 2.0").unwrap();
            let config = CliConfig::load(Verbosity::Debug, Some(file.path())).unwrap();
            assert_eq!(config.verbosity, Verbosity::Debug);
            assert_eq!(config.settings.harness.origin_y, 48);
            assert_eq!(config.settings.harness.scale, 2.0);
        }

        #[test]
        fn test_load_rejects_bad_scale() {
            let mut file = NamedTempFile::new().unwrap();
            writeln!(file, "harness:\n  scale: 0.0").unwrap();
            let err = CliConfig::load(Verbosity::Normal, Some(file.path())).unwrap_err();
            assert!(matches!(err, CliError::Config { .. }));
            assert!(err.to_string().contains("scale"));
            assert!(err.to_string().contains(&file.path().display().to_string()));
        }

        #[test]
        fn test_load_missing_file() {
            let err = CliConfig::load(Verbosity::Normal, Some(Path::new("/no/such/config.yaml")))
                .unwrap_err();
            assert!(matches!(err, CliError::Config { .. }));
            assert!(err.to_string().contains("/no/such/config.yaml"));
        }
    }
}
