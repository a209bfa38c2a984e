//! Weblocator CLI Library
//!
//! Command-line tooling around the weblocator agent: run calls against
//! document fixtures, render call text and decode agent output the way a
//! harness would.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)] // Error types are self-documenting

mod commands;
mod config;
mod error;
mod output;
mod runner;

pub use commands::{Cli, Commands, ConfigArgs, DecodeArgs, RunArgs, ScriptArgs};
pub use config::{init_logging, CliConfig, Verbosity};
pub use error::{CliError, CliResult};
pub use output::{render_elements_text, render_run_text, OutputFormat};
pub use runner::{CallRunner, DecodeReport, RunReport};
