//! CLI command definitions using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::output::OutputFormat;

/// Weblocator: run locator calls against document fixtures and decode agent output
#[derive(Parser, Debug)]
#[command(name = "weblocator")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file (YAML, or JSON with a .json extension)
    #[arg(short, long, global = true, env = "WEBLOCATOR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one locator call against a document fixture
    Run(RunArgs),

    /// Decode agent output the way a harness would
    Decode(DecodeArgs),

    /// Render the call text a harness evaluates in the page
    Script(ScriptArgs),

    /// List the functions the agent exports
    Functions,

    /// Show the effective configuration
    Config(ConfigArgs),
}

/// Arguments for the run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Document fixture (YAML, or JSON with a .json extension)
    pub fixture: PathBuf,

    /// Call text, e.g. 'id("login", "false");'
    #[arg(conflicts_with = "function")]
    pub call: Option<String>,

    /// Function name, as an alternative to call text
    #[arg(short, long)]
    pub function: Option<String>,

    /// Function argument (repeatable, in order)
    #[arg(short, long = "arg", requires = "function")]
    pub args: Vec<String>,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

/// Arguments for the decode command
#[derive(Parser, Debug)]
pub struct DecodeArgs {
    /// File of agent output lines (reads stdin when omitted)
    pub input: Option<PathBuf>,

    /// Keep only elements whose click point is inside the view
    #[arg(long)]
    pub shown_only: bool,

    /// Accept output that never reaches the completion sentinel
    #[arg(long)]
    pub allow_unfinished: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

/// Arguments for the script command
#[derive(Parser, Debug)]
pub struct ScriptArgs {
    /// Function name
    pub function: String,

    /// Function arguments, in order
    pub args: Vec<String>,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}
