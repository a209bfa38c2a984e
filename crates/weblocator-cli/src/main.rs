//! Weblocator CLI: drive the locator agent outside a page
//!
//! ## Usage
//!
//! ```bash
//! weblocator run page.yaml 'id("login", "false");'      # Channel lines for one call
//! weblocator run page.yaml -f enterTextByName -a q -a hi # Same, from a function name
//! weblocator decode agent.log --shown-only               # Harness view of agent output
//! weblocator script xpath '//a[@href]' false             # Call text for a harness
//! ```

use clap::Parser;
use std::fs::File;
use std::io::{self, BufReader};
use std::process::ExitCode;
use weblocator::{Request, ALL_TEXTS, ALL_WEB_ELEMENTS, QUERY_FUNCTIONS, SET_VALUE_FUNCTIONS};
use weblocator_cli::{
    init_logging, render_elements_text, render_run_text, CallRunner, Cli, CliConfig, CliError,
    CliResult, Commands, ConfigArgs, DecodeArgs, RunArgs, ScriptArgs, Verbosity,
};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();

    let verbosity = Verbosity::from_flags(cli.verbose, cli.quiet);
    init_logging(verbosity);
    let config = CliConfig::load(verbosity, cli.config.as_deref())?;

    match cli.command {
        Commands::Run(args) => run_call(config, &args),
        Commands::Decode(args) => run_decode(config, &args),
        Commands::Script(args) => run_script(&args),
        Commands::Functions => {
            run_functions();
            Ok(())
        }
        Commands::Config(args) => run_config(&config, &args),
    }
}

fn run_call(config: CliConfig, args: &RunArgs) -> CliResult<()> {
    let request =
        CallRunner::resolve_request(args.call.as_deref(), args.function.as_deref(), &args.args)?;
    let quiet = config.verbosity.is_quiet();
    let report = CallRunner::new(config).run(&args.fixture, &request)?;

    if let Some(rendered) = args.format.structured(&report)? {
        println!("{rendered}");
        return Ok(());
    }
    print!("{}", render_run_text(&report));
    if !quiet {
        eprintln!(
            "{} record(s), activated: {}, assigned: {}, skipped: {}",
            report.outcome.emitted,
            report.outcome.activated,
            report.outcome.assigned,
            report.outcome.skipped
        );
    }
    Ok(())
}

fn run_decode(config: CliConfig, args: &DecodeArgs) -> CliResult<()> {
    let runner = CallRunner::new(config);
    let report = match &args.input {
        Some(path) => runner.decode(BufReader::new(File::open(path)?))?,
        None => runner.decode(io::stdin().lock())?,
    };
    if !report.finished && !args.allow_unfinished {
        return Err(CliError::Unfinished {
            elements: report.elements.len(),
        });
    }

    let elements: Vec<_> = report
        .elements
        .iter()
        .filter(|e| !args.shown_only || runner.is_shown(e))
        .collect();
    match args.format.structured(&elements)? {
        Some(rendered) => println!("{rendered}"),
        None => print!("{}", render_elements_text(&elements)),
    }
    Ok(())
}

fn run_script(args: &ScriptArgs) -> CliResult<()> {
    let request = Request::parse(&args.function, &args.args)?;
    println!("{}", request.to_script());
    Ok(())
}

fn run_functions() {
    for (name, strategy) in QUERY_FUNCTIONS {
        println!("{name}(query, activate)  {strategy}");
    }
    for (name, strategy) in SET_VALUE_FUNCTIONS {
        println!("{name}(query, text)  {strategy}");
    }
    println!("{ALL_WEB_ELEMENTS}()");
    println!("{ALL_TEXTS}()");
}

fn run_config(config: &CliConfig, args: &ConfigArgs) -> CliResult<()> {
    match args.format.structured(&config.settings)? {
        Some(rendered) => println!("{rendered}"),
        None => print!("{}", serde_yaml_ng::to_string(&config.settings)?),
    }
    Ok(())
}
