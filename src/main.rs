use std::process::ExitCode;

use anyhow::{Context, Result};
use asmqc::cli::Cli;
use asmqc::config::{discover_config, load_config_from_path, RunConfig};
use asmqc::errors::{Error, EXIT_USAGE};
use asmqc::observability::init_tracing;
use clap::Parser;
use colored::Colorize;

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            // --help and --version are not failures
            return if e.use_stderr() {
                ExitCode::from(EXIT_USAGE)
            } else {
                ExitCode::SUCCESS
            };
        }
    };
    init_tracing(cli.verbosity);

    let config = match resolve_config(cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", format!("{:#}", e).red());
            let code = e.downcast_ref::<Error>().map_or(EXIT_USAGE, Error::exit_code);
            return ExitCode::from(code);
        }
    };
    ExitCode::from(asmqc::commands::execute(&config))
}

// Command line > config file > defaults; inputs are checked before any
// output directory exists.
fn resolve_config(cli: Cli) -> Result<RunConfig> {
    let file = match &cli.config {
        Some(path) => load_config_from_path(path)
            .with_context(|| format!("Cannot load configuration {}", path.display()))?,
        None => {
            let cwd = std::env::current_dir().context("Cannot determine working directory")?;
            discover_config(&cwd)?
        }
    };
    let config = cli.into_config(file);
    config.validate()?;
    config.check_files()?;
    Ok(config)
}
