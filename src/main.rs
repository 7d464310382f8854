//! `compiler`: command-line driver for the C front end
//!
//! # Usage
//!
//! ```bash
//! # Check a file: silent on success
//! compiler program.c
//!
//! # Inspect each stage
//! compiler --pp-tokens program.c
//! compiler --tokens program.c
//! compiler --symbols program.c
//!
//! # Trace scope handling while parsing
//! compiler -vv program.c
//! ```
//!
//! Any failure prints `ERROR: <message>` on stderr and exits with status 1.

use cfront::dump::{dump_pp_tokens, dump_symbols, dump_tokens};
use cfront::parser::Parser as CParser;
use clap::{CommandFactory, Parser, ValueEnum};
use crossterm::style::Stylize;
use crossterm::tty::IsTty;
use std::error::Error;
use std::fs;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info, warn};

#[derive(Parser)]
#[command(
    name = "compiler",
    version = env!("CARGO_PKG_VERSION"),
    about = "Front end for a C subset: normalizes, lexes, and parses one source file"
)]
struct Cli {
    /// C source file
    file: Option<PathBuf>,

    /// Print the preprocessing tokens and stop
    #[arg(long, conflicts_with_all = ["tokens", "symbols"])]
    pp_tokens: bool,

    /// Print the classified tokens and stop
    #[arg(long, conflicts_with = "symbols")]
    tokens: bool,

    /// Parse and print the symbol tables
    #[arg(long)]
    symbols: bool,

    /// Enable verbose logging (use multiple times for increased verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Set log level (overrides --verbose)
    #[arg(long, value_enum)]
    log: Option<LogLevel>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.log);

    let Some(file) = cli.file.clone() else {
        // No input: usage only.
        if let Err(err) = Cli::command().print_help() {
            warn!(%err, "cannot print usage");
        }
        println!();
        return ExitCode::SUCCESS;
    };

    // Panics are reported as a generic failure below.
    panic::set_hook(Box::new(|info| debug!(%info, "panic in pipeline")));

    match panic::catch_unwind(AssertUnwindSafe(|| run(&cli, file))) {
        Ok(Ok(())) => ExitCode::SUCCESS,
        Ok(Err(err)) => {
            report(&err.to_string());
            ExitCode::FAILURE
        }
        Err(_) => {
            report("internal compiler error");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli, file: PathBuf) -> Result<(), Box<dyn Error>> {
    let bytes = fs::read(&file).map_err(|e| format!("cannot read '{}': {}", file.display(), e))?;
    info!(file = %file.display(), bytes = bytes.len(), "read source");

    if cli.pp_tokens {
        print!("{}", dump_pp_tokens(&bytes)?);
        return Ok(());
    }
    if cli.tokens {
        print!("{}", dump_tokens(&bytes)?);
        return Ok(());
    }

    let unit = CParser::new(&bytes).parse_translation_unit()?;
    info!(
        globals = unit.global.len(),
        functions = unit.global.functions_sorted().len(),
        "parsed"
    );

    if cli.symbols {
        print!("{}", dump_symbols(&unit));
    }
    Ok(())
}

/// Print an error line, with a red tag when stderr is a terminal.
fn report(message: &str) {
    if io::stderr().is_tty() {
        eprintln!("{} {}", "ERROR:".red().bold(), message);
    } else {
        eprintln!("ERROR: {}", message);
    }
}

fn setup_logging(verbose: u8, log_level: Option<LogLevel>) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if let Some(level) = log_level {
        EnvFilter::new(match level {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        })
    } else {
        match verbose {
            0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    let formatter = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .with_level(true);

    tracing_subscriber::registry().with(formatter).with(filter).init();
}
