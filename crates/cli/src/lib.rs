//! The `nodal` command-line tool: query JSON documents with path expressions and raise events
//! against the handlers linked into the binary.

mod commands;
mod handlers;
mod util;

use anyhow::anyhow;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use commands::{events, query, raise};
use nodal_core::Loader;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "nodal", version, about = "Query node trees and raise Nodal events")]
struct Cli {
    /// More log output (`-v` debug, `-vv` trace). `RUST_LOG` takes precedence.
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evaluate an expression against a JSON document.
    Query(query::QueryArgs),
    /// Raise an event with arguments read from a JSON document.
    Raise(raise::RaiseArgs),
    /// List the modules and events known to the loader.
    Events(events::EventsArgs),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let loader = Loader::global();
    let output = match &cli.command {
        Command::Query(args) => {
            let ctx = loader.create_context(None)?;
            query::run(&ctx, args)
        }
        Command::Raise(args) => raise::run(loader, args),
        Command::Events(args) => events::run(loader, args),
    }
    .map_err(into_report)?;

    if !output.is_empty() {
        println!("{output}");
    }
    Ok(())
}

/// Keeps the boxed error as the report's cause so `{:#}` prints the whole chain.
fn into_report(err: Box<dyn std::error::Error + Send + Sync>) -> anyhow::Error {
    anyhow!(err)
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}
