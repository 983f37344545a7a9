use anyhow::Result;
use bigdecimal::BigDecimal;
use clap::{Parser, Subcommand};
use std::{path::PathBuf, time::Instant};
use tracing::{info, span, Level};
use tracing_subscriber::prelude::*;

use crate::{config::Configuration, members::ProrationPolicy, parsing::EventLog};

mod config;
mod distribution;
mod engine;
mod events;
mod history;
mod lint;
mod members;
mod model;
mod normalize;
mod outstanding;
mod parsing;
mod split;
mod time;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[arg(short, long, value_name = "FILE")]
    path: PathBuf,
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
    #[arg(short, long)]
    minimum: Option<BigDecimal>,
    /// Also net payments made during the final, still open, cycle.
    #[arg(short, long)]
    adjusted: bool,
    #[arg(long, value_enum)]
    proration: Option<ProrationPolicy>,
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    Outstanding(outstanding::Command),
    History(history::Command),
    Events(events::Command),
    Lint(lint::Command),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let get_rust_log = || -> String {
        let fallback = match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        };
        std::env::var("RUST_LOG").unwrap_or_else(|_| fallback.into())
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(get_rust_log()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let log = {
        let _span = span!(Level::INFO, "loading").entered();
        let started = Instant::now();
        let log = EventLog::parse(&cli.path)?;
        let elapsed = Instant::now() - started;
        info!("loaded events in {:?}", elapsed);
        log
    };

    let get_options = || -> Result<engine::Options> {
        let config = match &cli.config {
            Some(path) => Configuration::load(path)?,
            None => Configuration::default(),
        };

        config.options(cli.minimum.clone(), cli.adjusted, cli.proration)
    };

    match &cli.command {
        Some(Commands::Outstanding(cmd)) => {
            outstanding::execute_command(&log.events()?, &get_options()?, cmd)
        }
        Some(Commands::History(cmd)) => {
            history::execute_command(&log.events()?, &get_options()?, cmd)
        }
        Some(Commands::Events(cmd)) => events::execute_command(&log.events()?, cmd),
        Some(Commands::Lint(cmd)) => lint::execute_command(&log, cmd),
        None => outstanding::execute_command(
            &log.events()?,
            &get_options()?,
            &outstanding::Command {
                json: false,
                member: None,
            },
        ),
    }
}
