use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use classync::cli::args::{Cli, Commands};
use classync::cli::commands::{self, Session};
use classync::config::Config;
use classync::error::ClassyncError;
use classync::features::sync::QueueStore;

fn main() {
    setup_logging();

    if let Err(e) = run() {
        eprintln!("{}: {:#}", "error".red().bold(), e);
        let err = e.downcast_ref::<ClassyncError>();
        if err.is_some_and(ClassyncError::is_connectivity) {
            eprintln!(
                "{}",
                "The dashboard API is unreachable. Writes are queued while offline; reads need a connection."
                    .dimmed()
            );
        }
        std::process::exit(err.map_or(1, ClassyncError::exit_code));
    }
}

/// Log to stderr so command output on stdout stays parseable.
fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load().context("loading configuration")?;
    let format = cli.output.unwrap_or(config.general.default_output);

    let output = match cli.command {
        Commands::Queue(args) => {
            let queue = QueueStore::new()?;
            commands::queue(&queue, args.command, format)?
        }
        Commands::Sync => commands::sync(&Session::open(config)?, format)?,
        Commands::Watch { interval } => commands::watch(&Session::open(config)?, interval, format)?,
        Commands::Classroom(args) => {
            commands::classroom(&Session::open(config)?, args.command, format)?
        }
    };

    if !output.is_empty() {
        println!("{}", output);
    }
    Ok(())
}
