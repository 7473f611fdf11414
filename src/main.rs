use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

use stockwatch::cli::{Cli, Commands};
use stockwatch::config::Config;
use stockwatch::dispatcher::{self, AppContext};

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            error!("{:#}", err);
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<bool> {
    let config = Config::load(cli.config.as_deref())?;

    let log_dir = match &cli.command {
        Commands::Run { log_dir, .. } => log_dir.clone().or_else(|| config.log_dir.clone()),
        _ => None,
    };
    init_logging(log_dir.as_deref(), cli.no_color)?;

    let ctx = AppContext {
        db_path: cli.db.clone().or_else(|| config.database.clone()),
        json_output: cli.json,
        config,
    };

    dispatcher::dispatch(cli.command, &ctx)
}

/// Log to stderr, or to `<dir>/app-<timestamp>.log` when a directory is given.
fn init_logging(log_dir: Option<&Path>, no_color: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let name = format!("app-{}.log", chrono::Local::now().format("%Y-%m-%d-%H-%M-%S"));
            let file = std::fs::File::create(dir.join(&name))
                .with_context(|| format!("Failed to create log file {}", name))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(!no_color)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}
