mod cli;
mod commands;
mod config;
mod identity;
mod progress;
mod provision;
mod runner;
mod system;
mod ui;

use anyhow::{Context as AnyhowContext, Result};
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use config::{Settings, expand_path};
use declarative::CancelToken;
use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub settings: Settings,
    pub state_file: PathBuf,
    pub cancel: CancelToken,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli)?;

    if let Command::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "piprov", &mut io::stdout());
        return Ok(());
    }

    let settings = Settings::load(cli.config.as_deref())?;
    let state_file = cli
        .state
        .as_deref()
        .map_or_else(|| settings.state_file(), expand_path);

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        settings,
        state_file,
        cancel: install_signal_handler()?,
    };

    match cli.command {
        Command::Apply(args) => commands::apply::run(&ctx, args),
        Command::Plan(args) => commands::plan::run(&ctx, args.target.as_deref()),
        Command::Status => commands::status::run(&ctx),
        Command::Clear(args) => commands::clear::run(&ctx, &args.ids, args.all),
        Command::Probe(args) => commands::probe::run(&ctx, args),
        Command::Completions { .. } => Ok(()),
    }
}

/// Initialize logging based on verbosity
fn init_logging(cli: &Cli) -> Result<()> {
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None);

    if let Some(path) = &cli.log_file {
        let path = expand_path(path);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Could not open log file {}", path.display()))?;
        // The file outlives the terminal session; keep timestamps there
        builder
            .target(env_logger::Target::Pipe(Box::new(file)))
            .format_timestamp_secs();
    }

    builder.init();
    Ok(())
}

/// Route SIGINT/SIGTERM into a cancellation token. A second signal exits.
fn install_signal_handler() -> Result<CancelToken> {
    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        if handler_token.is_cancelled() {
            std::process::exit(130);
        }
        log::warn!("Interrupt received, stopping after the current step");
        handler_token.cancel();
    })
    .context("Failed to install signal handler")?;
    Ok(cancel)
}
