//! CLI entrypoint for the Atlas workbench.

#[path = "atlas/cli.rs"]
mod cli;
#[path = "atlas/commands.rs"]
mod commands;
#[path = "atlas/completions.rs"]
mod completions;
#[path = "atlas/style.rs"]
mod style;

use atlas_client::ClientConfig;
use clap::Parser;

use cli::{Cli, Command};

fn main() {
    if let Err(err) = run() {
        eprintln!("{}", style::error(format!("Error: {err:#}")));
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Command::Completions { shell } = cli.command {
        return completions::run_completions(shell);
    }
    let config = ClientConfig::discover(cli.config.as_deref())?.with_overrides(
        cli.project.as_deref(),
        cli.model.as_deref(),
        cli.base_url.as_deref(),
    )?;
    commands::run(cli.command, &config)
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();
}
