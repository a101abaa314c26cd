//! hotbrew - edit a script, keep the process running.

use anyhow::Result;
use clap::{ColorChoice, Parser};
use hotbrew::cli::{self, Cli, Commands};
use hotbrew::config::ProjectConfig;
use hotbrew::logger;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let config = ProjectConfig::load(&cli)?;

    match &cli.command {
        Commands::List => cli::list::list_scripts(&config),
        Commands::Check { names } => cli::check::check_scripts(&config, names),
        Commands::Run { name, method, args } => cli::run::run_script(&config, name, method, args),
        Commands::Watch { names, .. } => cli::watch::watch_scripts(&config, names),
    }
}
