//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// hotbrew hot-reloading script runtime CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: hotbrew.toml)
    #[arg(short = 'C', long, global = true, default_value = "hotbrew.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Print debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// List every script visible to the project
    #[command(visible_alias = "l")]
    List,

    /// Compile scripts and report diagnostics
    #[command(visible_alias = "c")]
    Check {
        /// Script names (default: all scripts)
        #[arg(value_name = "NAME")]
        names: Vec<String>,
    },

    /// Compile a script, create an instance and call one of its methods
    #[command(visible_alias = "r")]
    Run {
        /// Script name
        name: String,

        /// Method to call
        method: String,

        /// Arguments (parsed as int, float, bool, or string)
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Load scripts and recompile them whenever their sources change
    #[command(visible_alias = "w")]
    Watch {
        /// Script names (default: all scripts)
        #[arg(value_name = "NAME")]
        names: Vec<String>,

        /// Quiet period in milliseconds before a change is compiled
        #[arg(short, long, value_name = "MS")]
        debounce: Option<u64>,
    },
}
