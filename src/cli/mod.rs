//! Command-line interface module.

mod args;
pub mod check;
pub mod common;
pub mod list;
pub mod run;
pub mod watch;

pub use args::{Cli, Commands};
