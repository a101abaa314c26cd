//! `hotbrew check`
//!
//! Compiles each selected script once and prints the diagnostics of every
//! failure.

use anyhow::{Result, bail};
use owo_colors::OwoColorize;

use super::common::{open_registry, plural_scripts, select_names};
use crate::config::ProjectConfig;
use crate::error::RuntimeError;
use crate::log;

pub fn check_scripts(config: &ProjectConfig, names: &[String]) -> Result<()> {
    let registry = open_registry(config)?;
    let names = select_names(&registry, names)?;
    if names.is_empty() {
        log!("check"; "no scripts found in {}", registry.settings().source_root.display());
        return Ok(());
    }

    let mut failed = 0;
    for name in &names {
        let outcome = registry.get(name).and_then(|container| container.compile());
        match outcome {
            Ok(_) => log!("check"; "{} {}", "ok".green(), name),
            Err(RuntimeError::CompileFailed(failure)) => {
                failed += 1;
                eprintln!("{failure}");
            }
            Err(e) => {
                failed += 1;
                log!("check"; "{}: {}", name, e);
            }
        }
    }
    registry.dispose();

    if failed > 0 {
        bail!("{} of {} failed", failed, plural_scripts(names.len()));
    }
    log!("check"; "{} compiled", plural_scripts(names.len()));
    Ok(())
}
