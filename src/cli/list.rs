//! `hotbrew list`

use anyhow::Result;

use super::common::open_registry;
use crate::config::ProjectConfig;

/// Print every script name visible to the project, one per line.
pub fn list_scripts(config: &ProjectConfig) -> Result<()> {
    let registry = open_registry(config)?;
    let mut names = registry.list_script_names()?;
    names.sort();
    for name in names {
        println!("{name}");
    }
    Ok(())
}
