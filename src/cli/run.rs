//! `hotbrew run`

use anyhow::{Context, Result};

use super::common::open_registry;
use crate::config::ProjectConfig;
use crate::lang::Value;

/// Compile `name`, create a fresh instance and call `method` on it.
pub fn run_script(config: &ProjectConfig, name: &str, method: &str, args: &[String]) -> Result<()> {
    let registry = open_registry(config)?;
    let container = registry.get(name)?;
    let instance = container.get_new_instance()?;

    let args: Vec<Value> = args.iter().map(|arg| Value::parse_arg(arg)).collect();
    let value = instance
        .call(method, &args)
        .with_context(|| format!("{}.{} failed", instance.type_name(), method))?;

    println!("{value}");
    Ok(())
}
