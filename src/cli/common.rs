//! Common utilities shared across CLI commands.

use std::sync::Arc;

use anyhow::Result;

use crate::compiler::BrewCompiler;
use crate::config::ProjectConfig;
use crate::registry::ScriptRegistry;

/// Open the project registry with the built-in compiler.
pub fn open_registry(config: &ProjectConfig) -> Result<ScriptRegistry> {
    Ok(ScriptRegistry::new(
        config.registry_settings(),
        Arc::new(BrewCompiler),
    )?)
}

/// `names` if given, otherwise every script the registry can see.
pub fn select_names(registry: &ScriptRegistry, names: &[String]) -> Result<Vec<String>> {
    if names.is_empty() {
        Ok(registry.list_script_names()?)
    } else {
        Ok(names.to_vec())
    }
}

/// `"1 script"` / `"3 scripts"`
pub fn plural_scripts(count: usize) -> String {
    if count == 1 {
        "1 script".to_string()
    } else {
        format!("{count} scripts")
    }
}
