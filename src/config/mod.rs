//! Project configuration for `hotbrew.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! │   ├── scripts    # [scripts]
//! │   └── watch      # [watch]
//! ├── types/         # Utility types
//! │   ├── error      # ConfigError, ConfigDiagnostics
//! │   └── field      # FieldPath
//! ├── util.rs        # config discovery, path expansion
//! └── mod.rs         # ProjectConfig (this file)
//! ```
//!
//! # Sections
//!
//! | Section       | Purpose                                           |
//! |---------------|---------------------------------------------------|
//! | `[scripts]`   | Roots, namespace, extension, reference set        |
//! | `[watch]`     | Hot reload switch and debounce delay              |

pub mod section;
pub mod types;
mod util;

use crate::utils::path::normalize_path;
use util::find_config_file;

pub use section::{ScriptsConfig, WatchConfig};
pub use types::{ConfigDiagnostic, ConfigDiagnostics, ConfigError, FieldPath};

use crate::cli::{Cli, Commands};
use crate::registry::RegistrySettings;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Contents of `hotbrew.toml` plus where it was found.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Absolute config file path. May not exist when running on defaults.
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Directory holding the config file; relative paths resolve here
    #[serde(skip)]
    pub root: PathBuf,

    #[serde(default)]
    pub scripts: ScriptsConfig,

    #[serde(default)]
    pub watch: WatchConfig,
}

impl ProjectConfig {
    /// Locate, parse, finalize and validate the project config.
    ///
    /// The config file is searched for from the current directory upward.
    /// A project without one runs on defaults rooted at the current directory.
    pub fn load(cli: &Cli) -> Result<Self> {
        let mut config = match find_config_file(&cli.config) {
            Some(path) => {
                let mut config = Self::from_path(&path)?;
                config.config_path = path;
                config
            }
            None => {
                let cwd = std::env::current_dir().context("cannot determine current directory")?;
                crate::debug!("config"; "{} not found, using defaults", cli.config.display());
                Self {
                    config_path: cwd.join(&cli.config),
                    ..Self::default()
                }
            }
        };

        config.finalize(cli);
        config.validate(&cli.command)?;
        Ok(config)
    }

    /// Read and parse `path`, warning about keys hotbrew does not know.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let (config, ignored) = Self::parse_with_ignored(&content)?;

        if !ignored.is_empty() {
            crate::log!("config"; "ignoring unknown keys in {}: {}", path.display(), ignored.join(", "));
        }
        Ok(config)
    }

    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>)> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |key: serde_ignored::Path<'_>| {
            ignored.push(key.to_string());
        })
        .map_err(ConfigError::Toml)?;
        Ok((config, ignored))
    }

    /// Anchor every path at the config directory, then layer CLI flags on top.
    fn finalize(&mut self, cli: &Cli) {
        let root = self.config_path.parent().unwrap_or(Path::new(""));
        self.root = normalize_path(root);
        self.config_path = normalize_path(&self.config_path);
        self.scripts.normalize(&self.root);

        match &cli.command {
            Commands::Watch { debounce, .. } => {
                if let Some(ms) = debounce {
                    self.watch.debounce_ms = *ms;
                }
            }
            // one-shot commands exit before any reload could matter
            Commands::List | Commands::Check { .. } | Commands::Run { .. } => {
                self.watch.enable = false;
            }
        }
    }

    /// Check every section against `command`, reporting all errors at once.
    pub fn validate(&self, command: &Commands) -> Result<()> {
        let mut diag = ConfigDiagnostics::new();
        self.scripts.validate(&mut diag);
        self.watch.validate(&mut diag);

        if matches!(command, Commands::Watch { .. }) && !self.watch.enable {
            diag.error_with_hint(
                WatchConfig::ENABLE,
                "watching is disabled",
                "set `enable = true` under [watch] to use `hotbrew watch`",
            );
        }

        diag.print_warnings();
        diag.into_result()
            .map_err(|e| ConfigError::Diagnostics(e).into())
    }

    /// Settings for a [`ScriptRegistry`](crate::registry::ScriptRegistry).
    pub fn registry_settings(&self) -> RegistrySettings {
        let scripts = &self.scripts;
        RegistrySettings {
            namespace: scripts.namespace.clone(),
            extension: scripts.extension.clone(),
            source_root: scripts.source.clone(),
            common_root: scripts.common.clone(),
            library_root: scripts.library.clone(),
            compiled_root: scripts.compiled.clone(),
            references: scripts.references.clone(),
            debounce: self.watch.debounce(),
            watch: self.watch.enable,
        }
    }
}

/// Parse TOML without unknown-field detection.
impl FromStr for ProjectConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content).map_err(ConfigError::Toml)?)
    }
}

// ============================================================================
// Test Helpers (available to all modules via `use crate::config::test_*`)
// ============================================================================

/// Parse config, panicking on unknown fields (to catch config typos in tests).
#[cfg(test)]
pub fn test_parse_config(content: &str) -> ProjectConfig {
    let (parsed, ignored) = ProjectConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

// ============================================================================
// tests
// ============================================================================
