//! `[scripts]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [scripts]
//! namespace = "Scripts"            # Type names are `{namespace}.{Name}`
//! extension = "brew"               # Source file extension (no dot)
//! source = "scripts"               # Project scripts, one file per script
//! common = "~/.hotbrew/common"     # Shared scripts copied in on first use
//! library = "scripts/lib"          # Library sources compiled into every script
//! compiled = ".cache/scripts"      # Per-script compile manifests
//! references = ["core", "math"]    # Native modules scripts may call
//! ```
//!
//! Relative paths are resolved against the directory holding `hotbrew.toml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::types::{ConfigDiagnostics, FieldPath};
use crate::config::util::expand_path;
use crate::lang::native;

/// Script discovery and compilation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptsConfig {
    pub namespace: String,
    pub extension: String,
    pub source: PathBuf,
    /// Optional: scripts missing from `source` are copied in from here.
    pub common: Option<PathBuf>,
    pub library: PathBuf,
    pub compiled: PathBuf,
    pub references: Vec<String>,
}

impl Default for ScriptsConfig {
    fn default() -> Self {
        Self {
            namespace: "Scripts".into(),
            extension: "brew".into(),
            source: "scripts".into(),
            common: None,
            library: "scripts/lib".into(),
            compiled: ".cache/scripts".into(),
            references: vec!["core".into(), "math".into()],
        }
    }
}

impl ScriptsConfig {
    pub const NAMESPACE: FieldPath = FieldPath::new("scripts.namespace");
    pub const EXTENSION: FieldPath = FieldPath::new("scripts.extension");
    pub const COMMON: FieldPath = FieldPath::new("scripts.common");
    pub const REFERENCES: FieldPath = FieldPath::new("scripts.references");

    /// Resolve every path against `root`, expanding `~`.
    pub fn normalize(&mut self, root: &Path) {
        self.source = expand_path(&self.source, root);
        self.library = expand_path(&self.library, root);
        self.compiled = expand_path(&self.compiled, root);
        if let Some(common) = self.common.take() {
            self.common = Some(expand_path(&common, root));
        }
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.namespace.trim().is_empty() {
            diag.error(Self::NAMESPACE, "must not be empty");
        } else if self
            .namespace
            .split('.')
            .any(|part| !is_identifier(part))
        {
            diag.error_with_hint(
                Self::NAMESPACE,
                format!("`{}` is not a dotted identifier", self.namespace),
                "use letters, digits and `_`, separated by `.`",
            );
        }

        if self.extension.is_empty() {
            diag.error(Self::EXTENSION, "must not be empty");
        } else if let Some(stripped) = self.extension.strip_prefix('.') {
            diag.error_with_hint(
                Self::EXTENSION,
                "must not start with `.`",
                format!("use `{stripped}` instead of `{}`", self.extension),
            );
        }

        for reference in &self.references {
            if native::lookup(reference).is_none() {
                let available: Vec<_> = native::MODULES.iter().map(|m| m.name).collect();
                diag.error_with_hint(
                    Self::REFERENCES,
                    format!("unknown reference `{reference}`"),
                    format!("available modules: {}", available.join(", ")),
                );
            }
        }

        if let Some(common) = &self.common
            && !common.is_dir()
        {
            diag.warn(
                Self::COMMON,
                format!("common scripts directory `{}` does not exist", common.display()),
            );
        }
    }
}

fn is_identifier(part: &str) -> bool {
    let mut chars = part.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;

    #[test]
    fn test_scripts_config_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.scripts.namespace, "Scripts");
        assert_eq!(config.scripts.extension, "brew");
        assert_eq!(config.scripts.source, PathBuf::from("scripts"));
        assert!(config.scripts.common.is_none());
        assert_eq!(config.scripts.references, vec!["core", "math"]);
    }

    #[test]
    fn test_scripts_config_partial_override() {
        let config = test_parse_config("[scripts]\nnamespace = \"Game.Logic\"\ncommon = \"shared\"");
        assert_eq!(config.scripts.namespace, "Game.Logic");
        assert_eq!(config.scripts.common, Some(PathBuf::from("shared")));
        // untouched fields keep defaults
        assert_eq!(config.scripts.library, PathBuf::from("scripts/lib"));
    }

    #[test]
    fn test_normalize_resolves_against_root() {
        let mut scripts = ScriptsConfig {
            common: Some("shared".into()),
            ..Default::default()
        };
        scripts.normalize(Path::new("/project"));
        assert_eq!(scripts.source, PathBuf::from("/project/scripts"));
        assert_eq!(scripts.library, PathBuf::from("/project/scripts/lib"));
        assert_eq!(scripts.common, Some(PathBuf::from("/project/shared")));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let scripts = ScriptsConfig {
            namespace: "Bad-Name".into(),
            extension: ".brew".into(),
            references: vec!["core".into(), "graphics".into()],
            ..Default::default()
        };
        let mut diag = ConfigDiagnostics::new();
        scripts.validate(&mut diag);

        let fields: Vec<_> = diag.errors().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec!["scripts.namespace", "scripts.extension", "scripts.references"]
        );
    }

    #[test]
    fn test_validate_missing_common_is_warning() {
        let scripts = ScriptsConfig {
            common: Some("/definitely/not/here".into()),
            ..Default::default()
        };
        let mut diag = ConfigDiagnostics::new();
        scripts.validate(&mut diag);
        assert!(!diag.has_errors());
        assert_eq!(diag.warnings().count(), 1);
    }

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("Scripts"));
        assert!(is_identifier("_x1"));
        assert!(!is_identifier("1x"));
        assert!(!is_identifier(""));
    }
}
