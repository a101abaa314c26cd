//! Per-script compile manifest.
//!
//! Written to `<compiled_root>/<name>/manifest.json` after every successful
//! compile, recording what went into the live generation.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::lang::SourceText;
use crate::utils::hash::InputHasher;

pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileManifest {
    pub type_name: String,
    pub generation: u64,
    /// blake3 over every input path and text, hex encoded
    pub inputs_hash: String,
    pub inputs: Vec<PathBuf>,
    /// Seconds since the Unix epoch
    pub compiled_at: u64,
}

impl CompileManifest {
    pub fn new(type_name: &str, generation: u64, script: &SourceText, library: &[SourceText]) -> Self {
        let mut hasher = InputHasher::new();
        let mut inputs = Vec::with_capacity(library.len() + 1);
        for source in std::iter::once(script).chain(library) {
            hasher.add(&source.path, &source.text);
            inputs.push(source.path.clone());
        }

        Self {
            type_name: type_name.to_string(),
            generation,
            inputs_hash: hasher.finish_hex(),
            inputs,
            compiled_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
        }
    }

    pub fn path(dir: &Path) -> PathBuf {
        dir.join(MANIFEST_FILE)
    }

    /// Write atomically: temp file in the same directory, then rename.
    pub fn write(&self, dir: &Path) -> io::Result<()> {
        fs::create_dir_all(dir)?;
        let json = serde_json::to_string_pretty(self)?;
        let tmp = dir.join(format!(".{MANIFEST_FILE}.tmp"));
        fs::write(&tmp, json)?;
        fs::rename(&tmp, Self::path(dir))
    }

    /// Read the manifest in `dir`, `None` if there is none yet.
    pub fn read(dir: &Path) -> io::Result<Option<Self>> {
        match fs::read_to_string(Self::path(dir)) {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("Intro");
        let script = SourceText::new("Intro.brew", "script Intro {}");
        let library = [SourceText::new("lib/u.brew", "fn u() = 1;")];

        let manifest = CompileManifest::new("Scripts.Intro", 3, &script, &library);
        manifest.write(&out).unwrap();

        let read = CompileManifest::read(&out).unwrap().unwrap();
        assert_eq!(read, manifest);
        assert_eq!(read.inputs, vec![PathBuf::from("Intro.brew"), PathBuf::from("lib/u.brew")]);
        assert!(!out.join(".manifest.json.tmp").exists());
    }

    #[test]
    fn test_hash_tracks_library_changes() {
        let script = SourceText::new("A.brew", "script A {}");
        let before = CompileManifest::new("A", 1, &script, &[SourceText::new("l.brew", "fn f() = 1;")]);
        let after = CompileManifest::new("A", 2, &script, &[SourceText::new("l.brew", "fn f() = 2;")]);
        assert_ne!(before.inputs_hash, after.inputs_hash);
    }

    #[test]
    fn test_read_missing() {
        let dir = TempDir::new().unwrap();
        assert!(CompileManifest::read(dir.path()).unwrap().is_none());
    }
}
