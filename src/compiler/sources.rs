//! Collecting compile inputs from disk.

use std::fs;
use std::path::{Path, PathBuf};

use jwalk::WalkDir;

use crate::lang::{Diagnostic, SourceText};
use crate::utils::path::{has_extension, is_temp_file};

/// Every library source below `root` with `extension`, sorted by path.
///
/// A missing root yields no files.
pub fn library_files(root: &Path, extension: &str) -> Vec<PathBuf> {
    if !root.is_dir() {
        return Vec::new();
    }
    let mut files: Vec<_> = WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path())
        .filter(|path| has_extension(path, extension) && !is_temp_file(path))
        .collect();
    files.sort();
    files
}

/// Read one source file, turning IO failures into a diagnostic.
pub fn read_source(path: &Path) -> Result<SourceText, Diagnostic> {
    fs::read_to_string(path)
        .map(|text| SourceText::new(path, text))
        .map_err(|e| Diagnostic::new(path, format!("cannot read source: {e}")))
}

/// Read the script source and every library source.
///
/// All read failures are reported together.
pub fn read_inputs(
    script: &Path,
    library_root: &Path,
    extension: &str,
) -> Result<(SourceText, Vec<SourceText>), Vec<Diagnostic>> {
    let mut diagnostics = Vec::new();

    let script = read_source(script).map_err(|d| diagnostics.push(d)).ok();
    let library: Vec<_> = library_files(library_root, extension)
        .iter()
        .filter_map(|path| read_source(path).map_err(|d| diagnostics.push(d)).ok())
        .collect();

    match script {
        Some(script) if diagnostics.is_empty() => Ok((script, library)),
        _ => Err(diagnostics),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_library_files_recursive_and_filtered() {
        let dir = TempDir::new().unwrap();
        let lib = dir.path();
        fs::create_dir_all(lib.join("a/b")).unwrap();
        fs::write(lib.join("z.brew"), "").unwrap();
        fs::write(lib.join("a/b/deep.brew"), "").unwrap();
        fs::write(lib.join("a/notes.txt"), "").unwrap();
        fs::write(lib.join("a/.hidden.brew"), "").unwrap();

        let files = library_files(lib, "brew");
        let rel: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(lib).unwrap().to_path_buf())
            .collect();
        assert_eq!(rel, vec![PathBuf::from("a/b/deep.brew"), PathBuf::from("z.brew")]);
    }

    #[test]
    fn test_library_files_missing_root() {
        let dir = TempDir::new().unwrap();
        assert!(library_files(&dir.path().join("nope"), "brew").is_empty());
    }

    #[test]
    fn test_read_inputs_reports_missing_script() {
        let dir = TempDir::new().unwrap();
        let err = read_inputs(&dir.path().join("Gone.brew"), dir.path(), "brew").unwrap_err();
        assert_eq!(err.len(), 1);
        assert!(err[0].message.starts_with("cannot read source"));
    }

    #[test]
    fn test_read_inputs() {
        let dir = TempDir::new().unwrap();
        let script = dir.path().join("A.brew");
        fs::write(&script, "script A {}").unwrap();
        fs::create_dir(dir.path().join("lib")).unwrap();
        fs::write(dir.path().join("lib/u.brew"), "fn u() = 1;").unwrap();

        let (script, library) = read_inputs(&script, &dir.path().join("lib"), "brew").unwrap();
        assert_eq!(script.text, "script A {}");
        assert_eq!(library.len(), 1);
    }
}
