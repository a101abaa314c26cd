//! Path utilities.

use std::path::{Path, PathBuf};

/// Absolute form of `path`, canonical when it exists.
///
/// Paths that cannot be canonicalized (usually because they do not exist
/// yet) are joined onto the current directory instead.
pub fn normalize_path(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    match std::env::current_dir() {
        Ok(cwd) if path.is_relative() => cwd.join(path),
        _ => path.to_path_buf(),
    }
}

/// Resolve `path` against `base` unless it is already absolute.
#[inline]
pub fn resolve_against(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Editor swap files, backups and hidden files. Changes to these never
/// trigger a reload.
pub fn is_temp_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let backup_ext = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| matches!(ext, "bak" | "bck" | "backup" | "swp" | "swo" | "tmp"));

    backup_ext || name.starts_with('.') || name.ends_with('~')
}

/// Whether `path` has extension `ext` (compared case-insensitively).
pub fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

/// Script name for a source path: the file stem.
pub fn script_name(path: &Path) -> Option<&str> {
    path.file_stem().and_then(|s| s.to_str())
}
