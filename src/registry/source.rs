//! Locating script sources in the project and common roots.

use std::fs::{self, File, OpenOptions, Permissions};
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{Result, RuntimeError};
use crate::utils::path::{has_extension, script_name};

/// Resolves script names to project-local source files.
///
/// A script missing from the project root is copied in from the common
/// root on first access. The copy never overwrites an existing project file
/// and never touches the common original.
#[derive(Debug, Clone)]
pub struct SourceResolver {
    source_root: PathBuf,
    common_root: Option<PathBuf>,
    extension: String,
}

impl SourceResolver {
    pub fn new(source_root: PathBuf, common_root: Option<PathBuf>, extension: String) -> Self {
        Self {
            source_root,
            common_root,
            extension,
        }
    }

    /// Project-local path for `name`, whether or not it exists.
    pub fn source_path(&self, name: &str) -> PathBuf {
        self.source_root.join(format!("{name}.{}", self.extension))
    }

    fn common_path(&self, name: &str) -> Option<PathBuf> {
        self.common_root
            .as_ref()
            .map(|root| root.join(format!("{name}.{}", self.extension)))
    }

    /// Resolve `name` to a project-local source, copying it in if needed.
    pub fn resolve(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;

        let local = self.source_path(name);
        if local.is_file() {
            return Ok(local);
        }

        let Some(common) = self.common_path(name).filter(|p| p.is_file()) else {
            return Err(RuntimeError::SourceNotFound {
                name: name.to_string(),
            });
        };

        if copy_new(&common, &local).map_err(|e| RuntimeError::Io(local.clone(), e))? {
            crate::log!("registry"; "copied {} from common scripts", name);
        }
        Ok(local)
    }

    /// Project names in listing order, then common names not shadowed by them.
    pub fn list_names(&self) -> Result<Vec<String>> {
        let mut names = names_in(&self.source_root, &self.extension)
            .map_err(|e| RuntimeError::Io(self.source_root.clone(), e))?;

        if let Some(common) = &self.common_root {
            let common_names = match names_in(common, &self.extension) {
                Ok(found) => found,
                Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
                Err(e) => return Err(RuntimeError::Io(common.clone(), e)),
            };
            for name in common_names {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }

        Ok(names)
    }
}

/// Reject names that would escape the source root.
pub fn validate_name(name: &str) -> Result<()> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || Path::new(name).is_absolute();
    if invalid {
        return Err(RuntimeError::InvalidScriptName(name.to_string()));
    }
    Ok(())
}

/// Script names in `dir`, in directory-listing order.
fn names_in(dir: &Path, extension: &str) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file()
            && has_extension(&path, extension)
            && let Some(name) = script_name(&path)
        {
            names.push(name.to_string());
        }
    }
    Ok(names)
}

/// Copy `from` to `to` unless `to` exists. Returns whether a copy happened.
///
/// The copy keeps the source permissions minus the read-only marker. A copy
/// that fails part way is removed, so it never shadows the common original.
fn copy_new(from: &Path, to: &Path) -> io::Result<bool> {
    let mut src = File::open(from)?;
    let permissions = src.metadata()?.permissions();
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)?;
    }
    let dst = match OpenOptions::new().write(true).create_new(true).open(to) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => return Err(e),
    };

    if let Err(e) = fill(&mut src, dst, to, permissions) {
        let _ = fs::remove_file(to);
        return Err(e);
    }
    Ok(true)
}

fn fill(src: &mut File, mut dst: File, to: &Path, permissions: Permissions) -> io::Result<()> {
    io::copy(src, &mut dst)?;
    drop(dst);
    fs::set_permissions(to, permissions)?;
    clear_readonly(to)
}

#[cfg(unix)]
fn clear_readonly(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(perms.mode() | 0o200);
    fs::set_permissions(path, perms)
}

#[cfg(not(unix))]
fn clear_readonly(path: &Path) -> io::Result<()> {
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_readonly(false);
    fs::set_permissions(path, perms)
}
