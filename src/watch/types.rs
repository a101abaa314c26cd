use std::path::PathBuf;

/// Which watched root an event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchOrigin {
    /// Top level of the project source root (one file per script)
    Scripts,
    /// Anywhere below the shared library root
    Library,
}

impl WatchOrigin {
    pub fn label(self) -> &'static str {
        match self {
            Self::Scripts => "scripts",
            Self::Library => "library",
        }
    }
}

/// What happened to a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Renamed,
}

impl ChangeKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Renamed => "renamed",
        }
    }
}

/// A filtered change notification for one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub origin: WatchOrigin,
    pub path: PathBuf,
    pub kind: ChangeKind,
}

impl WatchEvent {
    pub fn new(origin: WatchOrigin, path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        Self {
            origin,
            path: path.into(),
            kind,
        }
    }
}
