//! Filesystem watch adapter.
//!
//! Subscribes to two roots and turns raw notify events into [`WatchEvent`]s:
//!
//! ```text
//! source root  (top level only) ──┐
//!                                 ├─► classify ─► WatchEvent ─► channel
//! library root (recursive)      ──┘
//! ```
//!
//! Only files with the script extension pass the filter; editor temp files
//! and metadata-only changes are dropped. Watcher failures are logged and
//! never surface as panics or errors to the consumer.

mod types;

pub use types::{ChangeKind, WatchEvent, WatchOrigin};

use std::path::{Path, PathBuf};

use crossbeam::channel::{self, Receiver, Sender};
use notify::event::{ModifyKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::error::Result;
use crate::utils::path::{has_extension, is_temp_file};

/// Keeps the underlying watchers alive; dropping it stops all notifications.
pub struct WatchAdapter {
    scripts: Option<RecommendedWatcher>,
    library: Option<RecommendedWatcher>,
}

impl WatchAdapter {
    /// Start watching both roots.
    ///
    /// A root that cannot be watched is logged and skipped, so the adapter
    /// always comes back; [`is_active`](Self::is_active) tells whether
    /// anything is being watched.
    pub fn spawn(
        source_root: &Path,
        library_root: &Path,
        extension: &str,
    ) -> (Self, Receiver<WatchEvent>) {
        let (tx, rx) = channel::unbounded();

        let scripts = subscribe(
            source_root,
            RecursiveMode::NonRecursive,
            WatchOrigin::Scripts,
            extension,
            tx.clone(),
        )
        .inspect_err(|e| crate::log!("watch"; "cannot watch {}: {}", source_root.display(), e))
        .ok();

        let library = subscribe(
            library_root,
            RecursiveMode::Recursive,
            WatchOrigin::Library,
            extension,
            tx,
        )
        .inspect_err(|e| crate::log!("watch"; "cannot watch {}: {}", library_root.display(), e))
        .ok();

        (Self { scripts, library }, rx)
    }

    pub fn is_active(&self) -> bool {
        self.scripts.is_some() || self.library.is_some()
    }
}

/// Create one watcher over `root`, forwarding filtered events to `tx`.
pub fn subscribe(
    root: &Path,
    mode: RecursiveMode,
    origin: WatchOrigin,
    extension: &str,
    tx: Sender<WatchEvent>,
) -> Result<RecommendedWatcher> {
    let extension = extension.to_string();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        match res {
            Ok(event) => {
                for change in classify(&event, origin, &extension) {
                    crate::debug!("watch"; "{} {}: {}", origin.label(), change.kind.label(), change.path.display());
                    // Receiver gone means the registry was disposed
                    if tx.send(change).is_err() {
                        return;
                    }
                }
            }
            Err(e) => crate::log!("watch"; "watcher error ({}): {}", origin.label(), e),
        }
    })?;
    watcher.watch(root, mode)?;
    Ok(watcher)
}

/// Map a raw notify event to zero or more filtered change events.
pub fn classify(event: &notify::Event, origin: WatchOrigin, extension: &str) -> Vec<WatchEvent> {
    let (kind, paths): (ChangeKind, Vec<&PathBuf>) = match event.kind {
        EventKind::Create(_) => (ChangeKind::Created, event.paths.iter().collect()),
        // Ignore metadata-only changes (mtime/atime/chmod noise)
        EventKind::Modify(ModifyKind::Metadata(_)) => return Vec::new(),
        // Only the new name matters: the old one no longer has a source
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => return Vec::new(),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            (ChangeKind::Renamed, event.paths.last().into_iter().collect())
        }
        EventKind::Modify(ModifyKind::Name(_)) => (ChangeKind::Renamed, event.paths.iter().collect()),
        EventKind::Modify(_) => (ChangeKind::Modified, event.paths.iter().collect()),
        _ => return Vec::new(),
    };

    paths
        .into_iter()
        .filter(|path| has_extension(path, extension) && !is_temp_file(path))
        .map(|path| WatchEvent::new(origin, path.clone(), kind))
        .collect()
}
