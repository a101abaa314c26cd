//! Script registry.
//!
//! Discovers script names, owns one [`ScriptContainer`] per name and routes
//! filesystem changes to the containers they affect.
//!
//! ```text
//! WatchAdapter ──► pump thread ──► dispatch(event)
//!                                      │  schedule(path)
//!                                      ▼
//!                            DebouncedScheduler ──► reload_script()
//!                                                    ├─ Scripts: that script
//!                                                    └─ Library: every container
//! ```
//!
//! The registry never touches compiled state; containers own it.

pub mod source;

use std::path::PathBuf;
use std::sync::{Arc, Weak};
use std::thread;
use std::time::Duration;

use crossbeam::channel::Receiver;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::compiler::Compiler;
use crate::container::{ContainerConfig, ScriptContainer, ScriptIdentity};
use crate::error::{Result, RuntimeError};
use crate::scheduler::{DEFAULT_DELAY, DebouncedScheduler};
use crate::utils::path::script_name;
use crate::watch::{WatchAdapter, WatchEvent, WatchOrigin};

use source::SourceResolver;

/// Fully resolved registry settings.
#[derive(Debug, Clone)]
pub struct RegistrySettings {
    /// Prefix of every script type name
    pub namespace: String,
    /// Source file extension, without the dot
    pub extension: String,
    pub source_root: PathBuf,
    pub common_root: Option<PathBuf>,
    pub library_root: PathBuf,
    pub compiled_root: PathBuf,
    pub references: Vec<String>,
    pub debounce: Duration,
    /// Start filesystem watchers on creation
    pub watch: bool,
}

impl RegistrySettings {
    /// Defaults rooted at `source_root`: library in `lib/`, manifests in
    /// `.compiled/`, no common root, watching on.
    pub fn new(source_root: impl Into<PathBuf>) -> Self {
        let source_root = source_root.into();
        Self {
            namespace: "Scripts".into(),
            extension: "brew".into(),
            library_root: source_root.join("lib"),
            compiled_root: source_root.join(".compiled"),
            common_root: None,
            source_root,
            references: vec!["core".into(), "math".into()],
            debounce: DEFAULT_DELAY,
            watch: true,
        }
    }
}

// ============================================================================
// Registry
// ============================================================================

pub struct ScriptRegistry {
    inner: Arc<Inner>,
    watcher: Mutex<Option<WatchAdapter>>,
}

struct Inner {
    settings: RegistrySettings,
    resolver: SourceResolver,
    compiler: Arc<dyn Compiler>,
    /// `None` once disposed
    containers: Mutex<Option<FxHashMap<String, Arc<ScriptContainer>>>>,
    scheduler: DebouncedScheduler<PathBuf>,
}

impl ScriptRegistry {
    /// Create a registry, creating missing directories and starting the
    /// watchers when `settings.watch` is set.
    pub fn new(settings: RegistrySettings, compiler: Arc<dyn Compiler>) -> Result<Self> {
        for dir in [
            &settings.source_root,
            &settings.library_root,
            &settings.compiled_root,
        ] {
            std::fs::create_dir_all(dir).map_err(|e| RuntimeError::Io(dir.clone(), e))?;
        }

        let inner = Arc::new(Inner {
            resolver: SourceResolver::new(
                settings.source_root.clone(),
                settings.common_root.clone(),
                settings.extension.clone(),
            ),
            scheduler: DebouncedScheduler::new(settings.debounce),
            containers: Mutex::new(Some(FxHashMap::default())),
            compiler,
            settings,
        });

        let registry = Self {
            inner,
            watcher: Mutex::new(None),
        };
        if registry.inner.settings.watch {
            registry.start_watching();
        }
        Ok(registry)
    }

    fn start_watching(&self) {
        let settings = &self.inner.settings;
        let (adapter, events) = WatchAdapter::spawn(
            &settings.source_root,
            &settings.library_root,
            &settings.extension,
        );
        if !adapter.is_active() {
            crate::log!("watch"; "hot reload disabled");
            return;
        }

        let weak = Arc::downgrade(&self.inner);
        thread::spawn(move || pump(&weak, &events));

        crate::log!("watch"; "watching {}", settings.source_root.display());
        *self.watcher.lock() = Some(adapter);
    }

    pub fn settings(&self) -> &RegistrySettings {
        &self.inner.settings
    }

    /// Container for `name`, created on first access.
    ///
    /// Repeated calls return the same container.
    pub fn get(&self, name: &str) -> Result<Arc<ScriptContainer>> {
        self.inner.get(name)
    }

    /// Every script name visible to this project.
    pub fn list_script_names(&self) -> Result<Vec<String>> {
        self.inner.ensure_alive()?;
        self.inner.resolver.list_names()
    }

    /// Route a change notification to the affected containers.
    pub fn dispatch(&self, event: WatchEvent) -> Result<()> {
        self.inner.dispatch(event)
    }

    /// Snapshot of existing containers, sorted by name.
    pub fn containers(&self) -> Result<Vec<Arc<ScriptContainer>>> {
        self.inner.containers()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner
            .containers
            .lock()
            .as_ref()
            .is_some_and(|map| map.contains_key(name))
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.lock().is_some()
    }

    /// Stop watching, cancel pending reloads and dispose every container.
    ///
    /// Idempotent. Every later call fails with [`RuntimeError::Disposed`].
    pub fn dispose(&self) {
        // Dropping the adapter closes the event channel, ending the pump
        drop(self.watcher.lock().take());
        self.inner.scheduler.dispose();

        let Some(containers) = self.inner.containers.lock().take() else {
            return;
        };
        for container in containers.values() {
            container.dispose();
        }
        crate::debug!("registry"; "disposed {} containers", containers.len());
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.containers.lock().is_none()
    }
}

impl Drop for ScriptRegistry {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Forward watch events into the registry until either side goes away.
fn pump(inner: &Weak<Inner>, events: &Receiver<WatchEvent>) {
    for event in events.iter() {
        let Some(inner) = inner.upgrade() else {
            break;
        };
        if let Err(e) = inner.dispatch(event) {
            if e.is_disposed() {
                break;
            }
            crate::log!("watch"; "{}", e);
        }
    }
    crate::debug!("watch"; "event pump stopped");
}

// ============================================================================
// Inner (shared with the pump and scheduled actions)
// ============================================================================

impl Inner {
    fn ensure_alive(&self) -> Result<()> {
        if self.containers.lock().is_none() {
            return Err(RuntimeError::Disposed("script registry"));
        }
        Ok(())
    }

    fn get(&self, name: &str) -> Result<Arc<ScriptContainer>> {
        {
            let guard = self.containers.lock();
            let containers = guard
                .as_ref()
                .ok_or(RuntimeError::Disposed("script registry"))?;
            if let Some(container) = containers.get(name) {
                return Ok(Arc::clone(container));
            }
        }

        // Resolving may copy a common script in; keep that off the lock
        let source_path = self.resolver.resolve(name)?;

        let mut guard = self.containers.lock();
        let containers = guard
            .as_mut()
            .ok_or(RuntimeError::Disposed("script registry"))?;
        let container = containers.entry(name.to_string()).or_insert_with(|| {
            crate::debug!("registry"; "created container {}", name);
            Arc::new(ScriptContainer::new(
                ScriptIdentity::new(&self.settings.namespace, name, source_path),
                ContainerConfig {
                    library_root: self.settings.library_root.clone(),
                    extension: self.settings.extension.clone(),
                    compiled_dir: self.settings.compiled_root.join(name),
                    references: self.settings.references.clone(),
                },
                Arc::clone(&self.compiler),
            ))
        });
        Ok(Arc::clone(container))
    }

    fn containers(&self) -> Result<Vec<Arc<ScriptContainer>>> {
        let guard = self.containers.lock();
        let map = guard
            .as_ref()
            .ok_or(RuntimeError::Disposed("script registry"))?;
        let mut containers: Vec<_> = map.values().cloned().collect();
        containers.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(containers)
    }

    fn dispatch(self: &Arc<Self>, event: WatchEvent) -> Result<()> {
        self.ensure_alive()?;
        let weak = Arc::downgrade(self);
        self.scheduler.schedule(event.path.clone(), move |_| {
            if let Some(inner) = weak.upgrade() {
                inner.apply(&event);
            }
        })
    }

    /// Runs on a scheduler worker once the change has settled.
    fn apply(&self, event: &WatchEvent) {
        let targets = match event.origin {
            WatchOrigin::Scripts => {
                let Some(name) = script_name(&event.path) else {
                    return;
                };
                let guard = self.containers.lock();
                match guard.as_ref().and_then(|map| map.get(name)) {
                    Some(container) => vec![Arc::clone(container)],
                    None => return,
                }
            }
            WatchOrigin::Library => match self.containers() {
                Ok(all) => all,
                Err(_) => return,
            },
        };

        crate::log!(
            "watch";
            "{} {}: {}",
            event.origin.label(),
            event.kind.label(),
            event.path.display()
        );
        for container in targets {
            // Failures are recorded on the container and already logged
            let _ = container.reload_script();
        }
    }
}

#[cfg(test)]
mod tests;
