//! Compiled unit container.
//!
//! Owns compilation and the live execution context for exactly one script.
//!
//! ```text
//!  reload_script() ─► compile_lock ─► read inputs ─► Compiler ─► Sandbox(gen N+1)
//!                                                                    │
//!  get_new_instance() ◄── active: ArcSwapOption<Sandbox> ◄── swap ───┘
//! ```
//!
//! - `sandbox` - [`Sandbox`] and [`ScriptInstance`]
//! - `state` - lifecycle states, status snapshot, subscriber events
//! - `manifest` - per-compile manifest on disk

pub mod manifest;
mod sandbox;
mod state;

pub use manifest::CompileManifest;
pub use sandbox::{Sandbox, ScriptInstance};
pub use state::{ContainerEvent, ContainerState, ContainerStatus};

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwapOption;
use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;

use crate::compiler::{CompileRequest, Compiler, sources};
use crate::error::{CompileFailure, Result, RuntimeError};
use crate::lang::{Diagnostic, Program, SourceText};

/// Who a container compiles. Immutable once the container exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptIdentity {
    /// Logical name (file stem)
    pub name: String,
    /// `{namespace}.{name}`
    pub type_name: String,
    pub source_path: PathBuf,
}

impl ScriptIdentity {
    pub fn new(namespace: &str, name: &str, source_path: impl Into<PathBuf>) -> Self {
        let type_name = if namespace.is_empty() {
            name.to_string()
        } else {
            format!("{namespace}.{name}")
        };
        Self {
            name: name.to_string(),
            type_name,
            source_path: source_path.into(),
        }
    }
}

/// Where a container finds its inputs and puts its outputs.
#[derive(Debug, Clone)]
pub struct ContainerConfig {
    pub library_root: PathBuf,
    pub extension: String,
    /// `<compiled_root>/<name>`
    pub compiled_dir: PathBuf,
    pub references: Vec<String>,
}

struct StateCell {
    state: ContainerState,
    last_error: Option<Arc<CompileFailure>>,
}

pub struct ScriptContainer {
    identity: ScriptIdentity,
    config: ContainerConfig,
    compiler: Arc<dyn Compiler>,
    active: ArcSwapOption<Sandbox>,
    state: Mutex<StateCell>,
    /// Serializes compiles; never taken by `dispose`
    compile_lock: Mutex<()>,
    generation: AtomicU64,
    subscribers: Mutex<Vec<Sender<ContainerEvent>>>,
}

impl ScriptContainer {
    pub fn new(identity: ScriptIdentity, config: ContainerConfig, compiler: Arc<dyn Compiler>) -> Self {
        Self {
            identity,
            config,
            compiler,
            active: ArcSwapOption::empty(),
            state: Mutex::new(StateCell {
                state: ContainerState::Unloaded,
                last_error: None,
            }),
            compile_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn identity(&self) -> &ScriptIdentity {
        &self.identity
    }

    pub fn name(&self) -> &str {
        &self.identity.name
    }

    pub fn state(&self) -> ContainerState {
        self.state.lock().state
    }

    pub fn status(&self) -> ContainerStatus {
        let cell = self.state.lock();
        ContainerStatus {
            state: cell.state,
            generation: self.active.load_full().map(|s| s.generation()),
            last_error: cell.last_error.clone(),
        }
    }

    /// The live sandbox, if any compile has succeeded.
    pub fn active_sandbox(&self) -> Option<Arc<Sandbox>> {
        self.active.load_full()
    }

    /// Receive [`ContainerEvent`]s from now on.
    ///
    /// The channel closes when the container is disposed.
    pub fn subscribe(&self) -> Receiver<ContainerEvent> {
        let (tx, rx) = channel::unbounded();
        if self.state() != ContainerState::Disposed {
            self.subscribers.lock().push(tx);
        }
        rx
    }

    // ========================================================================
    // compile
    // ========================================================================

    /// Compile the script against the current library and swap in the result.
    ///
    /// Returns the new generation. On failure the previous sandbox stays
    /// active and the container reports [`ContainerState::Faulted`].
    pub fn compile(&self) -> Result<u64> {
        let _guard = self.compile_lock.lock();

        {
            let mut cell = self.state.lock();
            if cell.state == ContainerState::Disposed {
                return Err(self.disposed());
            }
            cell.state = ContainerState::Compiling;
        }
        crate::debug!("compile"; "compiling {}", self.identity.type_name);

        match self.build() {
            Ok((program, script, library)) => self.install(program, &script, &library),
            Err(diagnostics) => Err(self.fault(diagnostics)),
        }
    }

    /// Recompile after a source or library change.
    pub fn reload_script(&self) -> Result<u64> {
        self.compile()
    }

    fn build(&self) -> Result<(Program, SourceText, Vec<SourceText>), Vec<Diagnostic>> {
        let (script, library) = sources::read_inputs(
            &self.identity.source_path,
            &self.config.library_root,
            &self.config.extension,
        )?;

        let request = CompileRequest {
            type_name: &self.identity.type_name,
            script: &script,
            library: &library,
            references: &self.config.references,
        };
        let program = self.compiler.compile(&request)?;

        if program.script(&self.identity.type_name).is_none() {
            let found = program.script_names();
            let hint = if found.is_empty() {
                "the source declares no script types".to_string()
            } else {
                format!("found: {}", found.join(", "))
            };
            return Err(vec![
                Diagnostic::new(
                    &self.identity.source_path,
                    format!("type `{}` not found", self.identity.type_name),
                )
                .with_hint(hint),
            ]);
        }

        Ok((program, script, library))
    }

    fn install(&self, program: Program, script: &SourceText, library: &[SourceText]) -> Result<u64> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let sandbox = Arc::new(Sandbox::new(&self.identity.type_name, generation, program));

        {
            let mut cell = self.state.lock();
            // Disposed while compiling: drop the result
            if cell.state == ContainerState::Disposed {
                return Err(self.disposed());
            }
            self.active.store(Some(sandbox));
            cell.state = ContainerState::Ready;
            cell.last_error = None;
        }

        let manifest = CompileManifest::new(&self.identity.type_name, generation, script, library);
        if let Err(e) = manifest.write(&self.config.compiled_dir) {
            crate::log!("compile"; "failed to write manifest for {}: {}", self.identity.name, e);
        }

        crate::log!("reload"; "{} ready (generation {})", self.identity.type_name, generation);
        self.notify(ContainerEvent::Reloaded {
            name: self.identity.name.clone(),
            generation,
        });
        Ok(generation)
    }

    fn fault(&self, diagnostics: Vec<Diagnostic>) -> RuntimeError {
        let failure = Arc::new(CompileFailure::new(&self.identity.type_name, diagnostics));

        {
            let mut cell = self.state.lock();
            if cell.state == ContainerState::Disposed {
                return self.disposed();
            }
            cell.state = ContainerState::Faulted;
            cell.last_error = Some(Arc::clone(&failure));
        }

        crate::log!("compile"; "{}", failure);
        self.notify(ContainerEvent::Faulted {
            name: self.identity.name.clone(),
            failure: Arc::clone(&failure),
        });
        RuntimeError::CompileFailed(failure)
    }

    // ========================================================================
    // instances
    // ========================================================================

    /// Create an instance from the active sandbox.
    ///
    /// The first call on a container that has never compiled compiles it.
    pub fn get_new_instance(&self) -> Result<ScriptInstance> {
        match self.state() {
            ContainerState::Disposed => return Err(self.disposed()),
            ContainerState::Unloaded => {
                self.compile()?;
            }
            // First compile in flight on another thread: wait for it
            ContainerState::Compiling if self.active.load().is_none() => {
                drop(self.compile_lock.lock());
            }
            _ => {}
        }

        let Some(sandbox) = self.active.load_full() else {
            // dispose() may have cleared the sandbox since the state check
            if self.is_disposed() {
                return Err(self.disposed());
            }
            return Err(RuntimeError::NotReady {
                name: self.identity.name.clone(),
            });
        };
        sandbox.instantiate()
    }

    // ========================================================================
    // teardown
    // ========================================================================

    /// Tear down the active sandbox. Idempotent.
    ///
    /// Instances created earlier keep their sandbox alive until dropped.
    pub fn dispose(&self) {
        {
            let mut cell = self.state.lock();
            if cell.state == ContainerState::Disposed {
                return;
            }
            cell.state = ContainerState::Disposed;
            self.active.store(None);
        }
        self.notify(ContainerEvent::Disposed {
            name: self.identity.name.clone(),
        });
        self.subscribers.lock().clear();
        crate::debug!("registry"; "disposed container {}", self.identity.name);
    }

    pub fn is_disposed(&self) -> bool {
        self.state() == ContainerState::Disposed
    }

    fn disposed(&self) -> RuntimeError {
        RuntimeError::Disposed("script container")
    }

    fn notify(&self, event: ContainerEvent) {
        self.subscribers
            .lock()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }
}

impl std::fmt::Debug for ScriptContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptContainer")
            .field("identity", &self.identity)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
