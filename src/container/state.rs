use std::fmt;
use std::sync::Arc;

use crate::error::CompileFailure;

/// Lifecycle of a script container.
///
/// ```text
/// Unloaded ──► Compiling ──► Ready ◄──┐
///                  │           │      │
///                  ▼           └──► Compiling (reload)
///               Faulted ─────────────►┘
///
/// any state ──► Disposed (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    Unloaded,
    Compiling,
    Ready,
    Faulted,
    Disposed,
}

impl ContainerState {
    pub fn label(self) -> &'static str {
        match self {
            Self::Unloaded => "unloaded",
            Self::Compiling => "compiling",
            Self::Ready => "ready",
            Self::Faulted => "faulted",
            Self::Disposed => "disposed",
        }
    }
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Snapshot of a container for polling UIs.
#[derive(Debug, Clone)]
pub struct ContainerStatus {
    pub state: ContainerState,
    /// Generation of the active sandbox, if any compile has succeeded
    pub generation: Option<u64>,
    /// Failure of the most recent compile, cleared by the next success
    pub last_error: Option<Arc<CompileFailure>>,
}

impl ContainerStatus {
    /// Whether new instances can be created right now.
    pub fn is_usable(&self) -> bool {
        self.state != ContainerState::Disposed && self.generation.is_some()
    }
}

/// Pushed to subscribers whenever a container changes.
#[derive(Debug, Clone)]
pub enum ContainerEvent {
    /// A new sandbox went live
    Reloaded { name: String, generation: u64 },
    /// A compile failed; the previous sandbox (if any) is still active
    Faulted {
        name: String,
        failure: Arc<CompileFailure>,
    },
    Disposed { name: String },
}

impl ContainerEvent {
    pub fn name(&self) -> &str {
        match self {
            Self::Reloaded { name, .. } | Self::Faulted { name, .. } | Self::Disposed { name } => {
                name
            }
        }
    }
}
