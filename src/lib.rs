//! hotbrew - a hot-reloading script runtime.
//!
//! Scripts live as source files on disk. A [`ScriptRegistry`] hands out one
//! [`ScriptContainer`] per script name; each container compiles its script
//! (plus the shared library) into an isolated [`Sandbox`] and hands out
//! instances from whichever sandbox is current. When a source changes, the
//! registry recompiles the affected containers and swaps the new sandbox in
//! without touching instances created from the old one.
//!
//! [`Sandbox`]: container::Sandbox

pub mod cli;
pub mod compiler;
pub mod config;
pub mod container;
pub mod error;
pub mod lang;
pub mod logger;
pub mod registry;
pub mod scheduler;
pub mod utils;
pub mod watch;

pub use compiler::{BrewCompiler, CompileRequest, Compiler};
pub use container::{ContainerEvent, ContainerState, ScriptContainer, ScriptInstance};
pub use error::{CompileFailure, Result, RuntimeError};
pub use registry::{RegistrySettings, ScriptRegistry};
pub use scheduler::DebouncedScheduler;
