//! Runtime error taxonomy.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use owo_colors::OwoColorize;
use thiserror::Error;

use crate::lang::{Diagnostic, EvalError};

/// Errors surfaced by the registry, its containers and the scheduler.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("script `{name}` not found in the project or common scripts")]
    SourceNotFound { name: String },

    #[error("invalid script name `{0}`")]
    InvalidScriptName(String),

    // NOTE: No #[source] here - the failure already renders its diagnostics
    #[error("{0}")]
    CompileFailed(Arc<CompileFailure>),

    #[error("script `{name}` has no successfully compiled version")]
    NotReady { name: String },

    #[error("{0} has been disposed")]
    Disposed(&'static str),

    #[error("watch error")]
    Watch(#[from] notify::Error),

    #[error("IO error on `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("script error: {0}")]
    Script(#[from] EvalError),
}

impl RuntimeError {
    pub fn is_disposed(&self) -> bool {
        matches!(self, Self::Disposed(_))
    }

    /// The compile failure, if this is one.
    pub fn compile_failure(&self) -> Option<&Arc<CompileFailure>> {
        match self {
            Self::CompileFailed(failure) => Some(failure),
            _ => None,
        }
    }
}

pub type Result<T, E = RuntimeError> = std::result::Result<T, E>;

// ============================================================================
// CompileFailure
// ============================================================================

/// Outcome of a failed compile: which script, and everything the compiler said.
#[derive(Debug, Clone)]
pub struct CompileFailure {
    /// Fully-qualified type name of the script being compiled
    pub type_name: String,
    pub diagnostics: Vec<Diagnostic>,
}

impl CompileFailure {
    pub fn new(type_name: impl Into<String>, diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            type_name: type_name.into(),
            diagnostics,
        }
    }

    /// Diagnostics rendered one per line, without the header.
    pub fn detail(&self) -> String {
        self.diagnostics
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl fmt::Display for CompileFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} `{}`",
            "failed to compile".red().bold(),
            self.type_name
        )?;
        for diag in &self.diagnostics {
            write!(f, "\n{} {diag}", "→".red())?;
        }
        if self.diagnostics.len() > 1 {
            write!(
                f,
                "\n\n{} {} {}",
                "found".dimmed(),
                self.diagnostics.len().to_string().red().bold(),
                "errors".dimmed()
            )?;
        }
        Ok(())
    }
}

impl std::error::Error for CompileFailure {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::Position;
    use std::path::Path;

    #[test]
    fn test_compile_failure_display() {
        owo_colors::set_override(false);
        let failure = CompileFailure::new(
            "Scripts.Intro",
            vec![
                Diagnostic::at(Path::new("Intro.brew"), Position::new(1, 5), "unknown variable `x`"),
                Diagnostic::new("Intro.brew", "expected `;`"),
            ],
        );
        let text = RuntimeError::CompileFailed(Arc::new(failure)).to_string();
        assert!(text.contains("failed to compile `Scripts.Intro`"));
        assert!(text.contains("Intro.brew:1:5: unknown variable `x`"));
        assert!(text.contains("found 2 errors"));
    }

    #[test]
    fn test_detail_lists_each_diagnostic() {
        let failure = CompileFailure::new(
            "A",
            vec![Diagnostic::new("a.brew", "one"), Diagnostic::new("b.brew", "two")],
        );
        assert_eq!(failure.detail(), "a.brew: one\nb.brew: two");
    }

    #[test]
    fn test_disposed_display() {
        let err = RuntimeError::Disposed("script registry");
        assert!(err.is_disposed());
        assert_eq!(err.to_string(), "script registry has been disposed");
    }
}
