//! Compiler capability injected into script containers.
//!
//! The container never knows how sources become a [`Program`]; it gathers
//! inputs, hands them to a [`Compiler`] and hosts whatever comes back.
//!
//! - `sources` - collecting and reading script/library inputs

pub mod sources;

use crate::lang::{self, Diagnostic, Program, SourceText};

/// Everything a compiler needs to build one script's compiled unit.
#[derive(Debug, Clone, Copy)]
pub struct CompileRequest<'a> {
    /// Fully-qualified type the result must expose (`{namespace}.{name}`)
    pub type_name: &'a str,
    /// The script's own source
    pub script: &'a SourceText,
    /// Every shared library source
    pub library: &'a [SourceText],
    /// Fixed reference set the unit is compiled against
    pub references: &'a [String],
}

impl CompileRequest<'_> {
    /// Script source followed by library sources.
    pub fn all_sources(&self) -> Vec<SourceText> {
        let mut sources = Vec::with_capacity(self.library.len() + 1);
        sources.push(self.script.clone());
        sources.extend_from_slice(self.library);
        sources
    }
}

/// Turns sources into a compiled unit, or reports why it cannot.
pub trait Compiler: Send + Sync {
    fn compile(&self, request: &CompileRequest<'_>) -> Result<Program, Vec<Diagnostic>>;
}

impl<F> Compiler for F
where
    F: Fn(&CompileRequest<'_>) -> Result<Program, Vec<Diagnostic>> + Send + Sync,
{
    fn compile(&self, request: &CompileRequest<'_>) -> Result<Program, Vec<Diagnostic>> {
        self(request)
    }
}

/// Compiler for the built-in `brew` language.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrewCompiler;

impl Compiler for BrewCompiler {
    fn compile(&self, request: &CompileRequest<'_>) -> Result<Program, Vec<Diagnostic>> {
        lang::compile(&request.all_sources(), request.references)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn request<'a>(script: &'a SourceText, library: &'a [SourceText], refs: &'a [String]) -> CompileRequest<'a> {
        CompileRequest {
            type_name: "S.A",
            script,
            library,
            references: refs,
        }
    }

    #[test]
    fn test_brew_compiler_links_library() {
        let script = SourceText::new("A.brew", "namespace S;\nscript A { fn v() = helper(); }");
        let library = [SourceText::new("lib/h.brew", "fn helper() = 7;")];
        let program = BrewCompiler.compile(&request(&script, &library, &[])).unwrap();
        assert!(program.script("S.A").is_some());
        assert!(program.has_function("helper"));
    }

    #[test]
    fn test_closure_compiler() {
        let calls = AtomicUsize::new(0);
        let fake = |req: &CompileRequest<'_>| {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(vec![Diagnostic::new(&req.script.path, "always fails")])
        };
        let script = SourceText::new("A.brew", "");
        let err = fake.compile(&request(&script, &[], &[])).unwrap_err();
        assert_eq!(err[0].message, "always fails");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_all_sources_order() {
        let script = SourceText::new("A.brew", "");
        let library = [SourceText::new("l1.brew", ""), SourceText::new("l2.brew", "")];
        let sources = request(&script, &library, &[]).all_sources();
        let paths: Vec<_> = sources.iter().map(|s| s.path.to_str().unwrap()).collect();
        assert_eq!(paths, vec!["A.brew", "l1.brew", "l2.brew"]);
    }
}
