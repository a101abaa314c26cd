//! The `brew` script language.
//!
//! A small expression language used as the default compiler backend.
//!
//! # Modules
//!
//! - `lexer` / `parser` - source text to [`ast::SourceFile`]
//! - `check` - name resolution and arity checks
//! - `eval` - tree-walking interpreter
//! - `native` - host modules (`core`, `math`) a reference set can name
//!
//! ```text
//! sources + references ──parse──► SourceFile* ──link/check──► Program
//! ```

pub mod ast;
mod check;
pub mod diagnostic;
pub mod eval;
pub mod lexer;
pub mod native;
pub mod parser;
pub mod value;

use std::path::{Path, PathBuf};

use rustc_hash::{FxHashMap, FxHashSet};

use ast::{FnDecl, ScriptDecl};
use check::{Checker, Scope};
use native::NativeModule;

pub use diagnostic::{Diagnostic, Position};
pub use eval::{EvalError, Fields};
pub use value::Value;

/// Pseudo-path used for diagnostics about the reference set itself.
pub const REFERENCES_PATH: &str = "<references>";

/// A source file handed to the compiler.
#[derive(Debug, Clone)]
pub struct SourceText {
    pub path: PathBuf,
    pub text: String,
}

impl SourceText {
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }
}

/// A linked, checked compilation unit.
///
/// Holds every library function and script type from the sources it was
/// compiled from, plus the native modules it was allowed to reference.
#[derive(Debug)]
pub struct Program {
    functions: FxHashMap<String, FnDecl>,
    scripts: FxHashMap<String, ScriptDecl>,
    modules: Vec<&'static NativeModule>,
}

impl Program {
    /// Look up a script type by fully-qualified name.
    pub fn script(&self, qualified_name: &str) -> Option<&ScriptDecl> {
        self.scripts.get(qualified_name)
    }

    /// Fully-qualified names of every script type, sorted.
    pub fn script_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.scripts.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Evaluate a script's field initializers, producing fresh instance state.
    pub fn init_fields(&self, script: &ScriptDecl) -> Result<Fields, EvalError> {
        eval::Interpreter::new(self).init_fields(script)
    }

    pub fn call_method(
        &self,
        script: &ScriptDecl,
        fields: &Fields,
        method: &str,
        args: &[Value],
    ) -> Result<Value, EvalError> {
        eval::Interpreter::new(self).call_method(script, fields, method, args)
    }

    /// Call a library function directly.
    pub fn call_function(&self, name: &str, args: &[Value]) -> Result<Value, EvalError> {
        eval::Interpreter::new(self).call_function(name, args)
    }
}

/// Compile `sources` against the native modules named in `references`.
///
/// Every file is parsed even when an earlier one fails, so one pass reports
/// syntax errors across the whole library.
pub fn compile(sources: &[SourceText], references: &[String]) -> Result<Program, Vec<Diagnostic>> {
    let mut diagnostics = Vec::new();

    let modules = resolve_references(references, &mut diagnostics);

    let files: Vec<_> = sources
        .iter()
        .filter_map(|source| match parser::parse(&source.path, &source.text) {
            Ok(file) => Some(file),
            Err(diag) => {
                diagnostics.push(diag);
                None
            }
        })
        .collect();
    if !diagnostics.is_empty() {
        return Err(diagnostics);
    }

    let mut functions: FxHashMap<String, FnDecl> = FxHashMap::default();
    let mut function_paths: FxHashMap<String, PathBuf> = FxHashMap::default();
    let mut scripts: FxHashMap<String, ScriptDecl> = FxHashMap::default();

    for file in files {
        for function in file.functions {
            if let Some(first) = function_paths.get(&function.name) {
                diagnostics.push(
                    Diagnostic::at(
                        &file.path,
                        function.position,
                        format!("duplicate library function `{}`", function.name),
                    )
                    .with_hint(format!("first defined in {}", first.display())),
                );
                continue;
            }
            function_paths.insert(function.name.clone(), file.path.clone());
            functions.insert(function.name.clone(), function);
        }

        for script in file.scripts {
            if let Some(first) = scripts.get(&script.qualified_name) {
                diagnostics.push(
                    Diagnostic::at(
                        &script.path,
                        script.position,
                        format!("duplicate script type `{}`", script.qualified_name),
                    )
                    .with_hint(format!("first defined in {}", first.path.display())),
                );
                continue;
            }
            check_members(&script, &mut diagnostics);
            scripts.insert(script.qualified_name.clone(), script);
        }
    }

    let mut checker = Checker {
        functions: &functions,
        modules: &modules,
        diagnostics,
    };

    let mut sorted_functions: Vec<_> = functions.values().collect();
    sorted_functions.sort_by(|a, b| a.name.cmp(&b.name));
    for function in sorted_functions {
        let path = &function_paths[&function.name];
        let scope = Scope {
            params: &function.params,
            fields: &[],
            script: None,
            methods_visible: false,
        };
        checker.check_expr(path, &function.body, &scope);
    }

    let mut sorted_scripts: Vec<_> = scripts.values().collect();
    sorted_scripts.sort_by(|a, b| a.qualified_name.cmp(&b.qualified_name));
    for script in sorted_scripts {
        check_script(&mut checker, script);
    }

    let diagnostics = checker.diagnostics;
    if !diagnostics.is_empty() {
        return Err(diagnostics);
    }

    Ok(Program {
        functions,
        scripts,
        modules,
    })
}

fn resolve_references(
    references: &[String],
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<&'static NativeModule> {
    let mut modules: Vec<&'static NativeModule> = Vec::new();
    for reference in references {
        match native::lookup(reference) {
            Some(module) if !modules.iter().any(|m| m.name == module.name) => modules.push(module),
            Some(_) => {}
            None => diagnostics.push(
                Diagnostic::new(REFERENCES_PATH, format!("missing reference `{reference}`"))
                    .with_hint(format!(
                        "available modules: {}",
                        native::MODULES
                            .iter()
                            .map(|m| m.name)
                            .collect::<Vec<_>>()
                            .join(", ")
                    )),
            ),
        }
    }
    modules
}

/// Reject duplicate fields/methods inside one script body.
fn check_members(script: &ScriptDecl, diagnostics: &mut Vec<Diagnostic>) {
    let mut seen: FxHashSet<&str> = FxHashSet::default();
    let members = script
        .fields
        .iter()
        .map(|f| (f.name.as_str(), f.position))
        .chain(script.methods.iter().map(|m| (m.name.as_str(), m.position)));
    for (name, position) in members {
        if !seen.insert(name) {
            diagnostics.push(Diagnostic::at(
                &script.path,
                position,
                format!("duplicate member `{name}` in `{}`", script.qualified_name),
            ));
        }
    }
}

fn check_script(checker: &mut Checker<'_>, script: &ScriptDecl) {
    let path: &Path = &script.path;
    let all_fields: Vec<&str> = script.fields.iter().map(|f| f.name.as_str()).collect();

    for (index, field) in script.fields.iter().enumerate() {
        let scope = Scope {
            params: &[],
            fields: &all_fields[..index],
            script: Some(script),
            methods_visible: false,
        };
        checker.check_expr(path, &field.init, &scope);
    }

    for method in &script.methods {
        let scope = Scope {
            params: &method.params,
            fields: &all_fields,
            script: Some(script),
            methods_visible: true,
        };
        checker.check_expr(path, &method.body, &scope);
    }
}
