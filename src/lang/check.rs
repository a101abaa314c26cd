//! Name resolution and arity checks over parsed sources.

use std::path::Path;

use rustc_hash::FxHashMap;

use super::ast::{Expr, FnDecl, ScriptDecl};
use super::diagnostic::{Diagnostic, Position};
use super::native::{self, NativeModule};

/// What an expression can see while being checked.
pub(super) struct Scope<'a> {
    pub params: &'a [String],
    /// Visible instance fields (all fields for methods, earlier ones for initializers).
    pub fields: &'a [&'a str],
    /// Enclosing script; `None` inside library functions.
    pub script: Option<&'a ScriptDecl>,
    /// Whether methods of the enclosing script may be called.
    pub methods_visible: bool,
}

pub(super) struct Checker<'a> {
    pub functions: &'a FxHashMap<String, FnDecl>,
    pub modules: &'a [&'static NativeModule],
    pub diagnostics: Vec<Diagnostic>,
}

impl Checker<'_> {
    pub fn check_expr(&mut self, path: &Path, expr: &Expr, scope: &Scope<'_>) {
        match expr {
            Expr::Literal(_) => {}
            Expr::Var { name, position } => {
                let known = scope.params.iter().any(|p| p == name)
                    || scope.fields.iter().any(|f| *f == name.as_str());
                if !known {
                    let mut diag =
                        Diagnostic::at(path, *position, format!("unknown variable `{name}`"));
                    if scope.script.is_some_and(|s| s.has_field(name)) {
                        diag = diag.with_hint("fields can only refer to fields declared before them");
                    }
                    self.diagnostics.push(diag);
                }
            }
            Expr::Call {
                module,
                name,
                args,
                position,
            } => {
                for arg in args {
                    self.check_expr(path, arg, scope);
                }
                let expected = match module {
                    Some(module) => self.module_arity(path, module, name, *position),
                    None => self.local_arity(path, name, *position, scope),
                };
                if let Some(expected) = expected
                    && expected != args.len()
                {
                    let callee = match module {
                        Some(module) => format!("{module}.{name}"),
                        None => name.clone(),
                    };
                    self.diagnostics.push(Diagnostic::at(
                        path,
                        *position,
                        format!(
                            "`{callee}` takes {expected} argument(s) but {} were given",
                            args.len()
                        ),
                    ));
                }
            }
            Expr::Unary { expr, .. } => self.check_expr(path, expr, scope),
            Expr::Binary { lhs, rhs, .. } => {
                self.check_expr(path, lhs, scope);
                self.check_expr(path, rhs, scope);
            }
            Expr::If {
                cond,
                then,
                otherwise,
            } => {
                self.check_expr(path, cond, scope);
                self.check_expr(path, then, scope);
                self.check_expr(path, otherwise, scope);
            }
        }
    }

    /// Arity of a same-script method or library function, `None` if unresolved.
    fn local_arity(
        &mut self,
        path: &Path,
        name: &str,
        position: Position,
        scope: &Scope<'_>,
    ) -> Option<usize> {
        if scope.methods_visible
            && let Some(method) = scope.script.and_then(|s| s.method(name))
        {
            return Some(method.params.len());
        }
        if let Some(function) = self.functions.get(name) {
            return Some(function.params.len());
        }

        let mut diag = Diagnostic::at(path, position, format!("unknown function `{name}`"));
        if !scope.methods_visible && scope.script.is_some_and(|s| s.method(name).is_some()) {
            diag = diag.with_hint("methods cannot be called from field initializers");
        }
        self.diagnostics.push(diag);
        None
    }

    fn module_arity(
        &mut self,
        path: &Path,
        module: &str,
        name: &str,
        position: Position,
    ) -> Option<usize> {
        let Some(referenced) = self.modules.iter().find(|m| m.name == module) else {
            let diag = if native::lookup(module).is_some() {
                Diagnostic::at(path, position, format!("missing reference `{module}`"))
                    .with_hint(format!("add \"{module}\" to the script references"))
            } else {
                Diagnostic::at(path, position, format!("unknown module `{module}`"))
            };
            self.diagnostics.push(diag);
            return None;
        };

        match referenced.function(name) {
            Some(function) => Some(function.arity),
            None => {
                self.diagnostics.push(Diagnostic::at(
                    path,
                    position,
                    format!("unknown function `{module}.{name}`"),
                ));
                None
            }
        }
    }
}
