//! Execution contexts and the instances created from them.

use std::sync::Arc;
use std::time::SystemTime;

use crate::error::Result;
use crate::lang::{EvalError, Fields, Program, Value, ast::ScriptDecl};

/// One compiled version of a script.
///
/// The container holds the active sandbox; every [`ScriptInstance`] holds
/// the sandbox it was created from. Once the container swaps in a newer
/// generation and the last instance is dropped, the program is freed.
#[derive(Debug)]
pub struct Sandbox {
    type_name: String,
    generation: u64,
    program: Program,
    loaded_at: SystemTime,
}

impl Sandbox {
    pub fn new(type_name: impl Into<String>, generation: u64, program: Program) -> Self {
        Self {
            type_name: type_name.into(),
            generation,
            program,
            loaded_at: SystemTime::now(),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn loaded_at(&self) -> SystemTime {
        self.loaded_at
    }

    fn script(&self) -> Result<&ScriptDecl, EvalError> {
        self.program.script(&self.type_name).ok_or_else(|| {
            EvalError::new(format!("type `{}` missing from compiled unit", self.type_name))
        })
    }

    /// Create a fresh instance, running field initializers in order.
    pub fn instantiate(self: &Arc<Self>) -> Result<ScriptInstance> {
        let fields = self.program.init_fields(self.script()?)?;
        Ok(ScriptInstance {
            sandbox: Arc::clone(self),
            fields,
        })
    }
}

impl Drop for Sandbox {
    fn drop(&mut self) {
        crate::debug!("sandbox"; "unloaded {} (generation {})", self.type_name, self.generation);
    }
}

/// A live object of a compiled script type.
///
/// Stays valid after its container reloads: it keeps running the code of
/// the generation it was created from.
#[derive(Debug)]
pub struct ScriptInstance {
    sandbox: Arc<Sandbox>,
    fields: Fields,
}

impl ScriptInstance {
    pub fn type_name(&self) -> &str {
        self.sandbox.type_name()
    }

    /// Generation of the sandbox this instance runs on.
    pub fn generation(&self) -> u64 {
        self.sandbox.generation()
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.sandbox
            .script()
            .is_ok_and(|script| script.method(name).is_some())
    }

    pub fn call(&self, method: &str, args: &[Value]) -> Result<Value> {
        let script = self.sandbox.script()?;
        Ok(self
            .sandbox
            .program
            .call_method(script, &self.fields, method, args)?)
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Overwrite a declared field. Undeclared names are rejected.
    pub fn set_field(&mut self, name: &str, value: Value) -> Result<()> {
        match self.fields.get_mut(name) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(EvalError::new(format!(
                "`{}` has no field `{name}`",
                self.sandbox.type_name
            ))
            .into()),
        }
    }
}
