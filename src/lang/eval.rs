//! Tree-walking evaluator.

use rustc_hash::FxHashMap;
use thiserror::Error;

use super::Program;
use super::ast::{BinaryOp, Expr, FnDecl, ScriptDecl, UnaryOp};
use super::value::Value;

/// Maximum nesting of script/library calls before evaluation is aborted.
pub const MAX_CALL_DEPTH: usize = 128;

/// Maximum number of expressions under evaluation at once, across all calls.
pub const MAX_EVAL_NESTING: usize = 512;

/// Instance field storage.
pub type Fields = FxHashMap<String, Value>;

/// Runtime error raised while executing script code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct EvalError {
    pub message: String,
}

impl EvalError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

struct Frame<'a> {
    params: &'a [String],
    args: &'a [Value],
    fields: Option<&'a Fields>,
    script: Option<&'a ScriptDecl>,
}

pub(super) struct Interpreter<'p> {
    program: &'p Program,
    depth: usize,
    nesting: usize,
}

impl<'p> Interpreter<'p> {
    pub fn new(program: &'p Program) -> Self {
        Self {
            program,
            depth: 0,
            nesting: 0,
        }
    }

    /// Evaluate field initializers in declaration order.
    pub fn init_fields(&mut self, script: &ScriptDecl) -> Result<Fields, EvalError> {
        let mut fields = Fields::default();
        for field in &script.fields {
            let frame = Frame {
                params: &[],
                args: &[],
                fields: Some(&fields),
                // initializers cannot call methods of the half-built instance
                script: None,
            };
            let value = self.eval(&field.init, &frame)?;
            fields.insert(field.name.clone(), value);
        }
        Ok(fields)
    }

    pub fn call_method(
        &mut self,
        script: &ScriptDecl,
        fields: &Fields,
        method: &str,
        args: &[Value],
    ) -> Result<Value, EvalError> {
        let decl = script.method(method).ok_or_else(|| {
            EvalError::new(format!("`{}` has no method `{method}`", script.qualified_name))
        })?;
        self.invoke(decl, args, Some(fields), Some(script))
    }

    pub fn call_function(&mut self, name: &str, args: &[Value]) -> Result<Value, EvalError> {
        let program = self.program;
        let decl = program
            .functions
            .get(name)
            .ok_or_else(|| EvalError::new(format!("unknown function `{name}`")))?;
        self.invoke(decl, args, None, None)
    }

    fn invoke(
        &mut self,
        decl: &FnDecl,
        args: &[Value],
        fields: Option<&Fields>,
        script: Option<&ScriptDecl>,
    ) -> Result<Value, EvalError> {
        if decl.params.len() != args.len() {
            return Err(EvalError::new(format!(
                "`{}` takes {} argument(s) but {} were given",
                decl.name,
                decl.params.len(),
                args.len()
            )));
        }
        if self.depth >= MAX_CALL_DEPTH {
            return Err(EvalError::new(format!(
                "call depth limit ({MAX_CALL_DEPTH}) exceeded in `{}`",
                decl.name
            )));
        }

        self.depth += 1;
        let frame = Frame {
            params: &decl.params,
            args,
            fields,
            script,
        };
        let result = self.eval(&decl.body, &frame);
        self.depth -= 1;
        result
    }

    fn eval(&mut self, expr: &Expr, frame: &Frame<'_>) -> Result<Value, EvalError> {
        if self.nesting >= MAX_EVAL_NESTING {
            return Err(EvalError::new(format!(
                "evaluation nested deeper than {MAX_EVAL_NESTING} levels"
            )));
        }
        self.nesting += 1;
        let result = self.eval_expr(expr, frame);
        self.nesting -= 1;
        result
    }

    fn eval_expr(&mut self, expr: &Expr, frame: &Frame<'_>) -> Result<Value, EvalError> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Var { name, .. } => lookup_var(name, frame),
            Expr::Call {
                module, name, args, ..
            } => {
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg, frame))
                    .collect::<Result<Vec<_>, _>>()?;
                self.call(module.as_deref(), name, &args, frame)
            }
            Expr::Unary { op, expr } => {
                let value = self.eval(expr, frame)?;
                unary(*op, value)
            }
            Expr::Binary { op, lhs, rhs, .. } => match op {
                BinaryOp::And | BinaryOp::Or => {
                    let lhs = self.eval_bool(lhs, frame, *op)?;
                    match (op, lhs) {
                        (BinaryOp::And, false) => Ok(Value::Bool(false)),
                        (BinaryOp::Or, true) => Ok(Value::Bool(true)),
                        _ => self.eval_bool(rhs, frame, *op).map(Value::Bool),
                    }
                }
                _ => {
                    let lhs = self.eval(lhs, frame)?;
                    let rhs = self.eval(rhs, frame)?;
                    binary(*op, lhs, rhs)
                }
            },
            Expr::If {
                cond,
                then,
                otherwise,
            } => {
                let cond = self.eval(cond, frame)?;
                match cond {
                    Value::Bool(true) => self.eval(then, frame),
                    Value::Bool(false) => self.eval(otherwise, frame),
                    other => Err(EvalError::new(format!(
                        "`if` condition must be bool, got {}",
                        other.type_name()
                    ))),
                }
            }
        }
    }

    fn eval_bool(&mut self, expr: &Expr, frame: &Frame<'_>, op: BinaryOp) -> Result<bool, EvalError> {
        let value = self.eval(expr, frame)?;
        value.as_bool().ok_or_else(|| {
            EvalError::new(format!(
                "`{}` expects bool operands, got {}",
                if op == BinaryOp::And { "and" } else { "or" },
                value.type_name()
            ))
        })
    }

    fn call(
        &mut self,
        module: Option<&str>,
        name: &str,
        args: &[Value],
        frame: &Frame<'_>,
    ) -> Result<Value, EvalError> {
        if let Some(module) = module {
            let function = self
                .program
                .modules
                .iter()
                .find(|m| m.name == module)
                .and_then(|m| m.function(name))
                .ok_or_else(|| EvalError::new(format!("unknown function `{module}.{name}`")))?;
            if function.arity != args.len() {
                return Err(EvalError::new(format!(
                    "`{module}.{name}` takes {} argument(s) but {} were given",
                    function.arity,
                    args.len()
                )));
            }
            return (function.call)(args);
        }

        if let Some(script) = frame.script
            && let Some(method) = script.method(name)
        {
            return self.invoke(method, args, frame.fields, Some(script));
        }
        self.call_function(name, args)
    }
}

fn lookup_var(name: &str, frame: &Frame<'_>) -> Result<Value, EvalError> {
    if let Some(index) = frame.params.iter().position(|p| p == name) {
        return Ok(frame.args[index].clone());
    }
    frame
        .fields
        .and_then(|fields| fields.get(name))
        .cloned()
        .ok_or_else(|| EvalError::new(format!("unknown variable `{name}`")))
}

fn unary(op: UnaryOp, value: Value) -> Result<Value, EvalError> {
    match (op, value) {
        (UnaryOp::Neg, Value::Int(i)) => i
            .checked_neg()
            .map(Value::Int)
            .ok_or_else(|| EvalError::new("integer overflow")),
        (UnaryOp::Neg, Value::Float(f)) => Ok(Value::Float(-f)),
        (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (op, value) => Err(EvalError::new(format!(
            "cannot apply `{}` to {}",
            if op == UnaryOp::Neg { "-" } else { "not" },
            value.type_name()
        ))),
    }
}

fn binary(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, EvalError> {
    match op {
        BinaryOp::Add if matches!(lhs, Value::Str(_)) || matches!(rhs, Value::Str(_)) => {
            Ok(Value::Str(format!("{lhs}{rhs}")))
        }
        BinaryOp::Eq => Ok(Value::Bool(values_equal(&lhs, &rhs))),
        BinaryOp::Ne => Ok(Value::Bool(!values_equal(&lhs, &rhs))),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => compare(op, &lhs, &rhs),
        BinaryOp::And | BinaryOp::Or => Err(EvalError::new("logical operator without operands")),
        _ => arithmetic(op, lhs, rhs),
    }
}

fn values_equal(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => (*a as f64) == *b,
        _ => lhs == rhs,
    }
}

fn compare(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
    let ordering = match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => a.partial_cmp(b),
        (Value::Str(a), Value::Str(b)) => a.partial_cmp(b),
        _ => match (lhs.as_f64(), rhs.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => {
                return Err(EvalError::new(format!(
                    "cannot compare {} with {}",
                    lhs.type_name(),
                    rhs.type_name()
                )));
            }
        },
    };
    // NaN compares false for every operator
    let Some(ordering) = ordering else {
        return Ok(Value::Bool(false));
    };
    Ok(Value::Bool(match op {
        BinaryOp::Lt => ordering.is_lt(),
        BinaryOp::Le => ordering.is_le(),
        BinaryOp::Gt => ordering.is_gt(),
        _ => ordering.is_ge(),
    }))
}

fn arithmetic(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, EvalError> {
    if let (Value::Int(a), Value::Int(b)) = (&lhs, &rhs) {
        let (a, b) = (*a, *b);
        if matches!(op, BinaryOp::Div | BinaryOp::Rem) && b == 0 {
            return Err(EvalError::new("division by zero"));
        }
        let result = match op {
            BinaryOp::Add => a.checked_add(b),
            BinaryOp::Sub => a.checked_sub(b),
            BinaryOp::Mul => a.checked_mul(b),
            BinaryOp::Div => a.checked_div(b),
            _ => a.checked_rem(b),
        };
        return result
            .map(Value::Int)
            .ok_or_else(|| EvalError::new("integer overflow"));
    }

    let (Some(a), Some(b)) = (lhs.as_f64(), rhs.as_f64()) else {
        return Err(EvalError::new(format!(
            "unsupported operands {} and {}",
            lhs.type_name(),
            rhs.type_name()
        )));
    };
    Ok(Value::Float(match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        _ => a % b,
    }))
}
