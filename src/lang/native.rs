//! Host-provided native modules.
//!
//! Scripts can only call into the modules listed in the compile request's
//! reference set, the same way a compiled unit only sees the assemblies it
//! was compiled against.

use super::eval::EvalError;
use super::value::Value;

pub type NativeFnPtr = fn(&[Value]) -> Result<Value, EvalError>;

pub struct NativeFn {
    pub name: &'static str,
    pub arity: usize,
    pub call: NativeFnPtr,
}

pub struct NativeModule {
    pub name: &'static str,
    pub functions: &'static [NativeFn],
}

impl std::fmt::Debug for NativeModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeModule").field("name", &self.name).finish()
    }
}

impl NativeModule {
    pub fn function(&self, name: &str) -> Option<&'static NativeFn> {
        self.functions.iter().find(|f| f.name == name)
    }
}

/// Every module a reference set may name.
pub static MODULES: &[NativeModule] = &[
    NativeModule {
        name: "core",
        functions: &[
            NativeFn { name: "str", arity: 1, call: core_str },
            NativeFn { name: "len", arity: 1, call: core_len },
            NativeFn { name: "min", arity: 2, call: core_min },
            NativeFn { name: "max", arity: 2, call: core_max },
            NativeFn { name: "abs", arity: 1, call: core_abs },
        ],
    },
    NativeModule {
        name: "math",
        functions: &[
            NativeFn { name: "sqrt", arity: 1, call: math_sqrt },
            NativeFn { name: "floor", arity: 1, call: math_floor },
            NativeFn { name: "ceil", arity: 1, call: math_ceil },
            NativeFn { name: "pow", arity: 2, call: math_pow },
            NativeFn { name: "sin", arity: 1, call: math_sin },
            NativeFn { name: "cos", arity: 1, call: math_cos },
            NativeFn { name: "pi", arity: 0, call: math_pi },
        ],
    },
];

pub fn lookup(name: &str) -> Option<&'static NativeModule> {
    MODULES.iter().find(|m| m.name == name)
}

fn number(fname: &str, value: &Value) -> Result<f64, EvalError> {
    value
        .as_f64()
        .ok_or_else(|| EvalError::new(format!("`{fname}` expects a number, got {}", value.type_name())))
}

fn core_str(args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Str(args[0].to_string()))
}

fn core_len(args: &[Value]) -> Result<Value, EvalError> {
    match &args[0] {
        Value::Str(s) => Ok(Value::Int(s.chars().count() as i64)),
        other => Err(EvalError::new(format!("`len` expects a string, got {}", other.type_name()))),
    }
}

fn core_min(args: &[Value]) -> Result<Value, EvalError> {
    match (&args[0], &args[1]) {
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(*a.min(b))),
        (a, b) => Ok(Value::Float(number("min", a)?.min(number("min", b)?))),
    }
}

fn core_max(args: &[Value]) -> Result<Value, EvalError> {
    match (&args[0], &args[1]) {
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(*a.max(b))),
        (a, b) => Ok(Value::Float(number("max", a)?.max(number("max", b)?))),
    }
}

fn core_abs(args: &[Value]) -> Result<Value, EvalError> {
    match &args[0] {
        Value::Int(i) => i
            .checked_abs()
            .map(Value::Int)
            .ok_or_else(|| EvalError::new("integer overflow in `abs`")),
        other => Ok(Value::Float(number("abs", other)?.abs())),
    }
}

fn math_sqrt(args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Float(number("sqrt", &args[0])?.sqrt()))
}

fn math_floor(args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Float(number("floor", &args[0])?.floor()))
}

fn math_ceil(args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Float(number("ceil", &args[0])?.ceil()))
}

fn math_pow(args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Float(number("pow", &args[0])?.powf(number("pow", &args[1])?)))
}

fn math_sin(args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Float(number("sin", &args[0])?.sin()))
}

fn math_cos(args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Float(number("cos", &args[0])?.cos()))
}

fn math_pi(_: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Float(std::f64::consts::PI))
}
