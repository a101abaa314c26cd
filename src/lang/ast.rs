//! Syntax tree produced by the parser.

use std::path::PathBuf;

use super::diagnostic::Position;
use super::value::Value;

/// One parsed source file.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub functions: Vec<FnDecl>,
    pub scripts: Vec<ScriptDecl>,
}

/// `fn name(params) = body;`
#[derive(Debug, Clone)]
pub struct FnDecl {
    pub name: String,
    pub params: Vec<String>,
    pub body: Expr,
    pub position: Position,
}

/// `let name = init;` inside a script body.
#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub name: String,
    pub init: Expr,
    pub position: Position,
}

/// `script Name { ... }`
#[derive(Debug, Clone)]
pub struct ScriptDecl {
    /// `{namespace}.{name}`, or just `name` outside any namespace.
    pub qualified_name: String,
    pub name: String,
    pub fields: Vec<FieldDecl>,
    pub methods: Vec<FnDecl>,
    pub position: Position,
    /// File the script was declared in (for diagnostics).
    pub path: PathBuf,
}

impl ScriptDecl {
    pub fn method(&self, name: &str) -> Option<&FnDecl> {
        self.methods.iter().find(|m| m.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

#[derive(Debug, Clone)]
pub enum Expr {
    Literal(Value),
    Var {
        name: String,
        position: Position,
    },
    Call {
        /// `Some("math")` for `math.sqrt(..)`
        module: Option<String>,
        name: String,
        args: Vec<Expr>,
        position: Position,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        position: Position,
    },
    If {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
}

impl Expr {
    /// Levels in this expression tree; a literal or variable is 1.
    pub fn height(&self) -> usize {
        let children = match self {
            Self::Literal(_) | Self::Var { .. } => 0,
            Self::Call { args, .. } => args.iter().map(Self::height).max().unwrap_or(0),
            Self::Unary { expr, .. } => expr.height(),
            Self::Binary { lhs, rhs, .. } => lhs.height().max(rhs.height()),
            Self::If {
                cond,
                then,
                otherwise,
            } => cond.height().max(then.height()).max(otherwise.height()),
        };
        children + 1
    }
}
