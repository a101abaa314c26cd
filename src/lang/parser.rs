//! Recursive-descent parser.

use std::path::Path;

use super::ast::{BinaryOp, Expr, FieldDecl, FnDecl, ScriptDecl, SourceFile, UnaryOp};
use super::diagnostic::{Diagnostic, Position};
use super::lexer::{Keyword, Token, TokenKind, tokenize};
use super::value::Value;

/// Deepest expression the parser accepts, counting both parenthesized
/// nesting and expression tree levels.
pub const MAX_NESTING: usize = 128;

/// Parse one source file.
///
/// Stops at the first syntax error.
pub fn parse(path: &Path, source: &str) -> Result<SourceFile, Diagnostic> {
    let tokens = tokenize(path, source)?;
    Parser {
        path,
        tokens,
        cursor: 0,
        namespace: None,
        depth: 0,
    }
    .file()
}

struct Parser<'a> {
    path: &'a Path,
    tokens: Vec<Token>,
    cursor: usize,
    namespace: Option<String>,
    /// Current recursion depth of the expression rules
    depth: usize,
}

impl Parser<'_> {
    // ------------------------------------------------------------------------
    // token helpers
    // ------------------------------------------------------------------------

    fn peek(&self) -> &Token {
        // tokenize() always ends with Eof, and we never advance past it
        &self.tokens[self.cursor.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.cursor += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: Keyword) -> bool {
        self.eat(&TokenKind::Keyword(keyword))
    }

    fn unexpected(&self, expected: &str) -> Diagnostic {
        let token = self.peek();
        Diagnostic::at(
            self.path,
            token.position,
            format!("expected {expected}, found {}", token.kind.describe()),
        )
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> Result<Token, Diagnostic> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn ident(&mut self, what: &str) -> Result<(String, Position), Diagnostic> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Ident(name) => {
                self.advance();
                Ok((name, token.position))
            }
            _ => Err(self.unexpected(what)),
        }
    }

    fn too_deep(&self, position: Position) -> Diagnostic {
        Diagnostic::at(self.path, position, "expression nested too deeply")
            .with_hint(format!("at most {MAX_NESTING} levels are allowed"))
    }

    /// Run one recursive expression rule, bounded by [`MAX_NESTING`].
    fn nested(
        &mut self,
        rule: fn(&mut Self) -> Result<Expr, Diagnostic>,
    ) -> Result<Expr, Diagnostic> {
        if self.depth >= MAX_NESTING {
            return Err(self.too_deep(self.peek().position));
        }
        self.depth += 1;
        let result = rule(self);
        self.depth -= 1;
        result
    }

    /// Reject a freshly built node whose tree is taller than [`MAX_NESTING`].
    fn bounded(&self, expr: Expr, position: Position) -> Result<Expr, Diagnostic> {
        if expr.height() > MAX_NESTING {
            return Err(self.too_deep(position));
        }
        Ok(expr)
    }

    // ------------------------------------------------------------------------
    // items
    // ------------------------------------------------------------------------

    fn file(mut self) -> Result<SourceFile, Diagnostic> {
        let mut file = SourceFile {
            path: self.path.to_path_buf(),
            functions: Vec::new(),
            scripts: Vec::new(),
        };

        while !self.check(&TokenKind::Eof) {
            if self.eat_keyword(Keyword::Namespace) {
                self.namespace = Some(self.path_name()?);
                self.expect(TokenKind::Semicolon, "`;` after namespace")?;
            } else if self.eat_keyword(Keyword::Fn) {
                file.functions.push(self.function()?);
            } else if self.eat_keyword(Keyword::Script) {
                file.scripts.push(self.script()?);
            } else {
                return Err(self.unexpected("`namespace`, `fn` or `script`"));
            }
        }

        Ok(file)
    }

    /// `A.B.C`
    fn path_name(&mut self) -> Result<String, Diagnostic> {
        let (mut name, _) = self.ident("namespace name")?;
        while self.eat(&TokenKind::Dot) {
            let (segment, _) = self.ident("namespace segment")?;
            name.push('.');
            name.push_str(&segment);
        }
        Ok(name)
    }

    /// Parses after the `fn` keyword.
    fn function(&mut self) -> Result<FnDecl, Diagnostic> {
        let (name, position) = self.ident("function name")?;
        self.expect(TokenKind::LParen, "`(` after function name")?;

        let mut params = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                let (param, param_pos) = self.ident("parameter name")?;
                if params.contains(&param) {
                    return Err(Diagnostic::at(
                        self.path,
                        param_pos,
                        format!("duplicate parameter `{param}`"),
                    ));
                }
                params.push(param);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "`)` after parameters")?;
        self.expect(TokenKind::Assign, "`=` before function body")?;
        let body = self.expr()?;
        self.expect(TokenKind::Semicolon, "`;` after function body")?;

        Ok(FnDecl {
            name,
            params,
            body,
            position,
        })
    }

    /// Parses after the `script` keyword.
    fn script(&mut self) -> Result<ScriptDecl, Diagnostic> {
        let (name, position) = self.ident("script name")?;
        self.expect(TokenKind::LBrace, "`{` after script name")?;

        let mut fields = Vec::new();
        let mut methods = Vec::new();
        while !self.eat(&TokenKind::RBrace) {
            if self.eat_keyword(Keyword::Let) {
                let (field, field_pos) = self.ident("field name")?;
                self.expect(TokenKind::Assign, "`=` after field name")?;
                let init = self.expr()?;
                self.expect(TokenKind::Semicolon, "`;` after field initializer")?;
                fields.push(FieldDecl {
                    name: field,
                    init,
                    position: field_pos,
                });
            } else if self.eat_keyword(Keyword::Fn) {
                methods.push(self.function()?);
            } else {
                return Err(self.unexpected("`let`, `fn` or `}`"));
            }
        }

        let qualified_name = match &self.namespace {
            Some(ns) => format!("{ns}.{name}"),
            None => name.clone(),
        };

        Ok(ScriptDecl {
            qualified_name,
            name,
            fields,
            methods,
            position,
            path: self.path.to_path_buf(),
        })
    }

    // ------------------------------------------------------------------------
    // expressions
    // ------------------------------------------------------------------------

    fn expr(&mut self) -> Result<Expr, Diagnostic> {
        self.nested(Self::expr_rule)
    }

    fn expr_rule(&mut self) -> Result<Expr, Diagnostic> {
        let position = self.peek().position;
        if self.eat_keyword(Keyword::If) {
            let cond = self.expr()?;
            if !self.eat_keyword(Keyword::Then) {
                return Err(self.unexpected("`then`"));
            }
            let then = self.expr()?;
            if !self.eat_keyword(Keyword::Else) {
                return Err(self.unexpected("`else`"));
            }
            let otherwise = self.expr()?;
            let expr = Expr::If {
                cond: Box::new(cond),
                then: Box::new(then),
                otherwise: Box::new(otherwise),
            };
            return self.bounded(expr, position);
        }
        self.or()
    }

    fn or(&mut self) -> Result<Expr, Diagnostic> {
        let mut lhs = self.and()?;
        loop {
            let position = self.peek().position;
            if !self.eat_keyword(Keyword::Or) {
                return Ok(lhs);
            }
            let rhs = self.and()?;
            lhs = self.bounded(binary(BinaryOp::Or, lhs, rhs, position), position)?;
        }
    }

    fn and(&mut self) -> Result<Expr, Diagnostic> {
        let mut lhs = self.not()?;
        loop {
            let position = self.peek().position;
            if !self.eat_keyword(Keyword::And) {
                return Ok(lhs);
            }
            let rhs = self.not()?;
            lhs = self.bounded(binary(BinaryOp::And, lhs, rhs, position), position)?;
        }
    }

    fn not(&mut self) -> Result<Expr, Diagnostic> {
        let position = self.peek().position;
        if self.eat_keyword(Keyword::Not) {
            let expr = self.nested(Self::not)?;
            let expr = Expr::Unary {
                op: UnaryOp::Not,
                expr: Box::new(expr),
            };
            return self.bounded(expr, position);
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, Diagnostic> {
        let lhs = self.sum()?;
        let position = self.peek().position;
        let op = match self.peek().kind {
            TokenKind::EqualEqual => BinaryOp::Eq,
            TokenKind::BangEqual => BinaryOp::Ne,
            TokenKind::Less => BinaryOp::Lt,
            TokenKind::LessEqual => BinaryOp::Le,
            TokenKind::Greater => BinaryOp::Gt,
            TokenKind::GreaterEqual => BinaryOp::Ge,
            _ => return Ok(lhs),
        };
        self.advance();
        let rhs = self.sum()?;
        self.bounded(binary(op, lhs, rhs, position), position)
    }

    fn sum(&mut self) -> Result<Expr, Diagnostic> {
        let mut lhs = self.term()?;
        loop {
            let position = self.peek().position;
            let op = match self.peek().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.term()?;
            lhs = self.bounded(binary(op, lhs, rhs, position), position)?;
        }
    }

    fn term(&mut self) -> Result<Expr, Diagnostic> {
        let mut lhs = self.unary()?;
        loop {
            let position = self.peek().position;
            let op = match self.peek().kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Rem,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.unary()?;
            lhs = self.bounded(binary(op, lhs, rhs, position), position)?;
        }
    }

    fn unary(&mut self) -> Result<Expr, Diagnostic> {
        let position = self.peek().position;
        if self.eat(&TokenKind::Minus) {
            let expr = self.nested(Self::unary)?;
            let expr = Expr::Unary {
                op: UnaryOp::Neg,
                expr: Box::new(expr),
            };
            return self.bounded(expr, position);
        }
        self.atom()
    }

    fn atom(&mut self) -> Result<Expr, Diagnostic> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Int(i) => {
                self.advance();
                Ok(Expr::Literal(Value::Int(i)))
            }
            TokenKind::Float(f) => {
                self.advance();
                Ok(Expr::Literal(Value::Float(f)))
            }
            TokenKind::Str(s) => {
                self.advance();
                Ok(Expr::Literal(Value::Str(s)))
            }
            TokenKind::Keyword(Keyword::True) => {
                self.advance();
                Ok(Expr::Literal(Value::Bool(true)))
            }
            TokenKind::Keyword(Keyword::False) => {
                self.advance();
                Ok(Expr::Literal(Value::Bool(false)))
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.expr()?;
                self.expect(TokenKind::RParen, "`)`")?;
                Ok(inner)
            }
            TokenKind::Ident(name) => {
                self.advance();
                self.name_or_call(name, token.position)
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    /// `name`, `name(args)` or `module.name(args)`.
    fn name_or_call(&mut self, first: String, position: Position) -> Result<Expr, Diagnostic> {
        let (module, name) = if self.eat(&TokenKind::Dot) {
            let (member, _) = self.ident("function name after `.`")?;
            if !self.check(&TokenKind::LParen) {
                return Err(self.unexpected("`(` (module members must be called)"));
            }
            (Some(first), member)
        } else {
            (None, first)
        };

        if !self.eat(&TokenKind::LParen) {
            return Ok(Expr::Var { name, position });
        }

        let mut args = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                args.push(self.expr()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "`)` after arguments")?;

        self.bounded(
            Expr::Call {
                module,
                name,
                args,
                position,
            },
            position,
        )
    }
}

fn binary(op: BinaryOp, lhs: Expr, rhs: Expr, position: Position) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
        position,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(source: &str) -> SourceFile {
        parse(Path::new("test.brew"), source).unwrap()
    }

    fn parse_err(source: &str) -> Diagnostic {
        parse(Path::new("test.brew"), source).unwrap_err()
    }

    #[test]
    fn test_parse_script_with_namespace() {
        let file = parse_ok(
            "namespace Scripts.Intro;\n\
             script Title {\n\
                 let text = \"hello\";\n\
                 fn render(n) = text + \" \" + core.str(n);\n\
             }",
        );
        assert_eq!(file.scripts.len(), 1);
        let script = &file.scripts[0];
        assert_eq!(script.qualified_name, "Scripts.Intro.Title");
        assert_eq!(script.fields.len(), 1);
        assert_eq!(script.methods[0].params, vec!["n".to_string()]);
    }

    #[test]
    fn test_parse_library_functions() {
        let file = parse_ok("fn clamp(x, lo, hi) = if x < lo then lo else if x > hi then hi else x;");
        assert_eq!(file.functions.len(), 1);
        assert_eq!(file.functions[0].params.len(), 3);
        assert!(matches!(file.functions[0].body, Expr::If { .. }));
    }

    #[test]
    fn test_precedence() {
        let file = parse_ok("fn f() = 1 + 2 * 3;");
        let Expr::Binary { op, rhs, .. } = &file.functions[0].body else {
            panic!("expected binary expression");
        };
        assert_eq!(*op, BinaryOp::Add);
        assert!(matches!(**rhs, Expr::Binary { op: BinaryOp::Mul, .. }));
    }

    #[test]
    fn test_script_without_namespace() {
        let file = parse_ok("script Bare { fn one() = 1; }");
        assert_eq!(file.scripts[0].qualified_name, "Bare");
    }

    #[test]
    fn test_missing_semicolon() {
        let err = parse_err("fn f() = 1\nfn g() = 2;");
        assert!(err.message.contains("expected `;` after function body"));
        assert_eq!(err.position, Some(Position::new(2, 1)));
    }

    #[test]
    fn test_duplicate_parameter() {
        let err = parse_err("fn f(a, a) = a;");
        assert!(err.message.contains("duplicate parameter `a`"));
    }

    #[test]
    fn test_module_member_must_be_called() {
        let err = parse_err("fn f() = math.pi;");
        assert!(err.message.contains("module members must be called"));
    }

    #[test]
    fn test_unexpected_top_level() {
        let err = parse_err("let x = 1;");
        assert!(err.message.contains("expected `namespace`, `fn` or `script`"));
    }
}
