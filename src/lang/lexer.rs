//! Tokenizer for script sources.

use std::path::Path;

use super::diagnostic::{Diagnostic, Position};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Namespace,
    Script,
    Fn,
    Let,
    If,
    Then,
    Else,
    True,
    False,
    And,
    Or,
    Not,
}

impl Keyword {
    fn from_ident(ident: &str) -> Option<Self> {
        Some(match ident {
            "namespace" => Self::Namespace,
            "script" => Self::Script,
            "fn" => Self::Fn,
            "let" => Self::Let,
            "if" => Self::If,
            "then" => Self::Then,
            "else" => Self::Else,
            "true" => Self::True,
            "false" => Self::False,
            "and" => Self::And,
            "or" => Self::Or,
            "not" => Self::Not,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),
    Keyword(Keyword),
    LParen,
    RParen,
    LBrace,
    RBrace,
    Comma,
    Dot,
    Semicolon,
    Assign,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    EqualEqual,
    BangEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Eof,
}

impl TokenKind {
    /// Human readable form used in "expected X, found Y" messages.
    pub fn describe(&self) -> String {
        match self {
            Self::Ident(name) => format!("identifier `{name}`"),
            Self::Int(value) => format!("number `{value}`"),
            Self::Float(value) => format!("number `{value}`"),
            Self::Str(_) => "string literal".to_string(),
            Self::Keyword(keyword) => format!("keyword `{}`", format!("{keyword:?}").to_lowercase()),
            Self::Eof => "end of file".to_string(),
            other => format!("`{}`", other.symbol()),
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            Self::LParen => "(",
            Self::RParen => ")",
            Self::LBrace => "{",
            Self::RBrace => "}",
            Self::Comma => ",",
            Self::Dot => ".",
            Self::Semicolon => ";",
            Self::Assign => "=",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Star => "*",
            Self::Slash => "/",
            Self::Percent => "%",
            Self::EqualEqual => "==",
            Self::BangEqual => "!=",
            Self::Less => "<",
            Self::LessEqual => "<=",
            Self::Greater => ">",
            Self::GreaterEqual => ">=",
            _ => "?",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub position: Position,
}

/// Split `source` into tokens. The last token is always `Eof`.
pub fn tokenize(path: &Path, source: &str) -> Result<Vec<Token>, Diagnostic> {
    Lexer::new(path, source).run()
}

struct Lexer<'a> {
    path: &'a Path,
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: u32,
    column: u32,
}

impl<'a> Lexer<'a> {
    fn new(path: &'a Path, source: &'a str) -> Self {
        Self {
            path,
            chars: source.chars().peekable(),
            line: 1,
            column: 1,
        }
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.chars.next()?;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn match_next(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn error(&self, position: Position, message: impl Into<String>) -> Diagnostic {
        Diagnostic::at(self.path, position, message)
    }

    fn run(mut self) -> Result<Vec<Token>, Diagnostic> {
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia();
            let position = Position::new(self.line, self.column);
            let Some(ch) = self.bump() else {
                tokens.push(Token {
                    kind: TokenKind::Eof,
                    position,
                });
                return Ok(tokens);
            };

            let kind = match ch {
                '(' => TokenKind::LParen,
                ')' => TokenKind::RParen,
                '{' => TokenKind::LBrace,
                '}' => TokenKind::RBrace,
                ',' => TokenKind::Comma,
                '.' => TokenKind::Dot,
                ';' => TokenKind::Semicolon,
                '+' => TokenKind::Plus,
                '-' => TokenKind::Minus,
                '*' => TokenKind::Star,
                '/' => TokenKind::Slash,
                '%' => TokenKind::Percent,
                '=' if self.match_next('=') => TokenKind::EqualEqual,
                '=' => TokenKind::Assign,
                '!' if self.match_next('=') => TokenKind::BangEqual,
                '<' if self.match_next('=') => TokenKind::LessEqual,
                '<' => TokenKind::Less,
                '>' if self.match_next('=') => TokenKind::GreaterEqual,
                '>' => TokenKind::Greater,
                '"' => self.string(position)?,
                c if c.is_ascii_digit() => self.number(c, position)?,
                c if c.is_alphabetic() || c == '_' => self.ident(c),
                other => {
                    return Err(self.error(position, format!("unexpected character `{other}`")));
                }
            };
            tokens.push(Token { kind, position });
        }
    }

    /// Skip whitespace and `//` comments.
    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('/') => {
                    let mut lookahead = self.chars.clone();
                    lookahead.next();
                    if lookahead.next() != Some('/') {
                        return;
                    }
                    while let Some(c) = self.bump() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                _ => return,
            }
        }
    }

    fn string(&mut self, start: Position) -> Result<TokenKind, Diagnostic> {
        let mut text = String::new();
        loop {
            match self.bump() {
                None | Some('\n') => {
                    return Err(self.error(start, "unterminated string literal"));
                }
                Some('"') => return Ok(TokenKind::Str(text)),
                Some('\\') => {
                    let escaped = match self.bump() {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('"') => '"',
                        Some('\\') => '\\',
                        Some(other) => {
                            return Err(self.error(start, format!("unknown escape `\\{other}`")));
                        }
                        None => return Err(self.error(start, "unterminated string literal")),
                    };
                    text.push(escaped);
                }
                Some(c) => text.push(c),
            }
        }
    }

    fn number(&mut self, first: char, start: Position) -> Result<TokenKind, Diagnostic> {
        let mut text = String::from(first);
        let mut is_float = false;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || c == '_' {
                text.push(c);
                self.bump();
            } else if c == '.' && !is_float {
                // `1.` followed by a digit is a float; otherwise the dot belongs to the caller
                let mut lookahead = self.chars.clone();
                lookahead.next();
                if !matches!(lookahead.next(), Some(d) if d.is_ascii_digit()) {
                    break;
                }
                is_float = true;
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }

        let text = text.replace('_', "");
        if is_float {
            text.parse()
                .map(TokenKind::Float)
                .map_err(|_| self.error(start, format!("invalid number `{text}`")))
        } else {
            text.parse()
                .map(TokenKind::Int)
                .map_err(|_| self.error(start, format!("integer `{text}` out of range")))
        }
    }

    fn ident(&mut self, first: char) -> TokenKind {
        let mut text = String::from(first);
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }
        match Keyword::from_ident(&text) {
            Some(keyword) => TokenKind::Keyword(keyword),
            None => TokenKind::Ident(text),
        }
    }
}
