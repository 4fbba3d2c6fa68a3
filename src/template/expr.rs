//! Expression parsing
//!
//! Expressions appear inside output tags and block openers. The grammar is
//! small: literals, dotted paths, helper calls (`name(a, b)` or `name a b`),
//! parenthesised sub-expressions and the usual infix operators.

use super::value::Value;

/// How a path is anchored
#[derive(Debug, Clone, PartialEq)]
pub enum PathScope {
    /// `name.rest`: looked up in `this`, then the root data, then globals
    Implicit,
    /// `this` / `this.rest`
    This,
    /// `@root.rest`
    Root,
    /// `@index`, `@first`, `@last`
    Data(String),
}

/// A variable reference such as `../this.address.city`
#[derive(Debug, Clone, PartialEq)]
pub struct PathExpr {
    /// Number of leading `../`
    pub depth: usize,
    pub scope: PathScope,
    pub segments: Vec<String>,
}

impl PathExpr {
    /// Name usable as a zero-argument helper call, if the path is a bare identifier
    pub fn bare_name(&self) -> Option<&str> {
        if self.depth == 0 && self.scope == PathScope::Implicit && self.segments.len() == 1 {
            Some(&self.segments[0])
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    StrictEq,
    Ne,
    StrictNe,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

/// Parsed expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Path(PathExpr),
    Call { name: String, args: Vec<Expr> },
    Unary { op: UnaryOp, operand: Box<Expr> },
    Binary { op: BinaryOp, left: Box<Expr>, right: Box<Expr> },
}

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Ident(String),
    Str(String),
    Num(f64),
    /// `attached` is true when the paren directly follows the previous token
    LParen { attached: bool },
    RParen,
    Comma,
    Op(&'static str),
}

const OPERATORS: [&str; 16] = [
    "===", "!==", "==", "!=", ">=", "<=", "&&", "||", ">", "<", "!", "+", "-", "*", "/", "%",
];

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '@' || c == '$'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '.' || c == '$' || c == '@'
}

fn tokenize(src: &str) -> Result<Vec<Tok>, String> {
    let chars: Vec<char> = src.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;
    let mut prev_end = usize::MAX;

    while pos < chars.len() {
        let c = chars[pos];
        if c.is_whitespace() {
            pos += 1;
            continue;
        }
        let start = pos;

        if c == '"' || c == '\'' {
            pos += 1;
            let mut s = String::new();
            let mut closed = false;
            while pos < chars.len() {
                let ch = chars[pos];
                if ch == '\\' && pos + 1 < chars.len() {
                    s.push(chars[pos + 1]);
                    pos += 2;
                    continue;
                }
                pos += 1;
                if ch == c {
                    closed = true;
                    break;
                }
                s.push(ch);
            }
            if !closed {
                return Err("Unterminated string literal".to_string());
            }
            tokens.push(Tok::Str(s));
        } else if c.is_ascii_digit()
            || (c == '.' && chars.get(pos + 1).is_some_and(|n| n.is_ascii_digit()))
        {
            while pos < chars.len() && (chars[pos].is_ascii_digit() || chars[pos] == '.') {
                pos += 1;
            }
            let text: String = chars[start..pos].iter().collect();
            let n = text
                .parse::<f64>()
                .map_err(|_| format!("Invalid number `{}`", text))?;
            tokens.push(Tok::Num(n));
        } else if c == '.' && chars.get(pos + 1) == Some(&'.') && chars.get(pos + 2) == Some(&'/') {
            // parent scope prefix, possibly repeated
            while chars.get(pos) == Some(&'.')
                && chars.get(pos + 1) == Some(&'.')
                && chars.get(pos + 2) == Some(&'/')
            {
                pos += 3;
            }
            while pos < chars.len() && is_ident_char(chars[pos]) {
                pos += 1;
            }
            tokens.push(Tok::Ident(chars[start..pos].iter().collect()));
        } else if is_ident_start(c) {
            while pos < chars.len() && is_ident_char(chars[pos]) {
                pos += 1;
            }
            tokens.push(Tok::Ident(chars[start..pos].iter().collect()));
        } else if c == '(' {
            pos += 1;
            tokens.push(Tok::LParen {
                attached: prev_end == start,
            });
        } else if c == ')' {
            pos += 1;
            tokens.push(Tok::RParen);
        } else if c == ',' {
            pos += 1;
            tokens.push(Tok::Comma);
        } else {
            let rest: String = chars[pos..chars.len().min(pos + 3)].iter().collect();
            let op = OPERATORS
                .iter()
                .find(|op| rest.starts_with(**op))
                .ok_or_else(|| format!("Unexpected character `{}`", c))?;
            pos += op.len();
            tokens.push(Tok::Op(*op));
        }
        prev_end = pos;
    }

    Ok(tokens)
}

fn parse_path(text: &str) -> Result<PathExpr, String> {
    let mut rest = text;
    let mut depth = 0;
    while let Some(r) = rest.strip_prefix("../") {
        depth += 1;
        rest = r;
    }
    let mut parts = rest.split('.');
    let head = parts.next().unwrap_or_default();
    let tail: Vec<String> = parts.map(str::to_string).collect();
    if tail.iter().any(|p| p.is_empty()) {
        return Err(format!("Invalid path `{}`", text));
    }

    let (scope, segments) = match head {
        "this" | "" => (PathScope::This, tail),
        "@root" => (PathScope::Root, tail),
        data if data.starts_with('@') => {
            if !tail.is_empty() {
                return Err(format!("Invalid path `{}`", text));
            }
            (PathScope::Data(data[1..].to_string()), tail)
        }
        name => {
            let mut segments = vec![name.to_string()];
            segments.extend(tail);
            (PathScope::Implicit, segments)
        }
    };

    Ok(PathExpr {
        depth,
        scope,
        segments,
    })
}

/// Parse an expression from source text
pub fn parse_expression(src: &str) -> Result<Expr, String> {
    let tokens = tokenize(src)?;
    if tokens.is_empty() {
        return Err("Empty expression".to_string());
    }
    let mut parser = ExprParser { tokens, pos: 0 };
    let expr = parser.parse_or()?;
    if parser.pos < parser.tokens.len() {
        return Err(format!(
            "Unexpected token {:?} in `{}`",
            parser.tokens[parser.pos], src
        ));
    }
    Ok(expr)
}

struct ExprParser {
    tokens: Vec<Tok>,
    pos: usize,
}

impl ExprParser {
    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos)
    }

    fn eat_op(&mut self, ops: &[&str]) -> Option<&'static str> {
        if let Some(Tok::Op(op)) = self.peek() {
            if ops.contains(op) {
                let op = *op;
                self.pos += 1;
                return Some(op);
            }
        }
        None
    }

    fn binary(
        &mut self,
        ops: &[&str],
        next: fn(&mut Self) -> Result<Expr, String>,
    ) -> Result<Expr, String> {
        let mut left = next(self)?;
        while let Some(op) = self.eat_op(ops) {
            let right = next(self)?;
            let op = match op {
                "||" => BinaryOp::Or,
                "&&" => BinaryOp::And,
                "==" => BinaryOp::Eq,
                "===" => BinaryOp::StrictEq,
                "!=" => BinaryOp::Ne,
                "!==" => BinaryOp::StrictNe,
                "<" => BinaryOp::Lt,
                "<=" => BinaryOp::Le,
                ">" => BinaryOp::Gt,
                ">=" => BinaryOp::Ge,
                "+" => BinaryOp::Add,
                "-" => BinaryOp::Sub,
                "*" => BinaryOp::Mul,
                "/" => BinaryOp::Div,
                _ => BinaryOp::Rem,
            };
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_or(&mut self) -> Result<Expr, String> {
        self.binary(&["||"], Self::parse_and)
    }

    fn parse_and(&mut self) -> Result<Expr, String> {
        self.binary(&["&&"], Self::parse_equality)
    }

    fn parse_equality(&mut self) -> Result<Expr, String> {
        self.binary(&["===", "!==", "==", "!="], Self::parse_comparison)
    }

    fn parse_comparison(&mut self) -> Result<Expr, String> {
        self.binary(&["<", "<=", ">", ">="], Self::parse_additive)
    }

    fn parse_additive(&mut self) -> Result<Expr, String> {
        self.binary(&["+", "-"], Self::parse_multiplicative)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, String> {
        self.binary(&["*", "/", "%"], Self::parse_unary)
    }

    fn parse_unary(&mut self) -> Result<Expr, String> {
        if let Some(op) = self.eat_op(&["!", "-"]) {
            let operand = self.parse_unary()?;
            let op = if op == "!" { UnaryOp::Not } else { UnaryOp::Neg };
            return Ok(Expr::Unary {
                op,
                operand: Box::new(operand),
            });
        }
        self.parse_application()
    }

    /// A primary, or `helper arg arg ...` when the primary is a bare name
    fn parse_application(&mut self) -> Result<Expr, String> {
        let head = self.parse_primary()?;
        let name = match &head {
            Expr::Path(path) => match path.bare_name() {
                Some(name) => name.to_string(),
                None => return Ok(head),
            },
            _ => return Ok(head),
        };

        let mut args = Vec::new();
        while self.starts_argument() {
            args.push(self.parse_argument()?);
        }
        if args.is_empty() {
            Ok(head)
        } else {
            Ok(Expr::Call { name, args })
        }
    }

    fn starts_argument(&self) -> bool {
        matches!(
            self.peek(),
            Some(Tok::Ident(_)) | Some(Tok::Str(_)) | Some(Tok::Num(_)) | Some(Tok::LParen { .. })
        )
    }

    fn parse_argument(&mut self) -> Result<Expr, String> {
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, String> {
        let tok = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or_else(|| "Unexpected end of expression".to_string())?;
        self.pos += 1;

        match tok {
            Tok::Str(s) => Ok(Expr::Literal(Value::String(s))),
            Tok::Num(n) => Ok(Expr::Literal(Value::Number(n))),
            Tok::Ident(name) => {
                if let Some(Tok::LParen { attached: true }) = self.peek() {
                    self.pos += 1;
                    let args = self.parse_call_args()?;
                    return Ok(Expr::Call { name, args });
                }
                match name.as_str() {
                    "true" => Ok(Expr::Literal(Value::Bool(true))),
                    "false" => Ok(Expr::Literal(Value::Bool(false))),
                    "null" => Ok(Expr::Literal(Value::Null)),
                    "undefined" => Ok(Expr::Literal(Value::Undefined)),
                    _ => Ok(Expr::Path(parse_path(&name)?)),
                }
            }
            Tok::LParen { .. } => {
                let inner = self.parse_or()?;
                match self.peek() {
                    Some(Tok::RParen) => {
                        self.pos += 1;
                        Ok(inner)
                    }
                    _ => Err("Missing `)`".to_string()),
                }
            }
            other => Err(format!("Unexpected token {:?}", other)),
        }
    }

    /// Arguments of `name(...)`, separated by commas or whitespace
    fn parse_call_args(&mut self) -> Result<Vec<Expr>, String> {
        let mut args = Vec::new();
        loop {
            match self.peek() {
                Some(Tok::RParen) => {
                    self.pos += 1;
                    return Ok(args);
                }
                Some(Tok::Comma) => {
                    self.pos += 1;
                }
                Some(_) => args.push(self.parse_or()?),
                None => return Err("Missing `)` after helper arguments".to_string()),
            }
        }
    }
}
