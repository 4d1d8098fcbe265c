/*
 * expr.rs
 * Copyright (c) 2025 The stencil contributors
 */

//! The statement and expression grammar for marker content.
//!
//! Marker content is carried through compilation as raw source and only
//! parsed here, when the compiled program is executed. The grammar is
//! deliberately small:
//!
//! - literals: integers, floats, `"…"`/`'…'` strings, `true`, `false`,
//!   `null`, list displays `[a, b]`
//! - variables: identifiers, attribute access `a.b`, indexing `a[i]`
//! - operators, loosest to tightest: `or`, `and`, `not`, comparisons
//!   (`== != < <= > >=`), `+ -`, `* / %`, unary `-`, postfix
//!   call/index/attribute
//! - builtin calls: `len(x)`, `str(x)`, `range(stop)`,
//!   `range(start, stop)`
//!
//! Statements are either an assignment `name = expr` or a bare
//! expression. Block headers are `if expr`, `elif expr`, `else`,
//! `for name in expr`, `while expr` (the trailing `:` is part of the
//! marker shape, not the grammar).
//!
//! Syntax errors are reported as [`Generation`] faults; evaluation
//! failures as [`Evaluation`] errors.
//!
//! [`Generation`]: crate::TemplateError::Generation
//! [`Evaluation`]: crate::TemplateError::Evaluation

use crate::context::{Context, Value};
use crate::error::{RenderResult, TemplateError};
use crate::program::OUTPUT_BINDING;

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),
    True,
    False,
    Null,
    And,
    Or,
    Not,
    In,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    EqEq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Assign,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
}

fn syntax_error(src: &str, message: impl Into<String>) -> TemplateError {
    TemplateError::generation(format!("in `{}`: {}", src.trim(), message.into()))
}

fn lex(src: &str) -> RenderResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = src.char_indices().peekable();

    while let Some(&(pos, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => push_single(&mut chars, &mut tokens, Token::LParen),
            ')' => push_single(&mut chars, &mut tokens, Token::RParen),
            '[' => push_single(&mut chars, &mut tokens, Token::LBracket),
            ']' => push_single(&mut chars, &mut tokens, Token::RBracket),
            ',' => push_single(&mut chars, &mut tokens, Token::Comma),
            '.' => push_single(&mut chars, &mut tokens, Token::Dot),
            '+' => push_single(&mut chars, &mut tokens, Token::Plus),
            '-' => push_single(&mut chars, &mut tokens, Token::Minus),
            '*' => push_single(&mut chars, &mut tokens, Token::Star),
            '/' => push_single(&mut chars, &mut tokens, Token::Slash),
            '%' => push_single(&mut chars, &mut tokens, Token::Percent),
            '=' => {
                chars.next();
                if chars.peek().is_some_and(|&(_, c)| c == '=') {
                    chars.next();
                    tokens.push(Token::EqEq);
                } else {
                    tokens.push(Token::Assign);
                }
            }
            '!' => {
                chars.next();
                if chars.peek().is_some_and(|&(_, c)| c == '=') {
                    chars.next();
                    tokens.push(Token::NotEq);
                } else {
                    return Err(syntax_error(src, "unexpected `!` (use `not`)"));
                }
            }
            '<' => {
                chars.next();
                if chars.peek().is_some_and(|&(_, c)| c == '=') {
                    chars.next();
                    tokens.push(Token::LtEq);
                } else {
                    tokens.push(Token::Lt);
                }
            }
            '>' => {
                chars.next();
                if chars.peek().is_some_and(|&(_, c)| c == '=') {
                    chars.next();
                    tokens.push(Token::GtEq);
                } else {
                    tokens.push(Token::Gt);
                }
            }
            '"' | '\'' => tokens.push(lex_string(src, &mut chars, c)?),
            c if c.is_ascii_digit() => tokens.push(lex_number(src, &mut chars)?),
            c if c.is_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if c.is_alphanumeric() || c == '_' {
                        ident.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(match ident.as_str() {
                    "true" => Token::True,
                    "false" => Token::False,
                    "null" => Token::Null,
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    "in" => Token::In,
                    _ => Token::Ident(ident),
                });
            }
            other => {
                return Err(syntax_error(
                    src,
                    format!("unexpected character `{other}` at offset {pos}"),
                ));
            }
        }
    }

    Ok(tokens)
}

fn push_single(
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
    tokens: &mut Vec<Token>,
    token: Token,
) {
    chars.next();
    tokens.push(token);
}

fn lex_string(
    src: &str,
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
    quote: char,
) -> RenderResult<Token> {
    chars.next(); // opening quote
    let mut text = String::new();
    loop {
        match chars.next() {
            None => return Err(syntax_error(src, "unterminated string literal")),
            Some((_, c)) if c == quote => return Ok(Token::Str(text)),
            Some((_, '\\')) => match chars.next() {
                Some((_, 'n')) => text.push('\n'),
                Some((_, 't')) => text.push('\t'),
                Some((_, 'r')) => text.push('\r'),
                Some((_, c @ ('\\' | '"' | '\''))) => text.push(c),
                Some((_, c)) => {
                    return Err(syntax_error(src, format!("unknown escape `\\{c}`")));
                }
                None => return Err(syntax_error(src, "unterminated string literal")),
            },
            Some((_, c)) => text.push(c),
        }
    }
}

fn lex_number(
    src: &str,
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
) -> RenderResult<Token> {
    let mut digits = String::new();
    let mut is_float = false;
    while let Some(&(_, c)) = chars.peek() {
        if c.is_ascii_digit() {
            digits.push(c);
            chars.next();
        } else if c == '.' && !is_float {
            // Lookahead: `1.x` is attribute access on an integer, which
            // the grammar does not allow, so a dot only continues the
            // number when followed by a digit.
            let mut ahead = chars.clone();
            ahead.next();
            if ahead.peek().is_some_and(|&(_, c)| c.is_ascii_digit()) {
                is_float = true;
                digits.push('.');
                chars.next();
            } else {
                break;
            }
        } else {
            break;
        }
    }

    if is_float {
        digits
            .parse::<f64>()
            .map(Token::Float)
            .map_err(|e| syntax_error(src, format!("bad float literal `{digits}`: {e}")))
    } else {
        digits
            .parse::<i64>()
            .map(Token::Int)
            .map_err(|e| syntax_error(src, format!("bad integer literal `{digits}`: {e}")))
    }
}

// ---------------------------------------------------------------------------
// Syntax trees
// ---------------------------------------------------------------------------

/// A parsed expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    List(Vec<Expr>),
    Var(String),
    Attr(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
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

/// A parsed free-form statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `name = expr`
    Assign(String, Expr),
    /// A bare expression, evaluated and discarded.
    Expr(Expr),
}

/// A parsed block header (trailing `:` already stripped).
#[derive(Debug, Clone, PartialEq)]
pub enum Header {
    If(Expr),
    Elif(Expr),
    Else,
    For(String, Expr),
    While(Expr),
}

/// Parse one expression (the content of an `{{=…}}` marker).
pub fn parse_expression(src: &str) -> RenderResult<Expr> {
    let mut parser = Parser::new(src)?;
    let expr = parser.expression()?;
    parser.expect_end()?;
    Ok(expr)
}

/// Parse one statement line. Blank lines parse to `None`.
pub fn parse_statement(src: &str) -> RenderResult<Option<Statement>> {
    if src.trim().is_empty() {
        return Ok(None);
    }
    let mut parser = Parser::new(src)?;

    // Assignment: exactly `ident = …` (not `==`).
    if let (Some(Token::Ident(name)), Some(Token::Assign)) =
        (parser.tokens.first().cloned(), parser.tokens.get(1))
    {
        parser.pos = 2;
        let expr = parser.expression()?;
        parser.expect_end()?;
        return Ok(Some(Statement::Assign(name, expr)));
    }

    let expr = parser.expression()?;
    parser.expect_end()?;
    Ok(Some(Statement::Expr(expr)))
}

/// Parse a block header. `src` is the marker content including the
/// trailing `:`.
pub fn parse_header(src: &str) -> RenderResult<Header> {
    let body = src
        .trim_end()
        .strip_suffix(':')
        .ok_or_else(|| syntax_error(src, "block header must end with `:`"))?;
    let mut parser = Parser::new(body)?;

    let keyword = match parser.next() {
        Some(Token::Ident(w)) => w,
        _ => return Err(syntax_error(src, "expected `if`, `elif`, `else`, `for` or `while`")),
    };

    let header = match keyword.as_str() {
        "if" => Header::If(parser.expression()?),
        "elif" => Header::Elif(parser.expression()?),
        "else" => Header::Else,
        "while" => Header::While(parser.expression()?),
        "for" => {
            let var = match parser.next() {
                Some(Token::Ident(name)) => name,
                _ => return Err(syntax_error(src, "expected loop variable after `for`")),
            };
            match parser.next() {
                Some(Token::In) => {}
                _ => return Err(syntax_error(src, "expected `in` after loop variable")),
            }
            Header::For(var, parser.expression()?)
        }
        other => {
            return Err(syntax_error(
                src,
                format!("unknown block header `{other}`"),
            ));
        }
    };

    parser.expect_end_with(src)?;
    Ok(header)
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Parser {
    src: String,
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(src: &str) -> RenderResult<Self> {
        Ok(Self {
            src: src.to_string(),
            tokens: lex(src)?,
            pos: 0,
        })
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token) -> RenderResult<()> {
        if self.eat(&token) {
            Ok(())
        } else {
            Err(syntax_error(
                &self.src,
                format!("expected {token:?}, found {:?}", self.peek()),
            ))
        }
    }

    fn expect_end(&self) -> RenderResult<()> {
        self.expect_end_with(&self.src)
    }

    fn expect_end_with(&self, src: &str) -> RenderResult<()> {
        match self.tokens.get(self.pos) {
            None => Ok(()),
            Some(t) => Err(syntax_error(src, format!("unexpected trailing {t:?}"))),
        }
    }

    fn expression(&mut self) -> RenderResult<Expr> {
        self.or_expr()
    }

    fn or_expr(&mut self) -> RenderResult<Expr> {
        let mut left = self.and_expr()?;
        while self.eat(&Token::Or) {
            let right = self.and_expr()?;
            left = Expr::Binary(BinaryOp::Or, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> RenderResult<Expr> {
        let mut left = self.not_expr()?;
        while self.eat(&Token::And) {
            let right = self.not_expr()?;
            left = Expr::Binary(BinaryOp::And, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn not_expr(&mut self) -> RenderResult<Expr> {
        if self.eat(&Token::Not) {
            let inner = self.not_expr()?;
            Ok(Expr::Unary(UnaryOp::Not, Box::new(inner)))
        } else {
            self.comparison()
        }
    }

    fn comparison(&mut self) -> RenderResult<Expr> {
        let left = self.additive()?;
        let op = match self.peek() {
            Some(Token::EqEq) => BinaryOp::Eq,
            Some(Token::NotEq) => BinaryOp::Ne,
            Some(Token::Lt) => BinaryOp::Lt,
            Some(Token::LtEq) => BinaryOp::Le,
            Some(Token::Gt) => BinaryOp::Gt,
            Some(Token::GtEq) => BinaryOp::Ge,
            _ => return Ok(left),
        };
        self.pos += 1;
        let right = self.additive()?;
        Ok(Expr::Binary(op, Box::new(left), Box::new(right)))
    }

    fn additive(&mut self) -> RenderResult<Expr> {
        let mut left = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.multiplicative()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn multiplicative(&mut self) -> RenderResult<Expr> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::Percent) => BinaryOp::Rem,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn unary(&mut self) -> RenderResult<Expr> {
        if self.eat(&Token::Minus) {
            let inner = self.unary()?;
            Ok(Expr::Unary(UnaryOp::Neg, Box::new(inner)))
        } else {
            self.postfix()
        }
    }

    fn postfix(&mut self) -> RenderResult<Expr> {
        let mut expr = self.primary()?;
        loop {
            if self.eat(&Token::Dot) {
                let field = match self.next() {
                    Some(Token::Ident(name)) => name,
                    _ => return Err(syntax_error(&self.src, "expected field name after `.`")),
                };
                expr = Expr::Attr(Box::new(expr), field);
            } else if self.eat(&Token::LBracket) {
                let index = self.expression()?;
                self.expect(Token::RBracket)?;
                expr = Expr::Index(Box::new(expr), Box::new(index));
            } else {
                return Ok(expr);
            }
        }
    }

    fn primary(&mut self) -> RenderResult<Expr> {
        match self.next() {
            Some(Token::Int(n)) => Ok(Expr::Literal(Value::Int(n))),
            Some(Token::Float(n)) => Ok(Expr::Literal(Value::Float(n))),
            Some(Token::Str(s)) => Ok(Expr::Literal(Value::String(s))),
            Some(Token::True) => Ok(Expr::Literal(Value::Bool(true))),
            Some(Token::False) => Ok(Expr::Literal(Value::Bool(false))),
            Some(Token::Null) => Ok(Expr::Literal(Value::Null)),
            Some(Token::Ident(name)) => {
                if self.eat(&Token::LParen) {
                    let mut args = Vec::new();
                    if !self.eat(&Token::RParen) {
                        loop {
                            args.push(self.expression()?);
                            if self.eat(&Token::RParen) {
                                break;
                            }
                            self.expect(Token::Comma)?;
                        }
                    }
                    Ok(Expr::Call(name, args))
                } else {
                    Ok(Expr::Var(name))
                }
            }
            Some(Token::LParen) => {
                let expr = self.expression()?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }
            Some(Token::LBracket) => {
                let mut items = Vec::new();
                if !self.eat(&Token::RBracket) {
                    loop {
                        items.push(self.expression()?);
                        if self.eat(&Token::RBracket) {
                            break;
                        }
                        self.expect(Token::Comma)?;
                    }
                }
                Ok(Expr::List(items))
            }
            other => Err(syntax_error(
                &self.src,
                format!("expected an expression, found {other:?}"),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

fn eval_error(message: impl Into<String>) -> TemplateError {
    TemplateError::evaluation(message)
}

/// Evaluate an expression against the context.
pub fn eval(expr: &Expr, ctx: &Context) -> RenderResult<Value> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),

        Expr::List(items) => {
            let values: RenderResult<Vec<Value>> = items.iter().map(|e| eval(e, ctx)).collect();
            Ok(Value::List(values?))
        }

        Expr::Var(name) => {
            if name == OUTPUT_BINDING {
                return Err(eval_error(format!(
                    "`{OUTPUT_BINDING}` is reserved for the output sink"
                )));
            }
            ctx.get(name)
                .cloned()
                .ok_or_else(|| eval_error(format!("undefined variable `{name}`")))
        }

        Expr::Attr(base, field) => {
            let value = eval(base, ctx)?;
            match value {
                Value::Map(m) => m
                    .get(field)
                    .cloned()
                    .ok_or_else(|| eval_error(format!("no field `{field}`"))),
                other => Err(eval_error(format!(
                    "cannot access field `{field}` on {}",
                    other.type_name()
                ))),
            }
        }

        Expr::Index(base, index) => eval_index(&eval(base, ctx)?, &eval(index, ctx)?),

        Expr::Call(name, args) => {
            let values: RenderResult<Vec<Value>> = args.iter().map(|e| eval(e, ctx)).collect();
            call_builtin(name, &values?)
        }

        Expr::Unary(op, inner) => {
            let value = eval(inner, ctx)?;
            match op {
                UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
                UnaryOp::Neg => match value {
                    Value::Int(n) => checked_int(n.checked_neg()),
                    Value::Float(n) => Ok(Value::Float(-n)),
                    other => Err(eval_error(format!("cannot negate {}", other.type_name()))),
                },
            }
        }

        Expr::Binary(op, left, right) => match op {
            // `and`/`or` short-circuit and yield the deciding operand.
            BinaryOp::And => {
                let l = eval(left, ctx)?;
                if l.is_truthy() { eval(right, ctx) } else { Ok(l) }
            }
            BinaryOp::Or => {
                let l = eval(left, ctx)?;
                if l.is_truthy() { Ok(l) } else { eval(right, ctx) }
            }
            _ => eval_binary(*op, &eval(left, ctx)?, &eval(right, ctx)?),
        },
    }
}

fn eval_index(base: &Value, index: &Value) -> RenderResult<Value> {
    // Negative indices count from the end.
    fn resolve(i: i64, len: i64) -> Option<i64> {
        let at = if i < 0 { i.checked_add(len)? } else { i };
        (0..len).contains(&at).then_some(at)
    }

    match (base, index) {
        (Value::List(items), Value::Int(i)) => {
            let len = items.len() as i64;
            match resolve(*i, len) {
                Some(at) => Ok(items[at as usize].clone()),
                None => Err(eval_error(format!("index {i} out of range (len {len})"))),
            }
        }
        (Value::String(s), Value::Int(i)) => {
            let chars: Vec<char> = s.chars().collect();
            let len = chars.len() as i64;
            match resolve(*i, len) {
                Some(at) => Ok(Value::String(chars[at as usize].to_string())),
                None => Err(eval_error(format!("index {i} out of range (len {len})"))),
            }
        }
        (Value::Map(m), Value::String(key)) => m
            .get(key)
            .cloned()
            .ok_or_else(|| eval_error(format!("no key `{key}`"))),
        (base, index) => Err(eval_error(format!(
            "cannot index {} with {}",
            base.type_name(),
            index.type_name()
        ))),
    }
}

fn call_builtin(name: &str, args: &[Value]) -> RenderResult<Value> {
    match (name, args) {
        ("len", [Value::String(s)]) => Ok(Value::Int(s.chars().count() as i64)),
        ("len", [Value::List(items)]) => Ok(Value::Int(items.len() as i64)),
        ("len", [Value::Map(m)]) => Ok(Value::Int(m.len() as i64)),
        ("len", [other]) => Err(eval_error(format!(
            "len() does not apply to {}",
            other.type_name()
        ))),

        ("str", [value]) => Ok(Value::String(value.to_string())),

        ("range", [Value::Int(stop)]) => Ok(Value::List((0..*stop).map(Value::Int).collect())),
        ("range", [Value::Int(start), Value::Int(stop)]) => {
            Ok(Value::List((*start..*stop).map(Value::Int).collect()))
        }

        ("len" | "str" | "range", _) => {
            Err(eval_error(format!("wrong arguments for {name}()")))
        }
        _ => Err(eval_error(format!("unknown function `{name}`"))),
    }
}

/// Map an overflowed checked i64 operation to an `Evaluation` error.
fn checked_int(result: Option<i64>) -> RenderResult<Value> {
    result
        .map(Value::Int)
        .ok_or_else(|| eval_error("integer overflow"))
}

/// Coerce both operands to f64 when at least one is a float.
fn numeric_pair(left: &Value, right: &Value) -> Option<(f64, f64)> {
    let as_f64 = |v: &Value| match v {
        Value::Int(n) => Some(*n as f64),
        Value::Float(n) => Some(*n),
        _ => None,
    };
    Some((as_f64(left)?, as_f64(right)?))
}

fn eval_binary(op: BinaryOp, left: &Value, right: &Value) -> RenderResult<Value> {
    use BinaryOp::*;

    match op {
        Eq => return Ok(Value::Bool(values_equal(left, right))),
        Ne => return Ok(Value::Bool(!values_equal(left, right))),
        _ => {}
    }

    match (op, left, right) {
        // Integer arithmetic stays integral; division truncates.
        // Overflow (including i64::MIN / -1) is an evaluation error,
        // never a panic.
        (Add, Value::Int(a), Value::Int(b)) => checked_int(a.checked_add(*b)),
        (Sub, Value::Int(a), Value::Int(b)) => checked_int(a.checked_sub(*b)),
        (Mul, Value::Int(a), Value::Int(b)) => checked_int(a.checked_mul(*b)),
        (Div, Value::Int(a), Value::Int(b)) => {
            if *b == 0 {
                Err(eval_error("division by zero"))
            } else {
                checked_int(a.checked_div(*b))
            }
        }
        (Rem, Value::Int(a), Value::Int(b)) => {
            if *b == 0 {
                Err(eval_error("division by zero"))
            } else {
                checked_int(a.checked_rem(*b))
            }
        }

        (Add, Value::String(a), Value::String(b)) => Ok(Value::String(format!("{a}{b}"))),
        (Add, Value::List(a), Value::List(b)) => {
            let mut items = a.clone();
            items.extend(b.iter().cloned());
            Ok(Value::List(items))
        }

        (Lt | Le | Gt | Ge, Value::String(a), Value::String(b)) => {
            Ok(Value::Bool(compare_ordering(op, a.cmp(b))))
        }

        (op, left, right) => match numeric_pair(left, right) {
            Some((a, b)) => match op {
                Add => Ok(Value::Float(a + b)),
                Sub => Ok(Value::Float(a - b)),
                Mul => Ok(Value::Float(a * b)),
                Div => {
                    if b == 0.0 {
                        Err(eval_error("division by zero"))
                    } else {
                        Ok(Value::Float(a / b))
                    }
                }
                Rem => {
                    if b == 0.0 {
                        Err(eval_error("division by zero"))
                    } else {
                        Ok(Value::Float(a % b))
                    }
                }
                Lt => Ok(Value::Bool(a < b)),
                Le => Ok(Value::Bool(a <= b)),
                Gt => Ok(Value::Bool(a > b)),
                Ge => Ok(Value::Bool(a >= b)),
                Eq | Ne | And | Or => unreachable!("handled above"),
            },
            None => Err(eval_error(format!(
                "unsupported operands for {op:?}: {} and {}",
                left.type_name(),
                right.type_name()
            ))),
        },
    }
}

fn compare_ordering(op: BinaryOp, ordering: std::cmp::Ordering) -> bool {
    match op {
        BinaryOp::Lt => ordering.is_lt(),
        BinaryOp::Le => ordering.is_le(),
        BinaryOp::Gt => ordering.is_gt(),
        BinaryOp::Ge => ordering.is_ge(),
        _ => false,
    }
}

/// Structural equality with numeric coercion (`2 == 2.0` holds).
fn values_equal(left: &Value, right: &Value) -> bool {
    if let Some((a, b)) = numeric_pair(left, right) {
        return a == b;
    }
    left == right
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn eval_src(src: &str, ctx: &Context) -> RenderResult<Value> {
        eval(&parse_expression(src)?, ctx)
    }

    fn eval_ok(src: &str) -> Value {
        eval_src(src, &Context::new()).unwrap()
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval_ok("1 + 1"), Value::Int(2));
        assert_eq!(eval_ok("2 * 3 + 4"), Value::Int(10));
        assert_eq!(eval_ok("2 + 3 * 4"), Value::Int(14));
        assert_eq!(eval_ok("(2 + 3) * 4"), Value::Int(20));
        assert_eq!(eval_ok("7 / 2"), Value::Int(3));
        assert_eq!(eval_ok("7 % 2"), Value::Int(1));
        assert_eq!(eval_ok("7.0 / 2"), Value::Float(3.5));
        assert_eq!(eval_ok("-3 + 1"), Value::Int(-2));
    }

    #[test]
    fn test_integer_overflow_is_evaluation_error() {
        let overflowing = [
            "9223372036854775807 + 1",
            "-9223372036854775807 - 2",
            "9223372036854775807 * 2",
            "(-9223372036854775807 - 1) / -1",
            "-(-9223372036854775807 - 1)",
        ];
        for src in overflowing {
            assert!(
                matches!(
                    eval_src(src, &Context::new()),
                    Err(TemplateError::Evaluation { .. })
                ),
                "`{src}` should overflow"
            );
        }
    }

    #[test]
    fn test_string_ops() {
        assert_eq!(
            eval_ok("'foo' + \"bar\""),
            Value::String("foobar".to_string())
        );
        assert_eq!(eval_ok("'a' < 'b'"), Value::Bool(true));
        assert_eq!(eval_ok("len('héllo')"), Value::Int(5));
        assert_eq!(eval_ok("'a\\nb'"), Value::String("a\nb".to_string()));
    }

    #[test]
    fn test_comparisons_and_logic() {
        assert_eq!(eval_ok("1 < 2"), Value::Bool(true));
        assert_eq!(eval_ok("2 <= 2"), Value::Bool(true));
        assert_eq!(eval_ok("1 == 1.0"), Value::Bool(true));
        assert_eq!(eval_ok("1 != 2"), Value::Bool(true));
        assert_eq!(eval_ok("not 0"), Value::Bool(true));
        assert_eq!(eval_ok("1 and 2"), Value::Int(2));
        assert_eq!(eval_ok("0 or 'x'"), Value::String("x".to_string()));
    }

    #[test]
    fn test_short_circuit_skips_rhs() {
        // The undefined variable on the right is never evaluated.
        assert_eq!(eval_ok("0 and missing"), Value::Int(0));
        assert_eq!(eval_ok("1 or missing"), Value::Int(1));
    }

    #[test]
    fn test_variables_and_paths() {
        let mut ctx = Context::new();
        ctx.insert("name", Value::from("Ann"));
        let mut employee = std::collections::HashMap::new();
        employee.insert("salary".to_string(), Value::Int(50_000));
        ctx.insert("employee", Value::Map(employee));

        assert_eq!(eval_src("name", &ctx).unwrap(), Value::from("Ann"));
        assert_eq!(eval_src("employee.salary", &ctx).unwrap(), Value::Int(50_000));
        assert_eq!(
            eval_src("employee['salary']", &ctx).unwrap(),
            Value::Int(50_000)
        );
        assert!(matches!(
            eval_src("missing", &ctx),
            Err(TemplateError::Evaluation { .. })
        ));
    }

    #[test]
    fn test_indexing() {
        let mut ctx = Context::new();
        ctx.insert(
            "xs",
            Value::List(vec![Value::Int(10), Value::Int(20), Value::Int(30)]),
        );
        assert_eq!(eval_src("xs[0]", &ctx).unwrap(), Value::Int(10));
        assert_eq!(eval_src("xs[-1]", &ctx).unwrap(), Value::Int(30));
        assert!(eval_src("xs[3]", &ctx).is_err());
    }

    #[test]
    fn test_builtins() {
        assert_eq!(eval_ok("len([1, 2, 3])"), Value::Int(3));
        assert_eq!(eval_ok("str(42)"), Value::String("42".to_string()));
        assert_eq!(
            eval_ok("range(3)"),
            Value::List(vec![Value::Int(0), Value::Int(1), Value::Int(2)])
        );
        assert_eq!(
            eval_ok("range(1, 3)"),
            Value::List(vec![Value::Int(1), Value::Int(2)])
        );
        assert!(eval_src("nope(1)", &Context::new()).is_err());
    }

    #[test]
    fn test_reserved_output_binding() {
        let mut ctx = Context::new();
        ctx.insert("_out", Value::Int(1));
        // Even a caller-inserted entry is never readable.
        assert!(matches!(
            eval_src("_out", &ctx),
            Err(TemplateError::Evaluation { .. })
        ));
    }

    #[test]
    fn test_syntax_errors_are_generation_faults() {
        assert!(matches!(
            parse_expression("1 +"),
            Err(TemplateError::Generation { .. })
        ));
        assert!(matches!(
            parse_expression("'unterminated"),
            Err(TemplateError::Generation { .. })
        ));
        assert!(matches!(
            parse_expression("1 ~ 2"),
            Err(TemplateError::Generation { .. })
        ));
    }

    #[test]
    fn test_parse_statement() {
        assert_eq!(parse_statement("   ").unwrap(), None);
        assert!(matches!(
            parse_statement("x = 1 + 2").unwrap(),
            Some(Statement::Assign(name, _)) if name == "x"
        ));
        assert!(matches!(
            parse_statement("x == 1").unwrap(),
            Some(Statement::Expr(_))
        ));
    }

    #[test]
    fn test_parse_header() {
        assert!(matches!(parse_header("if x:").unwrap(), Header::If(_)));
        assert!(matches!(parse_header("elif x > 1:").unwrap(), Header::Elif(_)));
        assert_eq!(parse_header("else:").unwrap(), Header::Else);
        assert!(matches!(
            parse_header("for item in items:").unwrap(),
            Header::For(var, _) if var == "item"
        ));
        assert!(matches!(parse_header("while n < 3:").unwrap(), Header::While(_)));
        assert!(parse_header("unless x:").is_err());
        assert!(parse_header("else x:").is_err());
    }
}
