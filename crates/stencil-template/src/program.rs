/*
 * program.rs
 * Copyright (c) 2025 The stencil contributors
 */

//! Compiled program representation.
//!
//! Compilation turns a template into a flat, ordered sequence of
//! statements, each carrying the indentation depth at which it was
//! generated. The statement kinds form a closed set so that evaluation
//! can match on them exhaustively.
//!
//! A program can be listed as text ([`Program`] implements `Display`):
//! one line per statement, prefixed with four spaces per indentation
//! unit. The listing is a faithful picture of block structure and is
//! what `stencil compile` prints.

use std::fmt;

/// Line terminator used when listing generated statements.
pub const EOL: &str = "\n";

/// Reserved context name for the output sink binding. The evaluator
/// resolves it itself; caller-supplied entries under this name are
/// never read.
pub const OUTPUT_BINDING: &str = "_out";

/// One indentation unit in program listings.
const INDENT_UNIT: &str = "    ";

/// A generated operation.
///
/// Marker and statement content is carried as raw source text and only
/// parsed when the program is executed, so malformed content surfaces
/// as a render-time [`Generation`](crate::TemplateError::Generation)
/// error rather than a compile-time one.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    /// Write literal text to the output sink verbatim.
    Emit(String),

    /// Evaluate an expression, stringify the result, write it.
    EmitExpr(String),

    /// A block-header line (trailing `:` included), e.g. `for x in xs:`.
    Header(String),

    /// One free-form statement line, e.g. `total = total + 1`.
    Exec(String),
}

/// One generated statement at a given indentation depth.
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    /// Indentation depth in nesting units.
    pub indent: usize,
    /// The operation.
    pub op: Op,
}

impl Stmt {
    pub fn new(indent: usize, op: Op) -> Self {
        Self { indent, op }
    }

    /// Listing form of this statement, without indentation.
    fn listing(&self) -> String {
        match &self.op {
            Op::Emit(text) => format!("{OUTPUT_BINDING}.write({text:?})"),
            Op::EmitExpr(src) => format!("{OUTPUT_BINDING}.write(str({src}))"),
            Op::Header(src) => src.clone(),
            Op::Exec(src) => src.clone(),
        }
    }
}

/// An ordered sequence of generated statements.
///
/// Rebuilt on every compilation; no persistent identity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    stmts: Vec<Stmt>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, stmt: Stmt) {
        self.stmts.push(stmt);
    }

    pub fn extend(&mut self, stmts: impl IntoIterator<Item = Stmt>) {
        self.stmts.extend(stmts);
    }

    /// The generated statements in document order.
    pub fn statements(&self) -> &[Stmt] {
        &self.stmts
    }

    pub fn len(&self) -> usize {
        self.stmts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stmts.is_empty()
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for stmt in &self.stmts {
            write!(
                f,
                "{}{}{}",
                INDENT_UNIT.repeat(stmt.indent),
                stmt.listing(),
                EOL
            )?;
        }
        Ok(())
    }
}
