/*
 * marker.rs
 * Copyright (c) 2025 The stencil contributors
 */

//! Marker classification and literal text runs.
//!
//! A template splits into an alternating sequence of markers (delimited
//! control/expression spans) and literals (everything else). Each unit
//! carries the indentation depth in effect at its position; the depth
//! counter is threaded through classification left to right and never
//! revisited.

use crate::program::{Op, Stmt};
use once_cell::sync::Lazy;
use regex::Regex;

/// Matches one leading line terminator of a literal run.
static RE_FIRST_EOL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\r\n|\n|\r+)").unwrap());

/// Splits multi-line statement content into lines.
static RE_EOL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\r\n|\n|\r+").unwrap());

/// The syntactic shape of a marker's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    /// `{{=EXPR}}` — inline value substitution.
    Expression,
    /// `{{HEADER:}}` — opens a nested block.
    BlockOpen,
    /// `{{pass}}` — closes the most recently opened block.
    BlockClose,
    /// `{{STATEMENT}}` — a free-form statement.
    Statement,
}

/// One classified control/expression unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    /// Marker content with delimiters stripped and shape prefixes
    /// removed (`=` for expressions; cleared for `pass`).
    pub content: String,
    /// Indentation depth at which this marker's statements are emitted.
    pub indent: usize,
    /// The marker's shape.
    pub kind: MarkerKind,
    /// Whether the literal immediately following this marker should
    /// have its leading line terminator stripped. Expression markers
    /// are commonly used mid-line, so they never consume the newline.
    pub trim_newline: bool,
}

impl Marker {
    /// Classify raw marker content (delimiters already stripped) at the
    /// given indentation depth. Returns the marker together with the
    /// depth in effect after it.
    ///
    /// The depth is clamped at zero: an unbalanced `pass` is absorbed
    /// silently rather than raised.
    pub fn classify(content: &str, indent: usize) -> (Self, usize) {
        let (kind, content, delta, trim_newline) = if let Some(expr) = content.strip_prefix('=') {
            (MarkerKind::Expression, expr.to_string(), 0, false)
        } else if content.ends_with(':') {
            (MarkerKind::BlockOpen, content.to_string(), 1, true)
        } else if content == "pass" {
            (MarkerKind::BlockClose, String::new(), -1, true)
        } else {
            (MarkerKind::Statement, content.to_string(), 0, true)
        };

        let next = indent.saturating_add_signed(delta);
        let marker = Marker {
            content,
            indent,
            kind,
            trim_newline,
        };
        (marker, next)
    }

    /// Generated statements for this marker.
    ///
    /// Multi-line statement content yields one statement per line at
    /// the same depth; block closers yield nothing (their sole effect
    /// is the depth decrement already applied during classification).
    pub fn statements(&self) -> Vec<Stmt> {
        match self.kind {
            MarkerKind::Expression => {
                vec![Stmt::new(self.indent, Op::EmitExpr(self.content.clone()))]
            }
            MarkerKind::BlockOpen => {
                vec![Stmt::new(self.indent, Op::Header(self.content.clone()))]
            }
            MarkerKind::BlockClose => Vec::new(),
            MarkerKind::Statement => RE_EOL
                .split(&self.content)
                .map(|line| Stmt::new(self.indent, Op::Exec(line.to_string())))
                .collect(),
        }
    }
}

/// One run of template text outside markers.
#[derive(Debug, Clone, PartialEq)]
pub struct Literal {
    /// The text, leading-terminator trim already applied.
    pub text: String,
    /// Indentation depth at this point in the sequence.
    pub indent: usize,
}

impl Literal {
    /// Wrap a raw text run. When `trim_leading` is set (the preceding
    /// marker consumed its trailing newline), exactly one leading line
    /// terminator (`\n`, `\r\n`, or a run of `\r`) is stripped.
    pub fn new(raw: &str, indent: usize, trim_leading: bool) -> Self {
        let text = if trim_leading {
            RE_FIRST_EOL.replace(raw, "").into_owned()
        } else {
            raw.to_string()
        };
        Self { text, indent }
    }

    /// Generated statements for this literal; empty text yields none.
    pub fn statements(&self) -> Vec<Stmt> {
        if self.text.is_empty() {
            Vec::new()
        } else {
            vec![Stmt::new(self.indent, Op::Emit(self.text.clone()))]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_expression_marker() {
        let (marker, next) = Marker::classify("=name", 2);
        assert_eq!(marker.kind, MarkerKind::Expression);
        assert_eq!(marker.content, "name");
        assert_eq!(marker.indent, 2);
        assert!(!marker.trim_newline);
        assert_eq!(next, 2);
    }

    #[test]
    fn test_block_open_keeps_colon() {
        let (marker, next) = Marker::classify("for x in items:", 0);
        assert_eq!(marker.kind, MarkerKind::BlockOpen);
        assert_eq!(marker.content, "for x in items:");
        assert!(marker.trim_newline);
        assert_eq!(next, 1);
    }

    #[test]
    fn test_block_close_clears_content() {
        let (marker, next) = Marker::classify("pass", 3);
        assert_eq!(marker.kind, MarkerKind::BlockClose);
        assert_eq!(marker.content, "");
        assert_eq!(next, 2);
        assert!(marker.statements().is_empty());
    }

    #[test]
    fn test_block_close_clamps_at_zero() {
        let (_, next) = Marker::classify("pass", 0);
        assert_eq!(next, 0);
    }

    #[test]
    fn test_statement_marker() {
        let (marker, next) = Marker::classify("x = 1", 1);
        assert_eq!(marker.kind, MarkerKind::Statement);
        assert_eq!(marker.content, "x = 1");
        assert!(marker.trim_newline);
        assert_eq!(next, 1);
    }

    #[test]
    fn test_multiline_statement_splits_per_line() {
        let (marker, _) = Marker::classify("a = 1\nb = 2\r\nc = 3", 1);
        let stmts = marker.statements();
        assert_eq!(
            stmts,
            vec![
                Stmt::new(1, Op::Exec("a = 1".to_string())),
                Stmt::new(1, Op::Exec("b = 2".to_string())),
                Stmt::new(1, Op::Exec("c = 3".to_string())),
            ]
        );
    }

    #[test]
    fn test_literal_trims_one_leading_newline() {
        assert_eq!(Literal::new("\nhello\n", 0, true).text, "hello\n");
        assert_eq!(Literal::new("\r\nhello", 0, true).text, "hello");
        assert_eq!(Literal::new("\r\rhello", 0, true).text, "hello");
        assert_eq!(Literal::new("\n\nhello", 0, true).text, "\nhello");
    }

    #[test]
    fn test_literal_untrimmed() {
        assert_eq!(Literal::new("\nhello", 0, false).text, "\nhello");
    }

    #[test]
    fn test_empty_literal_generates_nothing() {
        assert!(Literal::new("\n", 0, true).statements().is_empty());
        assert!(Literal::new("", 0, false).statements().is_empty());
    }
}
