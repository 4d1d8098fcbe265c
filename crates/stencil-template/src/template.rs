/*
 * template.rs
 * Copyright (c) 2025 The stencil contributors
 */

//! The compiler driver and the public render entry points.

use crate::context::Context;
use crate::delimiters::{Delimiters, DEFAULT_DELIMITERS};
use crate::error::RenderResult;
use crate::evaluator;
use crate::marker::{Literal, Marker};
use crate::program::Program;
use std::io::{Read, Write};

/// A compiled template ready for rendering.
#[derive(Debug, Clone)]
pub struct Template {
    program: Program,
}

impl Template {
    /// Compile a template with the default `{{ }}` delimiters.
    pub fn compile(source: &str) -> RenderResult<Self> {
        Self::compile_with_delimiters(source, DEFAULT_DELIMITERS)
    }

    /// Compile a template with a `"START STOP"` delimiter configuration.
    pub fn compile_with_delimiters(source: &str, config: &str) -> RenderResult<Self> {
        let delimiters = Delimiters::new(config)?;
        Ok(Self::compile_with(source, &delimiters))
    }

    /// Compile a template with an already-built delimiter set.
    ///
    /// The source splits into alternating literal/marker spans; each
    /// span is classified in document order while the indentation
    /// counter and the trim-next-literal flag are threaded left to
    /// right. Compilation itself cannot fail: marker content is only
    /// syntax-checked when the program runs.
    pub fn compile_with(source: &str, delimiters: &Delimiters) -> Self {
        let mut program = Program::new();
        let mut indent = 0usize;
        let mut trim_next = false;
        let mut cursor = 0usize;

        for span in delimiters.pattern().find_iter(source) {
            let raw = &source[cursor..span.start()];
            if !raw.is_empty() {
                program.extend(Literal::new(raw, indent, trim_next).statements());
            }

            let (marker, next) = Marker::classify(delimiters.inner(span.as_str()), indent);
            program.extend(marker.statements());
            indent = next;
            trim_next = marker.trim_newline;

            cursor = span.end();
        }

        let tail = &source[cursor..];
        if !tail.is_empty() {
            program.extend(Literal::new(tail, indent, trim_next).statements());
        }

        tracing::debug!(
            statements = program.len(),
            start = delimiters.start(),
            stop = delimiters.stop(),
            "compiled template"
        );
        Template { program }
    }

    /// The generated program.
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Render this template, writing substituted output to the sink.
    ///
    /// Statements the template author writes may mutate the context;
    /// that is intentional and the mutations remain visible to the
    /// caller. On error, output already written to the sink is not
    /// rolled back.
    pub fn render(&self, context: &mut Context, out: &mut dyn Write) -> RenderResult<()> {
        evaluator::execute(&self.program, context, out)
    }
}

/// Render a template from a readable source to a writable sink.
///
/// The whole template is read into memory before tokenization begins;
/// there is no streaming mode. `delimiters` is an optional
/// `"START STOP"` configuration (default `"{{ }}"`).
pub fn render(
    input: &mut dyn Read,
    out: &mut dyn Write,
    context: &mut Context,
    delimiters: Option<&str>,
) -> RenderResult<()> {
    let mut source = String::new();
    input.read_to_string(&mut source)?;

    let template = match delimiters {
        Some(config) => Template::compile_with_delimiters(&source, config)?,
        None => Template::compile(&source)?,
    };
    template.render(context, out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::{Op, Stmt};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_plain_text_compiles_to_one_emit() {
        let template = Template::compile("no markers here\n").unwrap();
        assert_eq!(
            template.program().statements(),
            &[Stmt::new(0, Op::Emit("no markers here\n".to_string()))]
        );
    }

    #[test]
    fn test_alternating_spans_thread_indentation() {
        let template = Template::compile("{{for x in xs:}}\n{{=x}}\n{{pass}}\ntail").unwrap();
        assert_eq!(
            template.program().statements(),
            &[
                Stmt::new(0, Op::Header("for x in xs:".to_string())),
                Stmt::new(1, Op::EmitExpr("x".to_string())),
                // Newline after the expression is preserved; the one
                // after `pass` is trimmed.
                Stmt::new(1, Op::Emit("\n".to_string())),
                Stmt::new(0, Op::Emit("tail".to_string())),
            ]
        );
    }

    #[test]
    fn test_adjacent_markers_produce_no_empty_literals() {
        let template = Template::compile("{{=a}}{{=b}}").unwrap();
        assert_eq!(
            template.program().statements(),
            &[
                Stmt::new(0, Op::EmitExpr("a".to_string())),
                Stmt::new(0, Op::EmitExpr("b".to_string())),
            ]
        );
    }

    #[test]
    fn test_render_reader_to_writer() {
        let mut ctx = Context::new();
        ctx.insert("name", crate::Value::from("Ann"));
        let mut input = "Hi {{=name}}!".as_bytes();
        let mut out = Vec::new();
        render(&mut input, &mut out, &mut ctx, None).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Hi Ann!");
    }

    #[test]
    fn test_malformed_marker_content_compiles() {
        // Syntax checking is deferred to render time.
        let template = Template::compile("{{=1 +}}").unwrap();
        let mut out = Vec::new();
        let err = template.render(&mut Context::new(), &mut out).unwrap_err();
        assert!(matches!(err, crate::TemplateError::Generation { .. }));
    }
}
