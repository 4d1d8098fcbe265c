/*
 * evaluator.rs
 * Copyright (c) 2025 The stencil contributors
 */

//! Execution of compiled programs.
//!
//! The evaluator is the "host execution environment" the compiler hands
//! its program to. Execution has two phases, both at render time:
//!
//! 1. **Structure**: the flat statement sequence is folded into a block
//!    tree using each statement's indentation depth. Headers open a
//!    frame one unit deeper; a shallower statement closes frames;
//!    `elif`/`else` attach to the preceding `if` at the same depth;
//!    frames still open at the end of the program close implicitly.
//!    Marker content is parsed here, so malformed content surfaces as a
//!    `Generation` fault in this phase — never during compilation.
//! 2. **Interpretation**: the tree is walked against the context,
//!    writing to the sink in document order. Failures abort the render;
//!    output already written stays written.

use crate::context::{Context, Value};
use crate::error::{RenderResult, TemplateError};
use crate::expr::{self, Expr, Header, Statement};
use crate::program::{Op, Program, Stmt, OUTPUT_BINDING};
use std::io::Write;

/// A node of the structured program.
#[derive(Debug, Clone, PartialEq)]
enum Node {
    Emit(String),
    EmitExpr(Expr),
    Assign(String, Expr),
    ExprStmt(Expr),
    If {
        branches: Vec<(Expr, Vec<Node>)>,
        else_branch: Option<Vec<Node>>,
    },
    For {
        var: String,
        iter: Expr,
        body: Vec<Node>,
    },
    While {
        cond: Expr,
        body: Vec<Node>,
    },
}

/// Execute a compiled program against a context, writing to the sink.
pub(crate) fn execute(
    program: &Program,
    ctx: &mut Context,
    out: &mut dyn Write,
) -> RenderResult<()> {
    let stmts = program.statements();
    let mut pos = 0;
    let nodes = build_block(stmts, &mut pos, 0)?;
    debug_assert_eq!(pos, stmts.len());
    exec_block(&nodes, ctx, out)
}

/// Fold statements at `depth` into a node list, consuming nested
/// blocks recursively. Returns when a shallower statement (or the end
/// of the program) is reached.
fn build_block(stmts: &[Stmt], pos: &mut usize, depth: usize) -> RenderResult<Vec<Node>> {
    let mut nodes = Vec::new();

    while let Some(stmt) = stmts.get(*pos) {
        if stmt.indent < depth {
            break;
        }
        if stmt.indent > depth {
            return Err(TemplateError::generation(format!(
                "unexpected indentation depth {} (expected {depth})",
                stmt.indent
            )));
        }

        match &stmt.op {
            Op::Emit(text) => {
                *pos += 1;
                nodes.push(Node::Emit(text.clone()));
            }
            Op::EmitExpr(src) => {
                *pos += 1;
                nodes.push(Node::EmitExpr(expr::parse_expression(src)?));
            }
            Op::Exec(src) => {
                *pos += 1;
                match expr::parse_statement(src)? {
                    Some(Statement::Assign(name, value)) => nodes.push(Node::Assign(name, value)),
                    Some(Statement::Expr(e)) => nodes.push(Node::ExprStmt(e)),
                    None => {}
                }
            }
            Op::Header(src) => match expr::parse_header(src)? {
                Header::If(cond) => {
                    *pos += 1;
                    let body = build_block(stmts, pos, depth + 1)?;
                    let mut branches = vec![(cond, body)];
                    let mut else_branch = None;

                    // `elif`/`else` headers at the same depth continue
                    // the conditional.
                    while else_branch.is_none() {
                        match peek_continuation(stmts, *pos, depth)? {
                            Some(Header::Elif(cond)) => {
                                *pos += 1;
                                branches.push((cond, build_block(stmts, pos, depth + 1)?));
                            }
                            Some(Header::Else) => {
                                *pos += 1;
                                else_branch = Some(build_block(stmts, pos, depth + 1)?);
                            }
                            _ => break,
                        }
                    }

                    nodes.push(Node::If {
                        branches,
                        else_branch,
                    });
                }
                Header::For(var, iter) => {
                    *pos += 1;
                    let body = build_block(stmts, pos, depth + 1)?;
                    nodes.push(Node::For { var, iter, body });
                }
                Header::While(cond) => {
                    *pos += 1;
                    let body = build_block(stmts, pos, depth + 1)?;
                    nodes.push(Node::While { cond, body });
                }
                Header::Elif(_) => {
                    return Err(TemplateError::generation(format!(
                        "`{}` without a matching `if`",
                        src.trim()
                    )));
                }
                Header::Else => {
                    return Err(TemplateError::generation(
                        "`else:` without a matching `if`",
                    ));
                }
            },
        }
    }

    Ok(nodes)
}

/// If the statement at `pos` is an `elif`/`else` header at `depth`,
/// return it. Parse errors in a header at this position are reported
/// here rather than deferred.
fn peek_continuation(stmts: &[Stmt], pos: usize, depth: usize) -> RenderResult<Option<Header>> {
    match stmts.get(pos) {
        Some(Stmt {
            indent,
            op: Op::Header(src),
        }) if *indent == depth => match expr::parse_header(src)? {
            header @ (Header::Elif(_) | Header::Else) => Ok(Some(header)),
            _ => Ok(None),
        },
        _ => Ok(None),
    }
}

fn exec_block(nodes: &[Node], ctx: &mut Context, out: &mut dyn Write) -> RenderResult<()> {
    for node in nodes {
        match node {
            Node::Emit(text) => out.write_all(text.as_bytes())?,

            Node::EmitExpr(e) => {
                let value = expr::eval(e, ctx)?;
                out.write_all(value.to_string().as_bytes())?;
            }

            Node::Assign(name, e) => {
                if name == OUTPUT_BINDING {
                    return Err(TemplateError::evaluation(format!(
                        "`{OUTPUT_BINDING}` is reserved for the output sink"
                    )));
                }
                let value = expr::eval(e, ctx)?;
                ctx.insert(name.clone(), value);
            }

            Node::ExprStmt(e) => {
                expr::eval(e, ctx)?;
            }

            Node::If {
                branches,
                else_branch,
            } => {
                let mut taken = false;
                for (cond, body) in branches {
                    if expr::eval(cond, ctx)?.is_truthy() {
                        exec_block(body, ctx, out)?;
                        taken = true;
                        break;
                    }
                }
                if !taken {
                    if let Some(body) = else_branch {
                        exec_block(body, ctx, out)?;
                    }
                }
            }

            Node::For { var, iter, body } => {
                for item in iterate(&expr::eval(iter, ctx)?)? {
                    // The loop variable lives in the render's flat
                    // namespace; it stays bound after the loop.
                    ctx.insert(var.clone(), item);
                    exec_block(body, ctx, out)?;
                }
            }

            Node::While { cond, body } => {
                while expr::eval(cond, ctx)?.is_truthy() {
                    exec_block(body, ctx, out)?;
                }
            }
        }
    }
    Ok(())
}

/// The iteration sequence for a `for` header: list elements, map keys
/// (sorted, for deterministic renders), or string characters.
fn iterate(value: &Value) -> RenderResult<Vec<Value>> {
    match value {
        Value::List(items) => Ok(items.clone()),
        Value::Map(m) => {
            let mut keys: Vec<&String> = m.keys().collect();
            keys.sort();
            Ok(keys
                .into_iter()
                .map(|k| Value::String(k.clone()))
                .collect())
        }
        Value::String(s) => Ok(s.chars().map(|c| Value::String(c.to_string())).collect()),
        other => Err(TemplateError::evaluation(format!(
            "{} is not iterable",
            other.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(stmts: Vec<Stmt>, ctx: &mut Context) -> RenderResult<String> {
        let mut program = Program::new();
        program.extend(stmts);
        let mut out = Vec::new();
        execute(&program, ctx, &mut out)?;
        Ok(String::from_utf8(out).expect("output is utf-8"))
    }

    #[test]
    fn test_emit_and_expression() {
        let mut ctx = Context::new();
        ctx.insert("name", Value::from("Ann"));
        let out = run(
            vec![
                Stmt::new(0, Op::Emit("Hi ".to_string())),
                Stmt::new(0, Op::EmitExpr("name".to_string())),
                Stmt::new(0, Op::Emit("!".to_string())),
            ],
            &mut ctx,
        )
        .unwrap();
        assert_eq!(out, "Hi Ann!");
    }

    #[test]
    fn test_if_elif_else_chain() {
        let stmts = |n: i64| {
            vec![
                Stmt::new(0, Op::Exec(format!("n = {n}"))),
                Stmt::new(0, Op::Header("if n == 1:".to_string())),
                Stmt::new(1, Op::Emit("one".to_string())),
                Stmt::new(0, Op::Header("elif n == 2:".to_string())),
                Stmt::new(1, Op::Emit("two".to_string())),
                Stmt::new(0, Op::Header("else:".to_string())),
                Stmt::new(1, Op::Emit("many".to_string())),
            ]
        };
        assert_eq!(run(stmts(1), &mut Context::new()).unwrap(), "one");
        assert_eq!(run(stmts(2), &mut Context::new()).unwrap(), "two");
        assert_eq!(run(stmts(9), &mut Context::new()).unwrap(), "many");
    }

    #[test]
    fn test_for_loop_binds_and_leaks() {
        let mut ctx = Context::new();
        ctx.insert(
            "items",
            Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)]),
        );
        let out = run(
            vec![
                Stmt::new(0, Op::Header("for x in items:".to_string())),
                Stmt::new(1, Op::EmitExpr("x".to_string())),
            ],
            &mut ctx,
        )
        .unwrap();
        assert_eq!(out, "123");
        // The loop variable stays bound after the loop.
        assert_eq!(ctx.get("x"), Some(&Value::Int(3)));
    }

    #[test]
    fn test_while_loop() {
        let out = run(
            vec![
                Stmt::new(0, Op::Exec("n = 0".to_string())),
                Stmt::new(0, Op::Header("while n < 3:".to_string())),
                Stmt::new(1, Op::EmitExpr("n".to_string())),
                Stmt::new(1, Op::Exec("n = n + 1".to_string())),
            ],
            &mut Context::new(),
        )
        .unwrap();
        assert_eq!(out, "012");
    }

    #[test]
    fn test_map_iteration_is_sorted() {
        let mut m = std::collections::HashMap::new();
        m.insert("b".to_string(), Value::Int(2));
        m.insert("a".to_string(), Value::Int(1));
        m.insert("c".to_string(), Value::Int(3));
        let mut ctx = Context::new();
        ctx.insert("m", Value::Map(m));
        let out = run(
            vec![
                Stmt::new(0, Op::Header("for k in m:".to_string())),
                Stmt::new(1, Op::EmitExpr("k".to_string())),
            ],
            &mut ctx,
        )
        .unwrap();
        assert_eq!(out, "abc");
    }

    #[test]
    fn test_dangling_else_is_generation_fault() {
        let err = run(
            vec![
                Stmt::new(0, Op::Header("else:".to_string())),
                Stmt::new(1, Op::Emit("x".to_string())),
            ],
            &mut Context::new(),
        )
        .unwrap_err();
        assert!(matches!(err, TemplateError::Generation { .. }));
    }

    #[test]
    fn test_bad_header_is_generation_fault() {
        let err = run(
            vec![Stmt::new(0, Op::Header("for in:".to_string()))],
            &mut Context::new(),
        )
        .unwrap_err();
        assert!(matches!(err, TemplateError::Generation { .. }));
    }

    #[test]
    fn test_assign_to_reserved_binding() {
        let err = run(
            vec![Stmt::new(0, Op::Exec("_out = 1".to_string()))],
            &mut Context::new(),
        )
        .unwrap_err();
        assert!(matches!(err, TemplateError::Evaluation { .. }));
    }

    #[test]
    fn test_unclosed_block_closes_implicitly() {
        let mut ctx = Context::new();
        ctx.insert("show", Value::Bool(true));
        let out = run(
            vec![
                Stmt::new(0, Op::Header("if show:".to_string())),
                Stmt::new(1, Op::Emit("yes".to_string())),
            ],
            &mut ctx,
        )
        .unwrap();
        assert_eq!(out, "yes");
    }
}
