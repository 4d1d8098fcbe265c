/*
 * lib.rs
 * Copyright (c) 2025 The stencil contributors
 */

//! Minimal procedural template engine.
//!
//! A template is plain text with embedded markers (default delimiters
//! `{{ }}`, configurable per render):
//!
//! - `{{=EXPR}}` — substitutes the stringified value of `EXPR` inline;
//!   does not consume a trailing newline
//! - `{{STATEMENT}}` — runs `STATEMENT` (e.g. `total = total + 1`);
//!   consumes one trailing newline; multi-line content runs one
//!   statement per line
//! - `{{HEADER:}}` — opens a nested block (`if`, `elif`, `else`, `for`,
//!   `while`); consumes one trailing newline
//! - `{{pass}}` — closes the most recently opened block; emits nothing
//! - anything outside markers is literal output
//!
//! Compilation splits the template into markers and literals, classifies
//! each marker by shape while threading an indentation counter across
//! the sequence, and assembles a flat [`Program`] of generated
//! statements. Rendering executes that program against a mutable
//! [`Context`], writing to an output sink in document order. Marker
//! content is only parsed at render time, so malformed content is a
//! render-time [`TemplateError::Generation`] fault.
//!
//! # Example
//!
//! ```
//! use stencil_template::{Context, Template, Value};
//!
//! let template = Template::compile(
//!     "{{for item in items:}}\n- {{=item}}\n{{pass}}\n",
//! )?;
//!
//! let mut ctx = Context::new();
//! ctx.insert(
//!     "items",
//!     Value::List(vec![Value::from("a"), Value::from("b")]),
//! );
//!
//! let mut out = Vec::new();
//! template.render(&mut ctx, &mut out)?;
//! assert_eq!(String::from_utf8(out).unwrap(), "- a\n- b\n");
//! # Ok::<(), stencil_template::TemplateError>(())
//! ```

pub mod context;
pub mod delimiters;
pub mod error;
pub mod evaluator;
pub mod expr;
pub mod marker;
pub mod program;
pub mod template;

// Re-export main types at crate root
pub use context::{Context, Value};
pub use delimiters::{Delimiters, DEFAULT_DELIMITERS};
pub use error::{RenderResult, TemplateError};
pub use marker::{Literal, Marker, MarkerKind};
pub use program::{Op, Program, Stmt, EOL, OUTPUT_BINDING};
pub use template::{render, Template};
