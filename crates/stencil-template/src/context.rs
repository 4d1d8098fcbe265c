/*
 * context.rs
 * Copyright (c) 2025 The stencil contributors
 */

//! Template value and context types.
//!
//! [`Value`] is the engine's own value model, independent of any host
//! serialization type; conversions to and from `serde_json::Value` are
//! provided for callers that feed contexts from JSON.
//!
//! [`Context`] is one flat mutable namespace per render. Statements the
//! template author writes may mutate it (loop variables included), and
//! those mutations remain visible after the render; the context is the
//! template's mutable namespace for the duration of one invocation.

use std::collections::HashMap;
use std::fmt;

/// A value available to template expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A null/missing value.
    Null,
    /// A boolean value.
    Bool(bool),
    /// An integer value.
    Int(i64),
    /// A floating-point value.
    Float(f64),
    /// A string value.
    String(String),
    /// A list of values.
    List(Vec<Value>),
    /// A map of string keys to values.
    Map(HashMap<String, Value>),
}

impl Value {
    /// Check if this value is "truthy" for conditional evaluation.
    ///
    /// `Null`, `false`, `0`, `0.0`, the empty string, the empty list
    /// and the empty map are falsy; everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(n) => *n != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Map(m) => !m.is_empty(),
        }
    }

    /// Get a nested field by path, e.g. `get_path(&["employee",
    /// "salary"])` on a map containing `{"employee": {"salary": …}}`.
    pub fn get_path(&self, path: &[&str]) -> Option<&Value> {
        if path.is_empty() {
            return Some(self);
        }
        match self {
            Value::Map(m) => m.get(path[0]).and_then(|v| v.get_path(&path[1..])),
            _ => None,
        }
    }

    /// A short name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl fmt::Display for Value {
    /// Stringification used by expression substitution.
    ///
    /// - `Null` renders as the empty string
    /// - numbers and booleans in their natural form
    /// - strings verbatim
    /// - lists and maps as compact JSON (map keys sorted)
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(n) => write!(f, "{n}"),
            Value::String(s) => f.write_str(s),
            Value::List(_) | Value::Map(_) => {
                let json = serde_json::Value::from(self.clone());
                // Compact JSON serialization of a plain value tree
                // cannot fail.
                write!(f, "{}", serde_json::to_string(&json).map_err(|_| fmt::Error)?)
            }
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(m) => {
                Value::Map(m.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Int(n) => serde_json::Value::Number(n.into()),
            Value::Float(n) => serde_json::Number::from_f64(n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s),
            Value::List(items) => {
                serde_json::Value::Array(items.into_iter().map(Into::into).collect())
            }
            Value::Map(m) => serde_json::Value::Object(
                m.into_iter().map(|(k, v)| (k, v.into())).collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// The mutable name-to-value namespace for one render invocation.
///
/// One context belongs to exactly one render at a time; independent
/// renders on separate threads must use separate contexts.
#[derive(Debug, Clone, Default)]
pub struct Context {
    variables: HashMap<String, Value>,
}

impl Context {
    /// Create a new empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a context from the entries of a JSON object.
    pub fn from_json(value: serde_json::Value) -> crate::RenderResult<Self> {
        match value {
            serde_json::Value::Object(m) => {
                let mut ctx = Context::new();
                for (k, v) in m {
                    ctx.insert(k, Value::from(v));
                }
                Ok(ctx)
            }
            other => Err(crate::TemplateError::evaluation(format!(
                "context must be a JSON object, got {other}"
            ))),
        }
    }

    /// Insert a variable into the context.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.variables.insert(key.into(), value);
    }

    /// Get a variable from the context.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.variables.get(key)
    }

    /// Get a variable by dotted path (e.g. `employee.salary`).
    pub fn get_path(&self, path: &[&str]) -> Option<&Value> {
        if path.is_empty() {
            return None;
        }
        self.get(path[0]).and_then(|v| v.get_path(&path[1..]))
    }
}
