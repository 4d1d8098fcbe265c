/*
 * delimiters.rs
 * Copyright (c) 2025 The stencil contributors
 */

//! Marker delimiter configuration.
//!
//! A [`Delimiters`] value compiles the start/stop marker strings into a
//! single tokenizing pattern that finds every marker span in a template.

use crate::error::{RenderResult, TemplateError};
use regex::Regex;

/// The default start/stop marker pair.
pub const DEFAULT_DELIMITERS: &str = "{{ }}";

/// A start/stop marker pair and its compiled tokenizing pattern.
///
/// The pattern matches the shortest span from `start` to the next
/// `stop`, across line boundaries. Marker character content is not
/// validated further; it is the caller's responsibility to choose
/// markers that do not collide with template content.
#[derive(Debug, Clone)]
pub struct Delimiters {
    start: String,
    stop: String,
    pattern: Regex,
}

impl Delimiters {
    /// Build a delimiter set from a two-token `"START STOP"`
    /// configuration string.
    pub fn new(config: &str) -> RenderResult<Self> {
        let tokens: Vec<&str> = config.split_whitespace().collect();
        let &[start, stop] = tokens.as_slice() else {
            return Err(TemplateError::config(format!(
                "delimiter configuration must be two whitespace-separated tokens, got {config:?}"
            )));
        };

        let pattern = Regex::new(&format!(
            "(?s){}.*?{}",
            regex::escape(start),
            regex::escape(stop)
        ))
        .map_err(|e| TemplateError::config(format!("cannot compile marker pattern: {e}")))?;

        Ok(Self {
            start: start.to_string(),
            stop: stop.to_string(),
            pattern,
        })
    }

    /// The start marker string.
    pub fn start(&self) -> &str {
        &self.start
    }

    /// The stop marker string.
    pub fn stop(&self) -> &str {
        &self.stop
    }

    /// The compiled pattern matching whole marker spans.
    pub(crate) fn pattern(&self) -> &Regex {
        &self.pattern
    }

    /// Strip the start/stop markers from a matched span.
    pub(crate) fn inner<'a>(&self, span: &'a str) -> &'a str {
        &span[self.start.len()..span.len() - self.stop.len()]
    }
}

impl Default for Delimiters {
    fn default() -> Self {
        // The default configuration is statically well-formed.
        Self::new(DEFAULT_DELIMITERS).unwrap_or_else(|_| unreachable!())
    }
}
