/*
 * error.rs
 * Copyright (c) 2025 The stencil contributors
 */

//! Error types for template compilation and rendering.

use thiserror::Error;

/// Errors that can occur during template operations.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Malformed delimiter configuration string.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Marker content that does not form a valid program.
    ///
    /// The compiler performs no syntactic validation of marker content
    /// beyond shape classification, so this surfaces when the compiled
    /// program is executed, not when the template is compiled.
    #[error("Generation error: {message}")]
    Generation { message: String },

    /// Failure raised while the compiled program runs (undefined
    /// variable, type mismatch, and so on).
    #[error("Evaluation error: {message}")]
    Evaluation { message: String },

    /// I/O error (e.g., reading the template or writing the sink).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TemplateError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        TemplateError::Config {
            message: message.into(),
        }
    }

    pub(crate) fn generation(message: impl Into<String>) -> Self {
        TemplateError::Generation {
            message: message.into(),
        }
    }

    pub(crate) fn evaluation(message: impl Into<String>) -> Self {
        TemplateError::Evaluation {
            message: message.into(),
        }
    }
}

/// Result type for template operations.
pub type RenderResult<T> = Result<T, TemplateError>;
