// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Brain contributors

//! Hierarchical structured logging.
//!
//! Every component takes a [`Logger`] rather than calling `tracing` macros
//! directly. `Logger::child` nests a new component tag under the parent's
//! path so log lines carry the full component path (e.g.
//! `kernel.engine.worker`) without any global logger state.

use tracing::Span;

/// A logger scoped to one component path.
#[derive(Clone)]
pub struct Logger {
    path: String,
    span: Span,
}

/// A single structured field attached to a log record.
pub type Field<'a> = (&'a str, &'a str);

impl Logger {
    /// Create a root logger with the given top-level component name.
    pub fn root(name: &str) -> Self {
        let span = tracing::info_span!("component", path = %name);
        Self { path: name.to_string(), span }
    }

    /// Return a child logger whose path is `self.path + "." + name`.
    pub fn child(&self, name: &str) -> Self {
        let path = format!("{}.{}", self.path, name);
        let span = tracing::info_span!(parent: &self.span, "component", path = %path);
        Self { path, span }
    }

    /// The dotted component path (e.g. `"kernel.engine.worker"`).
    pub fn path(&self) -> &str {
        &self.path
    }

    fn fmt_fields(fields: &[Field<'_>]) -> String {
        let mut out = String::new();
        for (key, val) in fields {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(key);
            out.push('=');
            out.push_str(val);
        }
        out
    }

    pub fn debug(&self, message: &str, fields: &[Field<'_>]) {
        let _enter = self.span.enter();
        tracing::debug!(path = %self.path, "{} {}", message, Self::fmt_fields(fields));
    }

    pub fn info(&self, message: &str, fields: &[Field<'_>]) {
        let _enter = self.span.enter();
        tracing::info!(path = %self.path, "{} {}", message, Self::fmt_fields(fields));
    }

    pub fn warn(&self, message: &str, fields: &[Field<'_>]) {
        let _enter = self.span.enter();
        tracing::warn!(path = %self.path, "{} {}", message, Self::fmt_fields(fields));
    }

    pub fn error(&self, message: &str, fields: &[Field<'_>]) {
        let _enter = self.span.enter();
        tracing::error!(path = %self.path, "{} {}", message, Self::fmt_fields(fields));
    }
}

#[cfg(test)]
#[path = "logger_tests.rs"]
mod tests;
