// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Brain contributors

//! The kernel-wide error taxonomy.
//!
//! Every subsystem surfaces failures as one of these variants rather than a
//! crate-specific error type, so callers across crate boundaries can match
//! on `KernelError` without depending on every crate's internal error enum.
//! Each variant carries a `context` map for debuggability and an optional
//! `cause` chained via `#[source]`.

use std::collections::HashMap;
use thiserror::Error;

/// Structured context attached to every kernel error.
pub type ErrorContext = HashMap<String, String>;

/// The stable error taxonomy described in the kernel specification.
#[derive(Debug, Error)]
pub enum KernelError {
    /// Schema parse failed at entity write / template output / job data / config.
    /// Not retried.
    #[error("validation failed: {message}")]
    Validation { message: String, context: ErrorContext },

    /// Missing entity/job/template/conversation. Not retried.
    #[error("not found: {message}")]
    NotFound { message: String, context: ErrorContext },

    /// Unique-constraint / concurrent-update race. Caller may retry; upsert
    /// paths hide it.
    #[error("conflict: {message}")]
    Conflict { message: String, context: ErrorContext },

    /// A plugin declared a missing dependency. Fatal at load.
    #[error("dependency error: {message}")]
    Dependency { message: String, context: ErrorContext },

    /// A job handler returned an error. Retried per `max_attempts` with
    /// exponential backoff, then `failed`.
    #[error("handler error: {message}")]
    Handler {
        message: String,
        context: ErrorContext,
        #[source]
        cause: Option<Box<KernelError>>,
    },

    /// The AI/embedding gateway call failed or returned an invalid structure.
    /// Small bounded retry; then surfaces as `Handler` or `Validation`.
    #[error("gateway error: {message}")]
    Gateway { message: String, context: ErrorContext },

    /// Cancellation was observed by a handler. Job ends `cancelled`; no retry.
    #[error("cancelled: {message}")]
    Cancelled { message: String, context: ErrorContext },

    /// A bus send or daemon stop exceeded its timeout.
    #[error("timed out: {message}")]
    Timeout { message: String, context: ErrorContext },
}

impl KernelError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation { message: message.into(), context: ErrorContext::new() }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound { message: message.into(), context: ErrorContext::new() }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict { message: message.into(), context: ErrorContext::new() }
    }

    pub fn dependency(message: impl Into<String>) -> Self {
        Self::Dependency { message: message.into(), context: ErrorContext::new() }
    }

    pub fn handler(message: impl Into<String>) -> Self {
        Self::Handler { message: message.into(), context: ErrorContext::new(), cause: None }
    }

    pub fn gateway(message: impl Into<String>) -> Self {
        Self::Gateway { message: message.into(), context: ErrorContext::new() }
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::Cancelled { message: message.into(), context: ErrorContext::new() }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout { message: message.into(), context: ErrorContext::new() }
    }

    /// Attach a structured context field, builder-style.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context_mut().insert(key.into(), value.into());
        self
    }

    pub fn context(&self) -> &ErrorContext {
        match self {
            Self::Validation { context, .. }
            | Self::NotFound { context, .. }
            | Self::Conflict { context, .. }
            | Self::Dependency { context, .. }
            | Self::Handler { context, .. }
            | Self::Gateway { context, .. }
            | Self::Cancelled { context, .. }
            | Self::Timeout { context, .. } => context,
        }
    }

    fn context_mut(&mut self) -> &mut ErrorContext {
        match self {
            Self::Validation { context, .. }
            | Self::NotFound { context, .. }
            | Self::Conflict { context, .. }
            | Self::Dependency { context, .. }
            | Self::Handler { context, .. }
            | Self::Gateway { context, .. }
            | Self::Cancelled { context, .. }
            | Self::Timeout { context, .. } => context,
        }
    }

    /// Tag name used for logging and wire-level discrimination.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::NotFound { .. } => "not_found",
            Self::Conflict { .. } => "conflict",
            Self::Dependency { .. } => "dependency",
            Self::Handler { .. } => "handler",
            Self::Gateway { .. } => "gateway",
            Self::Cancelled { .. } => "cancelled",
            Self::Timeout { .. } => "timeout",
        }
    }

    /// Whether a job that failed with this error should be retried
    /// (subject to `attempts < max_attempts`).
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Handler { .. } | Self::Gateway { .. })
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
