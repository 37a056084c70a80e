// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Brain contributors

//! Job handler contract and the registry workers dispatch through (§4.6).

use crate::progress::ProgressReporter;
use async_trait::async_trait;
use brain_core::{Job, KernelError};
use std::collections::HashMap;
use std::sync::Arc;

/// Implemented once per job `type`. Handlers receive a [`ProgressReporter`]
/// scoped to their job so they can call `report` without threading ids
/// through call sites.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, job: &Job, progress: &ProgressReporter) -> Result<serde_json::Value, KernelError>;
}

/// Maps job `type` strings to their handler. Registration is last-write-wins,
/// matching the teacher's adapter-registration idiom elsewhere in the stack.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn JobHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, job_type: impl Into<String>, handler: Arc<dyn JobHandler>) {
        self.handlers.insert(job_type.into(), handler);
    }

    pub fn get(&self, job_type: &str) -> Option<Arc<dyn JobHandler>> {
        self.handlers.get(job_type).cloned()
    }

    pub fn unregister(&mut self, job_type: &str) {
        self.handlers.remove(job_type);
    }
}

#[cfg(test)]
#[path = "handler_tests.rs"]
mod tests;
