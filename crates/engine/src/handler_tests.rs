// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Brain contributors

use super::*;
use crate::progress::ProgressReporter;
use async_trait::async_trait;
use brain_bus::Bus;
use brain_core::JobId;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

struct EchoHandler;

#[async_trait]
impl JobHandler for EchoHandler {
    async fn handle(&self, job: &Job, _progress: &ProgressReporter) -> Result<serde_json::Value, KernelError> {
        Ok(job.payload.clone())
    }
}

fn reporter() -> ProgressReporter {
    ProgressReporter::new(JobId::new(), JobId::new(), Bus::new(), Arc::new(AtomicBool::new(false)))
}

#[tokio::test]
async fn registered_handler_is_found_by_type() {
    let mut registry = HandlerRegistry::new();
    registry.register("echo", Arc::new(EchoHandler));

    let handler = registry.get("echo").expect("handler registered");
    let job = Job::builder().job_type("echo").payload(serde_json::json!({"n": 1})).build_with_root();
    let result = handler.handle(&job, &reporter()).await.unwrap();
    assert_eq!(result, serde_json::json!({"n": 1}));
}

#[test]
fn unknown_type_returns_none() {
    let registry = HandlerRegistry::new();
    assert!(registry.get("missing").is_none());
}

#[test]
fn unregister_removes_a_previously_registered_handler() {
    let mut registry = HandlerRegistry::new();
    registry.register("echo", Arc::new(EchoHandler));
    registry.unregister("echo");
    assert!(registry.get("echo").is_none());
}
