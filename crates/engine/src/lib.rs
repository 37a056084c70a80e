// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Brain contributors

//! Durable job queue: handler dispatch, retry/backoff, progress reporting,
//! and batch coordination over [`brain_storage::JobDb`] (kernel §4.6, §4.7).

pub mod handler;
pub mod progress;
pub mod worker;

pub use handler::{HandlerRegistry, JobHandler};
pub use progress::ProgressReporter;
pub use worker::{EngineError, WorkerPool};
