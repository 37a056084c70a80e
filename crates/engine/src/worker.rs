// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Brain contributors

//! Worker pool: polls the job queue, dispatches to registered handlers, and
//! applies the retry/backoff and batch-completion rules of §4.6.

use crate::handler::HandlerRegistry;
use crate::progress::{publish_batch_progress, ProgressReporter};
use brain_bus::Bus;
use brain_core::{Clock, Job, JobId, KernelError, Logger, RetryBackoff};
use brain_storage::JobDb;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("job store error: {0}")]
    Store(#[from] brain_core::KernelError),
}

/// Shared state cloned into each spawned job task; kept separate from
/// [`WorkerPool`] so `poll_once` can hand work to `tokio::spawn` without
/// borrowing `&self` across an await point.
struct Shared<C: Clock> {
    jobs: Arc<Mutex<JobDb>>,
    handlers: HandlerRegistry,
    bus: Bus,
    clock: C,
    backoff: RetryBackoff,
    cancellation_tokens: Arc<Mutex<HashMap<JobId, Arc<AtomicBool>>>>,
}

/// Durable, prioritized, retried background job execution.
///
/// Owns the [`JobDb`] and dispatches dequeued jobs to the matching
/// [`HandlerRegistry`] entry, honoring `maxAttempts` and [`RetryBackoff`] on
/// failure. Cancellation tokens for in-flight jobs are tracked so a
/// `request_cancel` call can reach a running handler cooperatively.
pub struct WorkerPool<C: Clock> {
    shared: Arc<Shared<C>>,
    logger: Logger,
    concurrency: usize,
}

impl<C: Clock + Clone + Send + Sync + 'static> WorkerPool<C> {
    pub fn new(jobs: Arc<Mutex<JobDb>>, handlers: HandlerRegistry, bus: Bus, clock: C, logger: Logger) -> Self {
        Self {
            shared: Arc::new(Shared {
                jobs,
                handlers,
                bus,
                clock,
                backoff: RetryBackoff::default(),
                cancellation_tokens: Arc::new(Mutex::new(HashMap::new())),
            }),
            logger,
            concurrency: 4,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_backoff(mut self, backoff: RetryBackoff) -> Self {
        Arc::get_mut(&mut self.shared)
            .expect("with_backoff must be called before the pool is shared")
            .backoff = backoff;
        self
    }

    /// Reset jobs left `Running` by a prior crash. Must be called once
    /// before [`WorkerPool::poll_once`] is ever called.
    pub fn recover(&self) -> Result<usize, EngineError> {
        Ok(self.shared.jobs.lock().recover_interrupted(&self.shared.clock)?)
    }

    /// A cooperative cancellation request for a pending or running job.
    pub fn request_cancel(&self, id: JobId) -> Result<(), EngineError> {
        self.shared.jobs.lock().cancel(id, &self.shared.clock)?;
        if let Some(token) = self.shared.cancellation_tokens.lock().get(&id) {
            token.store(true, Ordering::Relaxed);
        }
        Ok(())
    }

    /// Dequeue up to `concurrency` pending jobs and run them concurrently
    /// to completion. Returns the number dispatched.
    pub async fn poll_once(&self) -> usize {
        let mut dispatched = Vec::new();
        {
            let mut jobs = self.shared.jobs.lock();
            for _ in 0..self.concurrency {
                let Some(job) = jobs.next_pending(&self.shared.clock) else { break };
                if jobs.mark_started(job.id, &self.shared.clock).is_err() {
                    break;
                }
                dispatched.push(job);
            }
        }

        let count = dispatched.len();
        let mut handles = Vec::with_capacity(count);
        for job in dispatched {
            let shared = self.shared.clone();
            handles.push(tokio::spawn(async move { run_job(shared, job).await }));
        }
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "job task panicked");
            }
        }
        count
    }

    /// Poll forever at `interval`, stopping when `shutdown` resolves.
    pub async fn run(&self, interval: Duration, mut shutdown: tokio::sync::oneshot::Receiver<()>) {
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    self.logger.info("worker pool shutting down", &[]);
                    return;
                }
                _ = tokio::time::sleep(interval) => {
                    self.poll_once().await;
                }
            }
        }
    }
}

async fn run_job<C: Clock + Send + Sync + 'static>(shared: Arc<Shared<C>>, job: Job) {
    let token = Arc::new(AtomicBool::new(false));
    shared.cancellation_tokens.lock().insert(job.id, token.clone());
    let mut reporter = ProgressReporter::new(job.id, job.root_job_id, shared.bus.clone(), token);
    if let Some(owner) = job.metadata.get("ownerPluginId").and_then(|v| v.as_str()) {
        reporter = reporter.with_target(brain_core::message::Target::Plugin { plugin_id: owner.to_string() });
    }

    let handler = shared.handlers.get(&job.job_type);
    let outcome = match handler {
        Some(handler) => handler.handle(&job, &reporter).await,
        None => Err(KernelError::not_found(format!("no handler registered for job type {}", job.job_type))),
    };

    shared.cancellation_tokens.lock().remove(&job.id);
    finish_job(&shared, job, outcome);
}

fn finish_job<C: Clock>(shared: &Shared<C>, job: Job, outcome: Result<serde_json::Value, KernelError>) {
    let mut jobs = shared.jobs.lock();
    let result = match outcome {
        Ok(value) => jobs.mark_completed(job.id, value, &shared.clock),
        Err(KernelError::Cancelled { .. }) => {
            tracing::info!(job_id = %job.id, job_type = job.job_type, "job cancelled");
            jobs.mark_cancelled(job.id, &shared.clock)
        }
        Err(e) => {
            let retry = e.is_retryable() && job.attempts_remaining() > 0;
            let retry_after = retry.then(|| {
                let delay_ms = shared.backoff.delay_for(job.attempts.saturating_sub(1));
                shared.clock.now() + chrono::Duration::milliseconds(delay_ms as i64)
            });
            tracing::error!(job_id = %job.id, job_type = job.job_type, error = %e, retry, "job failed");
            jobs.mark_failed(job.id, e.to_string(), retry, retry_after, &shared.clock)
        }
    };
    if let Err(e) = result {
        tracing::error!(job_id = %job.id, error = %e, "failed to persist job outcome");
    }

    if let Some(batch_id) = job.batch_id {
        if let Some(batch) = jobs.get_batch(&batch_id).cloned() {
            drop(jobs);
            publish_batch_progress(&shared.bus, &batch);
            return;
        }
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
