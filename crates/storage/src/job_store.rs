// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Brain contributors

//! Event-sourced job queue store (kernel §3.4, §3.5, §4.6, §6).

use crate::migration::MigrationRegistry;
use crate::store::{Fold, Store, StoreError};
use brain_core::{Batch, BatchId, Clock, Job, JobId, JobStatus, KernelError};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const JOB_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum JobEvent {
    Submitted(Box<Job>),
    Started { id: JobId, started_at: chrono::DateTime<chrono::Utc> },
    Completed { id: JobId, result: serde_json::Value, completed_at: chrono::DateTime<chrono::Utc> },
    Failed {
        id: JobId,
        error: String,
        retry: bool,
        /// When the job becomes eligible to run again; defaults to
        /// immediately (`completed_at`) when `None`.
        retry_after: Option<chrono::DateTime<chrono::Utc>>,
        completed_at: chrono::DateTime<chrono::Utc>,
    },
    Cancelled { id: JobId, completed_at: chrono::DateTime<chrono::Utc> },
    BatchCreated(Box<Batch>),
    /// Emitted once at startup for every job left `Running` by a crash;
    /// resets it to `Pending` if attempts remain, else `Failed` (§4.6).
    Recovered { id: JobId, recovered_at: chrono::DateTime<chrono::Utc> },
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct JobState {
    jobs: IndexMap<JobId, Job>,
    batches: IndexMap<BatchId, Batch>,
}

impl Fold<JobEvent> for JobState {
    fn apply(&mut self, event: &JobEvent) {
        match event {
            JobEvent::Submitted(job) => {
                self.jobs.insert(job.id, (**job).clone());
            }
            JobEvent::Started { id, started_at } => {
                if let Some(job) = self.jobs.get_mut(id) {
                    if job.status == JobStatus::Pending {
                        job.status = JobStatus::Running;
                        job.started_at = Some(*started_at);
                        job.attempts += 1;
                        job.updated = *started_at;
                    }
                }
            }
            JobEvent::Completed { id, result, completed_at } => {
                if let Some(job) = self.jobs.get_mut(id) {
                    if !job.status.is_terminal() {
                        job.status = JobStatus::Completed;
                        job.result = Some(result.clone());
                        job.completed_at = Some(*completed_at);
                        job.updated = *completed_at;
                    }
                }
                self.recompute_batch_for(id, *completed_at);
            }
            JobEvent::Failed { id, error, retry, retry_after, completed_at } => {
                if let Some(job) = self.jobs.get_mut(id) {
                    if !job.status.is_terminal() {
                        job.error = Some(error.clone());
                        job.updated = *completed_at;
                        if *retry && job.attempts_remaining() > 0 {
                            job.status = JobStatus::Pending;
                            job.scheduled_for = Some(retry_after.unwrap_or(*completed_at));
                        } else {
                            job.status = JobStatus::Failed;
                            job.completed_at = Some(*completed_at);
                        }
                    }
                }
                self.recompute_batch_for(id, *completed_at);
            }
            JobEvent::Cancelled { id, completed_at } => {
                if let Some(job) = self.jobs.get_mut(id) {
                    if !job.status.is_terminal() {
                        job.status = JobStatus::Cancelled;
                        job.completed_at = Some(*completed_at);
                        job.updated = *completed_at;
                    }
                }
                self.recompute_batch_for(id, *completed_at);
            }
            JobEvent::BatchCreated(batch) => {
                self.batches.insert(batch.id, (**batch).clone());
            }
            JobEvent::Recovered { id, recovered_at } => {
                if let Some(job) = self.jobs.get_mut(id) {
                    if job.status == JobStatus::Running {
                        job.updated = *recovered_at;
                        if job.attempts_remaining() > 0 {
                            job.status = JobStatus::Pending;
                            job.scheduled_for = Some(*recovered_at);
                        } else {
                            job.status = JobStatus::Failed;
                            job.error = Some("exceeded max attempts after restart".to_string());
                            job.completed_at = Some(*recovered_at);
                        }
                    }
                }
                self.recompute_batch_for(id, *recovered_at);
            }
        }
    }
}

impl JobState {
    fn recompute_batch_for(&mut self, job_id: &JobId, now: chrono::DateTime<chrono::Utc>) {
        let batch_id = match self.jobs.get(job_id).and_then(|j| j.batch_id) {
            Some(id) => id,
            None => return,
        };
        let statuses: Vec<JobStatus> = {
            let Some(batch) = self.batches.get(&batch_id) else { return };
            batch.job_ids.iter().filter_map(|id| self.jobs.get(id)).map(|j| j.status).collect()
        };
        if let Some(batch) = self.batches.get_mut(&batch_id) {
            batch.recompute(&statuses, now);
        }
    }

    pub fn get(&self, id: &JobId) -> Option<&Job> {
        self.jobs.get(id)
    }

    pub fn get_batch(&self, id: &BatchId) -> Option<&Batch> {
        self.batches.get(id)
    }

    /// Pick the next pending, due job to run: highest priority first,
    /// then oldest `created` within a priority tier (§4.6).
    pub fn next_pending(&self, now: chrono::DateTime<chrono::Utc>) -> Option<&Job> {
        self.jobs
            .values()
            .filter(|j| j.status == JobStatus::Pending)
            .filter(|j| j.scheduled_for.is_none_or_due(now))
            .max_by(|a, b| a.priority.cmp(&b.priority).then(b.created.cmp(&a.created)))
    }

    pub fn pending_count(&self) -> usize {
        self.jobs.values().filter(|j| j.status == JobStatus::Pending).count()
    }

    fn running_job_ids(&self) -> Vec<JobId> {
        self.jobs.values().filter(|j| j.status == JobStatus::Running).map(|j| j.id).collect()
    }
}

trait DueAt {
    fn is_none_or_due(&self, now: chrono::DateTime<chrono::Utc>) -> bool;
}

impl DueAt for Option<chrono::DateTime<chrono::Utc>> {
    fn is_none_or_due(&self, now: chrono::DateTime<chrono::Utc>) -> bool {
        match self {
            Some(t) => *t <= now,
            None => true,
        }
    }
}

/// Typed wrapper exposing the job queue's submit/dequeue/complete surface
/// (§4.6) over the raw event-sourced [`Store`].
pub struct JobDb {
    store: Store<JobState, JobEvent>,
}

impl JobDb {
    pub fn open(wal_path: &Path, snapshot_path: &Path) -> Result<Self, StoreError> {
        let store = Store::open(wal_path, snapshot_path, JOB_SCHEMA_VERSION, MigrationRegistry::new())?;
        Ok(Self { store })
    }

    pub fn get(&self, id: &JobId) -> Option<&Job> {
        self.store.state().get(id)
    }

    pub fn get_batch(&self, id: &BatchId) -> Option<&Batch> {
        self.store.state().get_batch(id)
    }

    pub fn submit(&mut self, job: Job, clock: &dyn Clock) -> Result<Job, KernelError> {
        let stored = job.clone();
        self.store
            .append(JobEvent::Submitted(Box::new(job)), clock)
            .map_err(|e| KernelError::handler("job store append failed").with_context("cause", e.to_string()))?;
        Ok(stored)
    }

    /// Submit a batch of related jobs, recording the [`Batch`] tracker
    /// alongside its members.
    pub fn submit_batch(&mut self, batch: Batch, jobs: Vec<Job>, clock: &dyn Clock) -> Result<(), KernelError> {
        self.store
            .append(JobEvent::BatchCreated(Box::new(batch)), clock)
            .map_err(|e| KernelError::handler("job store append failed").with_context("cause", e.to_string()))?;
        for job in jobs {
            self.submit(job, clock)?;
        }
        Ok(())
    }

    pub fn next_pending(&self, clock: &dyn Clock) -> Option<Job> {
        self.store.state().next_pending(clock.now()).cloned()
    }

    pub fn pending_count(&self) -> usize {
        self.store.state().pending_count()
    }

    pub fn mark_started(&mut self, id: JobId, clock: &dyn Clock) -> Result<(), KernelError> {
        self.store
            .append(JobEvent::Started { id, started_at: clock.now() }, clock)
            .map_err(|e| KernelError::handler("job store append failed").with_context("cause", e.to_string()))?;
        Ok(())
    }

    pub fn mark_completed(&mut self, id: JobId, result: serde_json::Value, clock: &dyn Clock) -> Result<(), KernelError> {
        self.store
            .append(JobEvent::Completed { id, result, completed_at: clock.now() }, clock)
            .map_err(|e| KernelError::handler("job store append failed").with_context("cause", e.to_string()))?;
        Ok(())
    }

    /// `retry = true` requeues the job as `Pending` if attempts remain;
    /// otherwise (or once attempts are exhausted) it is marked `Failed`.
    /// `retry_after` delays eligibility (exponential backoff); `None` means
    /// immediately.
    pub fn mark_failed(
        &mut self,
        id: JobId,
        error: String,
        retry: bool,
        retry_after: Option<chrono::DateTime<chrono::Utc>>,
        clock: &dyn Clock,
    ) -> Result<(), KernelError> {
        self.store
            .append(JobEvent::Failed { id, error, retry, retry_after, completed_at: clock.now() }, clock)
            .map_err(|e| KernelError::handler("job store append failed").with_context("cause", e.to_string()))?;
        Ok(())
    }

    /// Request cancellation. A `Pending` job is cancelled immediately — it
    /// never started, so there is no handler to cooperate. A `Running` job
    /// is left running: the caller (the worker pool) still flips the
    /// cancellation token, and the handler's own completion path is
    /// responsible for observing it and calling [`Self::mark_cancelled`].
    pub fn cancel(&mut self, id: JobId, clock: &dyn Clock) -> Result<(), KernelError> {
        let status = self
            .store
            .state()
            .get(&id)
            .map(|j| j.status)
            .ok_or_else(|| KernelError::not_found(format!("job {id} not found or already terminal")))?;
        if status.is_terminal() {
            return Err(KernelError::not_found(format!("job {id} not found or already terminal")));
        }
        if status == JobStatus::Running {
            return Ok(());
        }
        self.store
            .append(JobEvent::Cancelled { id, completed_at: clock.now() }, clock)
            .map_err(|e| KernelError::handler("job store append failed").with_context("cause", e.to_string()))?;
        Ok(())
    }

    /// Terminal transition for a `Running` job whose handler observed
    /// `ProgressReporter::is_cancelled()` and returned
    /// `KernelError::cancelled()` instead of a normal result.
    pub fn mark_cancelled(&mut self, id: JobId, clock: &dyn Clock) -> Result<(), KernelError> {
        self.store
            .append(JobEvent::Cancelled { id, completed_at: clock.now() }, clock)
            .map_err(|e| KernelError::handler("job store append failed").with_context("cause", e.to_string()))?;
        Ok(())
    }

    pub fn snapshot(&mut self, clock: &dyn Clock) -> Result<(), StoreError> {
        self.store.snapshot(clock)
    }

    /// Reset every job left `Running` by a prior crash. Call once at
    /// startup before the worker pool begins polling (§4.6 invariants).
    /// Returns the number of jobs reset.
    pub fn recover_interrupted(&mut self, clock: &dyn Clock) -> Result<usize, KernelError> {
        let stuck = self.store.state().running_job_ids();
        let count = stuck.len();
        for id in stuck {
            self.store
                .append(JobEvent::Recovered { id, recovered_at: clock.now() }, clock)
                .map_err(|e| KernelError::handler("job store append failed").with_context("cause", e.to_string()))?;
        }
        Ok(count)
    }
}

#[cfg(test)]
#[path = "job_store_tests.rs"]
mod tests;
