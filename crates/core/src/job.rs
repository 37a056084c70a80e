// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Brain contributors

//! The job queue data model (kernel §3.4).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

crate::define_id! {
    /// Identifier for a unit of work submitted to the job queue.
    pub struct JobId("job-");
}

crate::define_id! {
    /// Identifier for a batch of related jobs (§3.5).
    pub struct BatchId("bat-");
}

/// Lifecycle state of a [`Job`]. Transitions are one-directional: a
/// terminal state (`Completed`, `Failed`, `Cancelled`) is never re-entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

crate::simple_display!(JobStatus {
    Pending => "pending",
    Running => "running",
    Completed => "completed",
    Failed => "failed",
    Cancelled => "cancelled",
});

impl JobStatus {
    /// True once a job has reached a state it will never leave.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// Relative scheduling weight. Higher values dequeue first; within a
/// priority tier, jobs dequeue FIFO by `created`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobPriority {
    Low,
    Normal,
    High,
    Critical,
}

impl Default for JobPriority {
    fn default() -> Self {
        Self::Normal
    }
}

/// A unit of work enqueued for asynchronous execution by a registered
/// handler (§4.6).
///
/// Invariant: `attempts <= max_attempts`; once `status` is terminal, the
/// queue never mutates `status` again. `root_job_id` equals `id` for a
/// top-level job and is inherited unchanged by every descendant, so
/// subscribers can route on the root regardless of nesting depth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub job_type: String,
    pub status: JobStatus,
    pub priority: JobPriority,
    pub payload: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub attempts: u32,
    pub max_attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_job_id: Option<JobId>,
    pub root_job_id: JobId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<BatchId>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_for: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    /// A fresh job is its own root until proven otherwise by a submitter
    /// that passes a `parent_job_id`.
    pub fn is_root(&self) -> bool {
        self.id == self.root_job_id
    }

    /// Remaining attempts before the queue gives up and marks the job
    /// `Failed` for good.
    pub fn attempts_remaining(&self) -> u32 {
        self.max_attempts.saturating_sub(self.attempts)
    }
}

crate::builder! {
    pub struct JobBuilder => Job {
        into {
            job_type: String = "generic",
        }
        set {
            id: JobId = JobId::new(),
            root_job_id: JobId = JobId::new(),
            status: JobStatus = JobStatus::Pending,
            priority: JobPriority = JobPriority::Normal,
            payload: serde_json::Value = serde_json::Value::Null,
            attempts: u32 = 0,
            max_attempts: u32 = 3,
            metadata: HashMap<String, serde_json::Value> = HashMap::new(),
            created: DateTime<Utc> = Utc::now(),
            updated: DateTime<Utc> = Utc::now(),
        }
        option {
            result: serde_json::Value = None,
            error: String = None,
            parent_job_id: JobId = None,
            batch_id: BatchId = None,
            scheduled_for: DateTime<Utc> = None,
            started_at: DateTime<Utc> = None,
            completed_at: DateTime<Utc> = None,
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
impl JobBuilder {
    /// `root_job_id` defaults to `id` unless overridden, matching the
    /// production submission path (§4.6): a job is its own root until a
    /// caller supplies a parent.
    pub fn build_with_root(self) -> Job {
        let mut job = self.build();
        job.root_job_id = job.id;
        job
    }
}

crate::root_job_ctor!(Job);

/// Exponential backoff schedule for job retries (§4.6): `base * 2^attempt`,
/// capped at `max`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryBackoff {
    pub base_ms: u64,
    pub max_ms: u64,
}

impl Default for RetryBackoff {
    fn default() -> Self {
        Self { base_ms: 1_000, max_ms: 60_000 }
    }
}

impl RetryBackoff {
    /// Delay before the `attempt`-th retry (0-indexed: the delay before
    /// the *first* retry is `delay_for(0)`).
    pub fn delay_for(&self, attempt: u32) -> u64 {
        let scaled = self.base_ms.saturating_mul(1u64.checked_shl(attempt).unwrap_or(u64::MAX));
        scaled.min(self.max_ms)
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
