// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Brain contributors

//! Batch aggregation over a set of related jobs (kernel §3.5).

use crate::job::{BatchId, JobId, JobStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Aggregate status of a [`Batch`], derived from its members' statuses.
///
/// `Completed` requires every member terminal and successful;
/// `PartiallyFailed` requires at least one terminal failure alongside at
/// least one success; `Failed` requires every member to have failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Pending,
    Running,
    Completed,
    PartiallyFailed,
    Failed,
}

crate::simple_display!(BatchStatus {
    Pending => "pending",
    Running => "running",
    Completed => "completed",
    PartiallyFailed => "partially_failed",
    Failed => "failed",
});

/// Tracks the progress of a group of jobs submitted together, so a caller
/// can poll or subscribe to one identifier instead of every member job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub id: BatchId,
    pub job_ids: Vec<JobId>,
    pub status: BatchStatus,
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl Batch {
    pub fn new(id: BatchId, job_ids: Vec<JobId>, now: DateTime<Utc>) -> Self {
        let total = job_ids.len();
        Self { id, job_ids, status: BatchStatus::Pending, total, completed: 0, failed: 0, created: now, updated: now }
    }

    /// Recompute `status`/`completed`/`failed` from the live statuses of
    /// the batch's member jobs. Called by the job queue whenever a member
    /// job transitions to a terminal state.
    pub fn recompute(&mut self, member_statuses: &[JobStatus], now: DateTime<Utc>) {
        let completed = member_statuses.iter().filter(|s| **s == JobStatus::Completed).count();
        let failed = member_statuses.iter().filter(|s| **s == JobStatus::Failed || **s == JobStatus::Cancelled).count();
        let terminal = completed + failed;

        self.completed = completed;
        self.failed = failed;
        self.status = if terminal < self.total {
            if terminal == 0 { BatchStatus::Pending } else { BatchStatus::Running }
        } else if failed == 0 {
            BatchStatus::Completed
        } else if completed == 0 {
            BatchStatus::Failed
        } else {
            BatchStatus::PartiallyFailed
        };
        self.updated = now;
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, BatchStatus::Completed | BatchStatus::PartiallyFailed | BatchStatus::Failed)
    }
}

#[cfg(test)]
#[path = "batch_tests.rs"]
mod tests;
