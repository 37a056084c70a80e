// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Brain contributors

use super::*;

#[test]
fn fresh_job_is_root() {
    let job = Job::builder().build_with_root();
    assert!(job.is_root());
}

#[test]
fn child_job_is_not_root() {
    let parent = Job::builder().build_with_root();
    let child = Job::builder().parent_job_id(parent.id).root_job_id(parent.root_job_id).build();
    assert!(!child.is_root());
    assert_eq!(child.root_job_id, parent.root_job_id);
}

#[test]
fn attempts_remaining_saturates_at_zero() {
    let job = Job::builder().attempts(5).max_attempts(3).build();
    assert_eq!(job.attempts_remaining(), 0);
}

#[test]
fn terminal_statuses() {
    assert!(JobStatus::Completed.is_terminal());
    assert!(JobStatus::Failed.is_terminal());
    assert!(JobStatus::Cancelled.is_terminal());
    assert!(!JobStatus::Pending.is_terminal());
    assert!(!JobStatus::Running.is_terminal());
}

#[test]
fn priority_orders_low_to_critical() {
    assert!(JobPriority::Low < JobPriority::Normal);
    assert!(JobPriority::Normal < JobPriority::High);
    assert!(JobPriority::High < JobPriority::Critical);
}

#[test]
fn new_root_is_its_own_root_with_no_parent() {
    let now = Utc::now();
    let job = Job::new_root("embed-entity", serde_json::json!({"entityId": "ent-1"}), now);
    assert!(job.is_root());
    assert_eq!(job.parent_job_id, None);
    assert_eq!(job.status, JobStatus::Pending);
    assert_eq!(job.attempts, 0);
    assert_eq!(job.created, now);
}

#[test]
fn backoff_doubles_and_caps() {
    let backoff = RetryBackoff { base_ms: 1_000, max_ms: 10_000 };
    assert_eq!(backoff.delay_for(0), 1_000);
    assert_eq!(backoff.delay_for(1), 2_000);
    assert_eq!(backoff.delay_for(2), 4_000);
    assert_eq!(backoff.delay_for(10), 10_000);
}
