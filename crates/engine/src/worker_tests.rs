// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Brain contributors

use super::*;
use crate::handler::{HandlerRegistry, JobHandler};
use crate::progress::ProgressReporter;
use async_trait::async_trait;
use brain_bus::Bus;
use brain_core::{Job, JobPriority, JobStatus, KernelError, Logger};
use brain_storage::JobDb;
use tempfile::tempdir;

struct OkHandler;

#[async_trait]
impl JobHandler for OkHandler {
    async fn handle(&self, job: &Job, _progress: &ProgressReporter) -> Result<serde_json::Value, KernelError> {
        Ok(job.payload.clone())
    }
}

/// Loops checking `is_cancelled()` instead of finishing immediately, so a
/// `request_cancel` call made while it's running has something to observe.
struct CancellableHandler;

#[async_trait]
impl JobHandler for CancellableHandler {
    async fn handle(&self, _job: &Job, progress: &ProgressReporter) -> Result<serde_json::Value, KernelError> {
        for _ in 0..200 {
            if progress.is_cancelled() {
                return Err(KernelError::cancelled("stopped cooperatively"));
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        Ok(serde_json::json!({}))
    }
}

struct AlwaysFailsHandler;

#[async_trait]
impl JobHandler for AlwaysFailsHandler {
    async fn handle(&self, _job: &Job, _progress: &ProgressReporter) -> Result<serde_json::Value, KernelError> {
        Err(KernelError::handler("always fails"))
    }
}

fn open_db(dir: &tempfile::TempDir) -> JobDb {
    JobDb::open(&dir.path().join("jobs.wal"), &dir.path().join("jobs.snap")).unwrap()
}

#[tokio::test]
async fn poll_once_dispatches_and_completes_a_job() {
    let dir = tempdir().unwrap();
    let clock = brain_core::SystemClock;
    let db = Arc::new(Mutex::new(open_db(&dir)));
    let job = Job::builder().job_type("ok").priority(JobPriority::Normal).build_with_root();
    db.lock().submit(job.clone(), &clock).unwrap();

    let mut handlers = HandlerRegistry::new();
    handlers.register("ok", Arc::new(OkHandler));

    let pool = WorkerPool::new(db.clone(), handlers, Bus::new(), clock, Logger::root("test"));
    let dispatched = pool.poll_once().await;

    assert_eq!(dispatched, 1);
    assert_eq!(db.lock().get(&job.id).unwrap().status, JobStatus::Completed);
}

#[tokio::test]
async fn failed_job_is_requeued_with_future_due_time() {
    let dir = tempdir().unwrap();
    let clock = brain_core::FakeClock::new();
    let db = Arc::new(Mutex::new(open_db(&dir)));
    let job = Job::builder().job_type("bad").max_attempts(3).build_with_root();
    db.lock().submit(job.clone(), &clock).unwrap();

    let mut handlers = HandlerRegistry::new();
    handlers.register("bad", Arc::new(AlwaysFailsHandler));

    let pool = WorkerPool::new(db.clone(), handlers, Bus::new(), clock.clone(), Logger::root("test"));
    pool.poll_once().await;

    let stored = db.lock().get(&job.id).unwrap().clone();
    assert_eq!(stored.status, JobStatus::Pending);
    assert!(stored.scheduled_for.unwrap() > clock.now());

    // Not due yet: a second poll should not pick it back up.
    assert_eq!(pool.poll_once().await, 0);
}

#[tokio::test]
async fn no_handler_registered_fails_the_job() {
    let dir = tempdir().unwrap();
    let clock = brain_core::SystemClock;
    let db = Arc::new(Mutex::new(open_db(&dir)));
    let job = Job::builder().job_type("unregistered").max_attempts(1).build_with_root();
    db.lock().submit(job.clone(), &clock).unwrap();

    let pool = WorkerPool::new(db.clone(), HandlerRegistry::new(), Bus::new(), clock, Logger::root("test"));
    pool.poll_once().await;

    assert_eq!(db.lock().get(&job.id).unwrap().status, JobStatus::Failed);
}

#[tokio::test]
async fn recover_resets_running_jobs_before_polling() {
    let dir = tempdir().unwrap();
    let clock = brain_core::SystemClock;
    let db = Arc::new(Mutex::new(open_db(&dir)));
    let job = Job::builder().job_type("ok").build_with_root();
    db.lock().submit(job.clone(), &clock).unwrap();
    db.lock().mark_started(job.id, &clock).unwrap();

    let mut handlers = HandlerRegistry::new();
    handlers.register("ok", Arc::new(OkHandler));
    let pool = WorkerPool::new(db.clone(), handlers, Bus::new(), clock, Logger::root("test"));

    let reset = pool.recover().unwrap();
    assert_eq!(reset, 1);
    assert_eq!(pool.poll_once().await, 1);
}

#[tokio::test]
async fn request_cancel_stops_a_running_job_cooperatively() {
    let dir = tempdir().unwrap();
    let clock = brain_core::SystemClock;
    let db = Arc::new(Mutex::new(open_db(&dir)));
    let job = Job::builder().job_type("cancellable").build_with_root();
    db.lock().submit(job.clone(), &clock).unwrap();

    let mut handlers = HandlerRegistry::new();
    handlers.register("cancellable", Arc::new(CancellableHandler));
    let pool = WorkerPool::new(db.clone(), handlers, Bus::new(), clock, Logger::root("test"));

    let (dispatched, _) = tokio::join!(pool.poll_once(), async {
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        pool.request_cancel(job.id).unwrap();
    });

    assert_eq!(dispatched, 1);
    assert_eq!(db.lock().get(&job.id).unwrap().status, JobStatus::Cancelled);
}
