// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Brain contributors

//! Shared test fixture: a fully-wired [`SharedHandles`] backed by
//! temp-directory stores and a [`FakeClock`], reused across this crate's
//! test modules.

#![cfg(test)]

use crate::context::SharedHandles;
use brain_bus::Bus;
use brain_core::{Clock, FakeClock};
use brain_daemon::DaemonRegistry;
use brain_engine::HandlerRegistry;
use brain_registry::{EntityRegistry, FakeAiGateway, TemplateRegistry};
use brain_storage::{ConversationDb, EntityDb, JobDb};
use parking_lot::Mutex;
use std::sync::Arc;
use tempfile::TempDir;

pub(crate) struct Fixture {
    pub shared: Arc<SharedHandles>,
    pub clock: FakeClock,
    pub gateway: Arc<FakeAiGateway>,
    // Held so the backing directory outlives the stores that reference it.
    _dir: TempDir,
}

pub(crate) fn build() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let entity_db = EntityDb::open(&dir.path().join("entities.wal"), &dir.path().join("entities.snap")).unwrap();
    let job_db = JobDb::open(&dir.path().join("jobs.wal"), &dir.path().join("jobs.snap")).unwrap();
    let conversation_db =
        ConversationDb::open(&dir.path().join("conversations.wal"), &dir.path().join("conversations.snap")).unwrap();

    let bus = Bus::new();
    let jobs = Arc::new(Mutex::new(job_db));
    let clock = FakeClock::new();
    let clock_handle: Arc<dyn Clock> = Arc::new(clock.clone());
    let gateway = Arc::new(FakeAiGateway::new());

    let shared = Arc::new(SharedHandles {
        entities: Mutex::new(EntityRegistry::new(entity_db, jobs.clone(), bus.clone())),
        templates: Arc::new(TemplateRegistry::new(gateway.clone())),
        jobs,
        handlers: Mutex::new(HandlerRegistry::new()),
        daemons: tokio::sync::Mutex::new(DaemonRegistry::new(bus.clone(), clock_handle.clone())),
        bus,
        conversations: Mutex::new(conversation_db),
        clock: clock_handle,
        gateway: gateway.clone(),
    });

    Fixture { shared, clock, gateway, _dir: dir }
}
