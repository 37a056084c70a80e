// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Brain contributors

//! Ties a [`Wal`], a [`Snapshot`], and a [`MigrationRegistry`] together
//! into a single recoverable store: open loads the latest snapshot (if
//! any) and replays the WAL tail on top of it; `append` durably logs an
//! event and folds it into the in-memory state; snapshotting periodically
//! checkpoints state and truncates the WAL.

use crate::migration::MigrationRegistry;
use crate::snapshot::{Snapshot, SnapshotError};
use crate::wal::{Wal, WalError};
use brain_core::Clock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Wal(#[from] WalError),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

/// Materialized, event-sourced state: built from an empty default by
/// folding events in order. Implementations must be idempotent under
/// replay — applying the same event twice (as happens across a
/// snapshot/recovery boundary) must not double-count it.
pub trait Fold<E>: Default + Clone + Serialize + DeserializeOwned {
    fn apply(&mut self, event: &E);
}

/// Take a snapshot after this many newly-appended events.
const DEFAULT_SNAPSHOT_INTERVAL: u64 = 500;

pub struct Store<S, E> {
    wal: Wal<E>,
    state: S,
    snapshot_path: PathBuf,
    schema_version: u32,
    migrations: MigrationRegistry,
    snapshot_interval: u64,
    events_since_snapshot: u64,
}

impl<S, E> Store<S, E>
where
    S: Fold<E>,
    E: Serialize + DeserializeOwned + Clone,
{
    /// Open a store at `wal_path`/`snapshot_path`, recovering state from
    /// the latest snapshot (migrated to `schema_version` if needed) and
    /// replaying any WAL entries written after it.
    pub fn open(
        wal_path: &Path,
        snapshot_path: &Path,
        schema_version: u32,
        migrations: MigrationRegistry,
    ) -> Result<Self, StoreError> {
        let snapshot = Snapshot::<S>::load(snapshot_path, schema_version, &migrations)?;
        let (mut state, processed_seq) = match snapshot {
            Some(s) => (s.state, s.seq),
            None => (S::default(), 0),
        };

        let mut wal = Wal::open(wal_path, processed_seq)?;
        for entry in wal.entries_after(processed_seq)? {
            state.apply(&entry.event);
            wal.mark_processed(entry.seq);
        }

        Ok(Self {
            wal,
            state,
            snapshot_path: snapshot_path.to_path_buf(),
            schema_version,
            migrations,
            snapshot_interval: DEFAULT_SNAPSHOT_INTERVAL,
            events_since_snapshot: 0,
        })
    }

    pub fn with_snapshot_interval(mut self, interval: u64) -> Self {
        self.snapshot_interval = interval;
        self
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    /// Durably log `event`, fold it into state, and flush/snapshot as
    /// thresholds are crossed.
    pub fn append(&mut self, event: E, clock: &dyn Clock) -> Result<u64, StoreError> {
        let seq = self.wal.append(&event)?;
        self.state.apply(&event);
        self.wal.mark_processed(seq);
        self.events_since_snapshot += 1;

        if self.wal.needs_flush() {
            self.wal.flush()?;
        }
        if self.events_since_snapshot >= self.snapshot_interval {
            self.snapshot(clock)?;
        }
        Ok(seq)
    }

    /// Force a checkpoint: write the current state to the snapshot file
    /// and truncate the WAL to entries after the checkpoint.
    pub fn snapshot(&mut self, clock: &dyn Clock) -> Result<(), StoreError> {
        self.wal.flush()?;
        let processed = self.wal.processed_seq();
        let snapshot = Snapshot::new(self.schema_version, processed, self.state.clone(), clock.now());
        snapshot.save(&self.snapshot_path)?;
        self.wal.truncate_before(processed + 1)?;
        self.events_since_snapshot = 0;
        Ok(())
    }

    /// Re-validate the migration registry is reachable for diagnostics
    /// (e.g. a `brain doctor`-style health check might call this before
    /// accepting writes).
    pub fn schema_version(&self) -> u32 {
        self.schema_version
    }

    pub fn migrations(&self) -> &MigrationRegistry {
        &self.migrations
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
