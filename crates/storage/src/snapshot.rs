// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Brain contributors

//! Point-in-time snapshots of materialized state, keyed by the WAL
//! sequence number they were taken at.

use crate::migration::MigrationError;
use crate::wal::rotate_bak_path;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("migration error: {0}")]
    Migration(#[from] MigrationError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot<S> {
    #[serde(rename = "v")]
    pub version: u32,
    pub seq: u64,
    pub state: S,
    pub created_at: DateTime<Utc>,
}

impl<S> Snapshot<S>
where
    S: Serialize + DeserializeOwned,
{
    pub fn new(version: u32, seq: u64, state: S, created_at: DateTime<Utc>) -> Self {
        Self { version, seq, state, created_at }
    }

    /// Atomically write the snapshot: stage to a temp file, then rename
    /// over the destination so a crash mid-write never leaves a partial
    /// snapshot on disk.
    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        let tmp = path.with_extension("tmp");
        let mut file = File::create(&tmp)?;
        file.write_all(serde_json::to_string(self)?.as_bytes())?;
        file.flush()?;
        file.sync_data()?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Load a snapshot, migrating it to `current_version` if it was
    /// written by an older binary. A corrupt snapshot file is rotated to
    /// `.bak` and treated as absent, so recovery falls back to replaying
    /// the WAL from the beginning.
    pub fn load(
        path: &Path,
        current_version: u32,
        registry: &crate::migration::MigrationRegistry,
    ) -> Result<Option<Self>, SnapshotError> {
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(path)?;
        let value: serde_json::Value = match serde_json::from_str(&raw) {
            Ok(v) => v,
            Err(_) => {
                let bak = rotate_bak_path(path);
                fs::rename(path, &bak)?;
                return Ok(None);
            }
        };
        let migrated = registry.migrate_to(value, current_version)?;
        Ok(Some(serde_json::from_value(migrated)?))
    }
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
