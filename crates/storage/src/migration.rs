// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Brain contributors

//! Forward-only migration of persisted snapshots between schema
//! versions.

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MigrationError {
    #[error("snapshot version {0} is newer than the running binary's version {1}")]
    TooNew(u32, u32),
    #[error("no migration path from version {0} to {1}")]
    NoPath(u32, u32),
    #[error("migration from {0} to {1} failed: {2}")]
    Failed(u32, u32, String),
}

/// A single version-to-version upgrade step, applied in place to the
/// snapshot's raw JSON.
pub trait Migration: Send + Sync {
    fn source_version(&self) -> u32;
    fn target_version(&self) -> u32;
    fn migrate(&self, snapshot: &mut Value) -> Result<(), MigrationError>;
}

/// Chains registered [`Migration`]s to carry a snapshot from whatever
/// version it was written at up to `current_version`.
#[derive(Default)]
pub struct MigrationRegistry {
    pub(crate) migrations: Vec<Box<dyn Migration>>,
}

impl MigrationRegistry {
    pub fn new() -> Self {
        Self { migrations: Vec::new() }
    }

    pub fn register(&mut self, migration: Box<dyn Migration>) {
        self.migrations.push(migration);
    }

    /// Apply the chain of migrations needed to bring `snapshot` (which
    /// carries its own `"v"` field) up to `current_version`.
    pub fn migrate_to(&self, mut snapshot: Value, current_version: u32) -> Result<Value, MigrationError> {
        let mut version = snapshot.get("v").and_then(Value::as_u64).unwrap_or(0) as u32;

        if version > current_version {
            return Err(MigrationError::TooNew(version, current_version));
        }

        while version < current_version {
            let step = self
                .migrations
                .iter()
                .find(|m| m.source_version() == version)
                .ok_or(MigrationError::NoPath(version, current_version))?;

            step.migrate(&mut snapshot).map_err(|_| MigrationError::Failed(version, step.target_version(), "migration step failed".into()))?;
            version = step.target_version();
            if let Some(obj) = snapshot.as_object_mut() {
                obj.insert("v".into(), version.into());
            }
        }

        Ok(snapshot)
    }
}

#[cfg(test)]
#[path = "migration_tests.rs"]
mod tests;
