// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Brain contributors

//! Persistence layer: a write-ahead log + periodic snapshot + forward-only
//! migration registry, materialized into three independent stores (entity,
//! job queue, conversation memory) per kernel §6.

pub mod conversation_store;
pub mod entity_store;
pub mod job_store;
pub mod migration;
pub mod snapshot;
pub mod store;
pub mod wal;

pub use conversation_store::{ConversationDb, ConversationEvent, ConversationState};
pub use entity_store::{EntityDb, EntityEvent, EntityState};
pub use job_store::{JobDb, JobEvent, JobState};
pub use migration::{Migration, MigrationError, MigrationRegistry};
pub use snapshot::{Snapshot, SnapshotError};
pub use store::{Fold, Store, StoreError};
pub use wal::{Wal, WalEntry, WalError};
