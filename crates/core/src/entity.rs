// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Brain contributors

//! The entity data model (kernel §3.1).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

crate::define_id! {
    /// Globally unique identifier for an entity, scoped by `entityType`.
    ///
    /// Plugins may supply their own string (wrapped via `EntityId::from_string`)
    /// or let the kernel generate one.
    pub struct EntityId("ent-");
}

/// A schema-validated, content-addressed record persisted as
/// Markdown+frontmatter.
///
/// Invariant: one row per `(entity_type, id)`; `entity_type` must be
/// registered before write; `content` must parse under the adapter's schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Entity {
    pub id: EntityId,
    pub entity_type: String,
    pub content: String,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub content_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl Entity {
    /// Compute the canonical content hash (§4.3) — a stable, order-independent
    /// hash over the UTF-8 bytes of `content`.
    pub fn hash_content(content: &str) -> String {
        // FNV-1a: deterministic, dependency-free, stable across platforms.
        let mut hash: u64 = 0xcbf29ce484222325;
        for byte in content.as_bytes() {
            hash ^= *byte as u64;
            hash = hash.wrapping_mul(0x100000001b3);
        }
        format!("{hash:016x}")
    }

    /// True when `new_content`'s hash matches the stored hash — the signal
    /// used by `upsert_entity` to skip a no-op rewrite.
    pub fn content_unchanged(&self, new_content: &str) -> bool {
        self.content_hash == Self::hash_content(new_content)
    }
}

crate::builder! {
    pub struct EntityBuilder => Entity {
        into {
            entity_type: String = "note",
            content: String = "",
            content_hash: String = "",
        }
        set {
            metadata: HashMap<String, serde_json::Value> = HashMap::new(),
        }
        option {
            embedding: Vec<f32> = None,
        }
        computed {
            id: EntityId = EntityId::new(),
            created: DateTime<Utc> = Utc::now(),
            updated: DateTime<Utc> = Utc::now(),
        }
    }
}

/// One row in a batch entity operation's failure list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchFailure<T> {
    pub input: T,
    pub index: usize,
    pub error: String,
}

/// Aggregate result of a batch entity operation (§4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult<T> {
    pub succeeded: Vec<Entity>,
    pub failed: Vec<BatchFailure<T>>,
    pub total: usize,
    pub success_count: usize,
    pub failure_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
}

impl<T> BatchResult<T> {
    pub fn new(succeeded: Vec<Entity>, failed: Vec<BatchFailure<T>>, job_id: Option<String>) -> Self {
        let success_count = succeeded.len();
        let failure_count = failed.len();
        Self {
            total: success_count + failure_count,
            succeeded,
            failed,
            success_count,
            failure_count,
            job_id,
        }
    }
}

/// Filter/sort options for [`crate::entity`] listing operations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListOptions {
    #[serde(default)]
    pub filter: Option<serde_json::Value>,
    #[serde(default)]
    pub sort: Option<SortOrder>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    UpdatedAsc,
    UpdatedDesc,
    CreatedAsc,
    CreatedDesc,
}

/// Parameters for [`crate::entity`] full-text-ish search.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub entity_type: Option<String>,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub sort: Option<SortOrder>,
}

#[cfg(test)]
#[path = "entity_tests.rs"]
mod tests;
