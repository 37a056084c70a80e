// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Brain contributors

//! Event-sourced entity store (kernel §3.1, §4.3, §6).

use crate::migration::MigrationRegistry;
use crate::store::{Fold, Store, StoreError};
use brain_core::{Clock, Entity, EntityId, KernelError, ListOptions, SearchQuery, SortOrder};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const ENTITY_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EntityEvent {
    Upserted(Box<Entity>),
    Deleted(EntityId),
}

/// Materialized entity table: insertion order preserved so listing
/// without an explicit sort is stable across recovery.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct EntityState {
    entities: IndexMap<EntityId, Entity>,
}

impl Fold<EntityEvent> for EntityState {
    fn apply(&mut self, event: &EntityEvent) {
        match event {
            EntityEvent::Upserted(entity) => {
                self.entities.insert(entity.id, (**entity).clone());
            }
            EntityEvent::Deleted(id) => {
                self.entities.shift_remove(id);
            }
        }
    }
}

impl EntityState {
    pub fn get(&self, id: &EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn list(&self, entity_type: &str, options: &ListOptions) -> Vec<Entity> {
        let mut rows: Vec<Entity> = self.entities.values().filter(|e| e.entity_type == entity_type).cloned().collect();

        match options.sort {
            Some(SortOrder::UpdatedAsc) => rows.sort_by_key(|e| e.updated),
            Some(SortOrder::UpdatedDesc) => rows.sort_by_key(|e| std::cmp::Reverse(e.updated)),
            Some(SortOrder::CreatedAsc) => rows.sort_by_key(|e| e.created),
            Some(SortOrder::CreatedDesc) => rows.sort_by_key(|e| std::cmp::Reverse(e.created)),
            None => {}
        }

        let offset = options.offset.unwrap_or(0);
        let rows: Vec<Entity> = rows.into_iter().skip(offset).collect();
        match options.limit {
            Some(limit) => rows.into_iter().take(limit).collect(),
            None => rows,
        }
    }

    pub fn search(&self, query: &SearchQuery) -> Vec<Entity> {
        let mut rows: Vec<Entity> = self
            .entities
            .values()
            .filter(|e| query.entity_type.as_deref().map_or(true, |t| e.entity_type == t))
            .filter(|e| match &query.query {
                Some(q) => e.content.to_lowercase().contains(&q.to_lowercase()),
                None => true,
            })
            .cloned()
            .collect();

        if matches!(query.sort, Some(SortOrder::UpdatedDesc) | None) {
            rows.sort_by_key(|e| std::cmp::Reverse(e.updated));
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        rows
    }
}

/// Thin typed wrapper around [`Store`] exposing the entity CRUD surface
/// (§4.3) instead of the raw event-sourcing primitives.
pub struct EntityDb {
    store: Store<EntityState, EntityEvent>,
}

impl EntityDb {
    pub fn open(wal_path: &Path, snapshot_path: &Path) -> Result<Self, StoreError> {
        let store = Store::open(wal_path, snapshot_path, ENTITY_SCHEMA_VERSION, MigrationRegistry::new())?;
        Ok(Self { store })
    }

    pub fn get(&self, id: &EntityId) -> Option<&Entity> {
        self.store.state().get(id)
    }

    pub fn list(&self, entity_type: &str, options: &ListOptions) -> Vec<Entity> {
        self.store.state().list(entity_type, options)
    }

    pub fn search(&self, query: &SearchQuery) -> Vec<Entity> {
        self.store.state().search(query)
    }

    /// Insert or update an entity. A no-op content hash match still logs
    /// the event (callers decide whether to skip the call entirely via
    /// [`Entity::content_unchanged`] before reaching here).
    pub fn upsert(&mut self, entity: Entity, clock: &dyn Clock) -> Result<Entity, KernelError> {
        let stored = entity.clone();
        self.store
            .append(EntityEvent::Upserted(Box::new(entity)), clock)
            .map_err(|e| KernelError::handler("entity store append failed").with_context("cause", e.to_string()))?;
        Ok(stored)
    }

    pub fn delete(&mut self, id: EntityId, clock: &dyn Clock) -> Result<(), KernelError> {
        if self.store.state().get(&id).is_none() {
            return Err(KernelError::not_found(format!("entity {id} not found")));
        }
        self.store
            .append(EntityEvent::Deleted(id), clock)
            .map_err(|e| KernelError::handler("entity store append failed").with_context("cause", e.to_string()))?;
        Ok(())
    }

    pub fn snapshot(&mut self, clock: &dyn Clock) -> Result<(), StoreError> {
        self.store.snapshot(clock)
    }
}

#[cfg(test)]
#[path = "entity_store_tests.rs"]
mod tests;
