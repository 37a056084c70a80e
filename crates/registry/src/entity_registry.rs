// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Brain contributors

//! Schema-validated entity CRUD, content-hash change detection, and
//! embedding-job enqueueing over [`EntityDb`] (§4.3).

use brain_bus::Bus;
use brain_core::{BatchFailure, BatchResult, Clock, Entity, EntityId, Job, KernelError, ListOptions, SearchQuery};
use brain_storage::{EntityDb, JobDb};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Default number of entities enqueued as a single deferred embedding job.
pub const DEFAULT_EMBED_BATCH_SIZE: usize = 100;

/// Per-`entity_type` content validator, checked before every write.
/// Concrete adapters (Markdown+frontmatter, the structured formatter)
/// implement this against their own schema.
pub trait EntityValidator: Send + Sync {
    fn validate(&self, content: &str) -> Result<(), Vec<String>>;
}

/// Input to a single create/upsert call.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct NewEntity {
    pub entity_type: String,
    pub id: Option<EntityId>,
    pub content: String,
    pub metadata: HashMap<String, serde_json::Value>,
}

/// Controls embedding-job enqueueing for a write.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpsertOptions {
    /// Never enqueue an embedding job for this write.
    pub skip_embeddings: bool,
    /// In a batch call, enqueue one embedding job per chunk of entities
    /// rather than one per entity.
    pub defer_embeddings: bool,
    /// Write even if the content hash is unchanged.
    pub force: bool,
}

pub struct EntityRegistry {
    db: EntityDb,
    jobs: Arc<Mutex<JobDb>>,
    bus: Bus,
    validators: HashMap<String, Arc<dyn EntityValidator>>,
}

impl EntityRegistry {
    pub fn new(db: EntityDb, jobs: Arc<Mutex<JobDb>>, bus: Bus) -> Self {
        Self { db, jobs, bus, validators: HashMap::new() }
    }

    pub fn unregister_validator(&mut self, entity_type: &str) {
        self.validators.remove(entity_type);
    }

    pub fn register_validator(&mut self, entity_type: impl Into<String>, validator: Arc<dyn EntityValidator>) {
        self.validators.insert(entity_type.into(), validator);
    }

    pub fn get(&self, id: &EntityId) -> Option<&Entity> {
        self.db.get(id)
    }

    pub fn list(&self, entity_type: &str, options: &ListOptions) -> Vec<Entity> {
        self.db.list(entity_type, options)
    }

    pub fn search(&self, query: &SearchQuery) -> Vec<Entity> {
        self.db.search(query)
    }

    fn validate(&self, entity_type: &str, content: &str) -> Result<(), KernelError> {
        match self.validators.get(entity_type) {
            Some(validator) => validator.validate(content).map_err(|errors| {
                KernelError::validation(format!("entity content invalid: {}", errors.join("; ")))
                    .with_context("entityType", entity_type.to_string())
            }),
            None => Ok(()),
        }
    }

    /// Insert a brand-new entity (`id` is generated unless the caller
    /// supplies one) and enqueue its embedding job unless suppressed.
    pub fn create_entity(
        &mut self,
        input: NewEntity,
        options: UpsertOptions,
        clock: &dyn Clock,
    ) -> Result<Entity, KernelError> {
        self.validate(&input.entity_type, &input.content)?;
        let now = clock.now();
        let content_hash = Entity::hash_content(&input.content);
        let entity = Entity {
            id: input.id.unwrap_or_else(EntityId::new),
            entity_type: input.entity_type.clone(),
            content: input.content,
            metadata: input.metadata,
            created: now,
            updated: now,
            content_hash,
            embedding: None,
        };
        let stored = self.db.upsert(entity, clock)?;
        self.bus.publish(
            "entity:created",
            serde_json::json!({ "entityType": stored.entity_type, "entityId": stored.id.to_string() }),
            None,
        );
        if !options.skip_embeddings {
            self.enqueue_embed(&stored, clock)?;
        }
        Ok(stored)
    }

    /// Insert or update by `(entityType, id)`. A content hash match with
    /// `force: false` is a no-op that returns the existing record
    /// unchanged and skips both the write and the embedding job.
    pub fn upsert_entity(
        &mut self,
        input: NewEntity,
        options: UpsertOptions,
        clock: &dyn Clock,
    ) -> Result<Entity, KernelError> {
        self.validate(&input.entity_type, &input.content)?;
        let id = input.id.unwrap_or_else(EntityId::new);
        let now = clock.now();

        if let Some(existing) = self.db.get(&id) {
            if !options.force && existing.content_unchanged(&input.content) {
                return Ok(existing.clone());
            }
            let content_hash = Entity::hash_content(&input.content);
            let updated = Entity {
                id,
                entity_type: input.entity_type,
                content: input.content,
                metadata: input.metadata,
                created: existing.created,
                updated: now,
                content_hash,
                embedding: None,
            };
            let stored = self.db.upsert(updated, clock)?;
            self.bus.publish(
                "entity:updated",
                serde_json::json!({ "entityType": stored.entity_type, "entityId": stored.id.to_string() }),
                None,
            );
            if !options.skip_embeddings {
                self.enqueue_embed(&stored, clock)?;
            }
            return Ok(stored);
        }

        self.create_entity(
            NewEntity { entity_type: input.entity_type, id: Some(id), content: input.content, metadata: input.metadata },
            options,
            clock,
        )
    }

    /// Write a freshly computed embedding for an existing entity without
    /// touching its content, metadata, or hash, and without enqueueing
    /// another embedding job. Called by the embedding job handler once a
    /// gateway call returns a vector.
    pub fn set_embedding(&mut self, id: &EntityId, embedding: Vec<f32>, clock: &dyn Clock) -> Result<(), KernelError> {
        let Some(existing) = self.db.get(id) else {
            return Err(KernelError::not_found(format!("entity {id} not found")));
        };
        let mut updated = existing.clone();
        updated.embedding = Some(embedding);
        updated.updated = clock.now();
        self.db.upsert(updated, clock)?;
        Ok(())
    }

    pub fn delete_entity(&mut self, id: EntityId, clock: &dyn Clock) -> Result<(), KernelError> {
        let entity_type = self.db.get(&id).map(|e| e.entity_type.clone());
        self.db.delete(id, clock)?;
        if let Some(entity_type) = entity_type {
            self.bus.publish("entity:deleted", serde_json::json!({ "entityType": entity_type, "entityId": id.to_string() }), None);
        }
        Ok(())
    }

    /// Upsert a batch of entities with partial-success semantics: one
    /// failing input never aborts the rest. With `options.defer_embeddings`
    /// the successes are embedded via job(s) covering up to
    /// [`DEFAULT_EMBED_BATCH_SIZE`] entities each, and the result carries
    /// only the last such job's id (matching a single-job batch write);
    /// without it, each entity gets its own embedding job as usual.
    pub fn upsert_entities_batch(
        &mut self,
        inputs: Vec<NewEntity>,
        options: UpsertOptions,
        clock: &dyn Clock,
    ) -> BatchResult<NewEntity> {
        let mut succeeded = Vec::new();
        let mut failed = Vec::new();
        let per_entity_options = UpsertOptions { skip_embeddings: true, ..options };

        for (index, input) in inputs.into_iter().enumerate() {
            let input_for_error = input.clone();
            match self.upsert_entity(input, per_entity_options, clock) {
                Ok(entity) => succeeded.push(entity),
                Err(e) => failed.push(BatchFailure { input: input_for_error, index, error: e.to_string() }),
            }
        }

        let mut job_id = None;
        if !options.skip_embeddings && !succeeded.is_empty() {
            if options.defer_embeddings {
                for chunk in succeeded.chunks(DEFAULT_EMBED_BATCH_SIZE) {
                    match self.enqueue_embed_batch(chunk, clock) {
                        Ok(id) => job_id = Some(id),
                        Err(e) => tracing::error!(error = %e, "failed to enqueue batch embedding job"),
                    }
                }
            } else {
                for entity in &succeeded {
                    if let Err(e) = self.enqueue_embed(entity, clock) {
                        tracing::error!(error = %e, entity = %entity.id, "failed to enqueue embedding job");
                    }
                }
            }
        }

        BatchResult::new(succeeded, failed, job_id)
    }

    fn enqueue_embed(&self, entity: &Entity, clock: &dyn Clock) -> Result<(), KernelError> {
        let payload = serde_json::json!({ "entityId": entity.id.to_string(), "entityType": entity.entity_type });
        let job = Job::new_root("embed-entity", payload, clock.now());
        self.jobs.lock().submit(job, clock)?;
        Ok(())
    }

    fn enqueue_embed_batch(&self, entities: &[Entity], clock: &dyn Clock) -> Result<String, KernelError> {
        let ids: Vec<String> = entities.iter().map(|e| e.id.to_string()).collect();
        let job = Job::new_root("embed-entities-batch", serde_json::json!({ "entityIds": ids }), clock.now());
        let id = job.id;
        self.jobs.lock().submit(job, clock)?;
        Ok(id.to_string())
    }
}

#[cfg(test)]
#[path = "entity_registry_tests.rs"]
mod tests;
