// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Brain contributors

//! Built-in handler for the `embed-entity`/`embed-entities-batch` job
//! types the entity registry enqueues on every write (§4.3). Registered
//! by the kernel itself at boot, not by a plugin — every entity write
//! needs embeddings regardless of which plugins are loaded.

use crate::context::SharedHandles;
use async_trait::async_trait;
use brain_core::{EntityId, Job, KernelError};
use brain_engine::{progress::ProgressReporter, JobHandler};
use std::sync::Arc;

pub(crate) struct EmbedEntityHandler {
    shared: Arc<SharedHandles>,
}

impl EmbedEntityHandler {
    pub(crate) fn new(shared: Arc<SharedHandles>) -> Self {
        Self { shared }
    }
}

#[async_trait]
impl JobHandler for EmbedEntityHandler {
    async fn handle(&self, job: &Job, progress: &ProgressReporter) -> Result<serde_json::Value, KernelError> {
        match job.job_type.as_str() {
            "embed-entity" => {
                let entity_id = job
                    .payload
                    .get("entityId")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| KernelError::validation("embed-entity job missing entityId"))?;
                let id = EntityId::from_string(entity_id);
                self.embed_and_store(&id).await?;
                progress.report(1, 1, None, Some("embed-entity".to_string()));
                Ok(serde_json::json!({ "entityId": entity_id }))
            }
            "embed-entities-batch" => {
                let ids: Vec<String> = job
                    .payload
                    .get("entityIds")
                    .and_then(|v| v.as_array())
                    .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
                    .ok_or_else(|| KernelError::validation("embed-entities-batch job missing entityIds"))?;
                let total = ids.len() as u64;
                let mut processed = 0u64;
                let mut embedded = 0u64;
                for raw_id in &ids {
                    let id = EntityId::from_string(raw_id);
                    match self.embed_and_store(&id).await {
                        Ok(()) => embedded += 1,
                        Err(e) => tracing::warn!(entity_id = raw_id, error = %e, "failed to embed entity in batch"),
                    }
                    processed += 1;
                    progress.report(processed, total, None, Some("embed-entities-batch".to_string()));
                }
                Ok(serde_json::json!({ "embedded": embedded, "total": total }))
            }
            other => Err(KernelError::not_found(format!("embed handler has no case for job type {other}"))),
        }
    }
}

impl EmbedEntityHandler {
    async fn embed_and_store(&self, id: &EntityId) -> Result<(), KernelError> {
        let content = {
            let entities = self.shared.entities.lock();
            entities.get(id).map(|e| e.content.clone())
        };
        let Some(content) = content else {
            return Err(KernelError::not_found(format!("entity {id} not found")));
        };
        let embedding = self.shared.gateway.generate_embedding(&content).await?;
        self.shared.entities.lock().set_embedding(id, embedding, self.shared.clock.as_ref())
    }
}

#[cfg(test)]
#[path = "embed_handler_tests.rs"]
mod tests;
