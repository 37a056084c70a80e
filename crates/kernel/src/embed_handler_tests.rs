// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Brain contributors

use super::*;
use crate::test_support;

fn job(job_type: &str, payload: serde_json::Value, shared: &SharedHandles) -> Job {
    Job::new_root(job_type, payload, shared.clock.now())
}

fn reporter(job: &Job, bus: brain_bus::Bus) -> ProgressReporter {
    ProgressReporter::new(job.id, job.root_job_id, bus, Arc::new(std::sync::atomic::AtomicBool::new(false)))
}

#[tokio::test]
async fn embed_entity_writes_back_a_vector_from_the_gateway() {
    let fixture = test_support::build();
    let shared = fixture.shared.clone();
    let entity = shared
        .entities
        .lock()
        .create_entity(
            brain_registry::NewEntity {
                entity_type: "note".to_string(),
                id: None,
                content: "hello world".to_string(),
                metadata: Default::default(),
            },
            brain_registry::UpsertOptions { skip_embeddings: true, ..Default::default() },
            shared.clock.as_ref(),
        )
        .unwrap();

    let handler = EmbedEntityHandler::new(shared.clone());
    let job = job("embed-entity", serde_json::json!({ "entityId": entity.id.to_string() }), &shared);
    let reporter = reporter(&job, shared.bus.clone());

    handler.handle(&job, &reporter).await.unwrap();

    let stored = shared.entities.lock().get(&entity.id).cloned().unwrap();
    assert!(stored.embedding.is_some());
    assert_eq!(fixture.gateway.prompts().len(), 0);
}

#[tokio::test]
async fn embed_entity_missing_id_field_is_a_validation_error() {
    let fixture = test_support::build();
    let handler = EmbedEntityHandler::new(fixture.shared.clone());
    let job = job("embed-entity", serde_json::json!({}), &fixture.shared);
    let reporter = reporter(&job, fixture.shared.bus.clone());

    let err = handler.handle(&job, &reporter).await.unwrap_err();
    assert_eq!(err.kind(), "validation");
}

#[tokio::test]
async fn embed_entity_unknown_entity_is_not_found() {
    let fixture = test_support::build();
    let handler = EmbedEntityHandler::new(fixture.shared.clone());
    let job = job("embed-entity", serde_json::json!({ "entityId": EntityId::new().to_string() }), &fixture.shared);
    let reporter = reporter(&job, fixture.shared.bus.clone());

    let err = handler.handle(&job, &reporter).await.unwrap_err();
    assert_eq!(err.kind(), "not_found");
}

#[tokio::test]
async fn embed_entities_batch_reports_only_the_entities_actually_embedded() {
    let fixture = test_support::build();
    let shared = fixture.shared.clone();
    let mut ids = Vec::new();
    for content in ["a", "b", "c"] {
        let entity = shared
            .entities
            .lock()
            .create_entity(
                brain_registry::NewEntity {
                    entity_type: "note".to_string(),
                    id: None,
                    content: content.to_string(),
                    metadata: Default::default(),
                },
                brain_registry::UpsertOptions { skip_embeddings: true, ..Default::default() },
                shared.clock.as_ref(),
            )
            .unwrap();
        ids.push(entity.id.to_string());
    }
    ids.push(EntityId::new().to_string());

    let handler = EmbedEntityHandler::new(shared.clone());
    let job = job("embed-entities-batch", serde_json::json!({ "entityIds": ids }), &shared);
    let reporter = reporter(&job, shared.bus.clone());

    let result = handler.handle(&job, &reporter).await.unwrap();
    assert_eq!(result["embedded"], serde_json::json!(3));
    assert_eq!(result["total"], serde_json::json!(4));

    for id in &ids[..3] {
        let entity_id = EntityId::from_string(id);
        let stored = shared.entities.lock().get(&entity_id).cloned().unwrap();
        assert!(stored.embedding.is_some());
    }
}
