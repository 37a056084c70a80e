// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Brain contributors

use super::*;

#[test]
fn hash_content_is_deterministic() {
    assert_eq!(Entity::hash_content("hello"), Entity::hash_content("hello"));
    assert_ne!(Entity::hash_content("hello"), Entity::hash_content("world"));
}

#[test]
fn content_unchanged_detects_match() {
    let entity = Entity::builder().content("hello").content_hash(Entity::hash_content("hello")).build();
    assert!(entity.content_unchanged("hello"));
    assert!(!entity.content_unchanged("goodbye"));
}

#[test]
fn builder_generates_distinct_ids() {
    let a = Entity::builder().build();
    let b = Entity::builder().build();
    assert_ne!(a.id, b.id);
    assert!(a.id.as_str().starts_with("ent-"));
}

#[test]
fn batch_result_computes_counts() {
    let succeeded = vec![Entity::builder().build()];
    let failed = vec![BatchFailure { input: "bad", index: 1, error: "boom".into() }];
    let result = BatchResult::new(succeeded, failed, Some("job-xyz".into()));
    assert_eq!(result.total, 2);
    assert_eq!(result.success_count, 1);
    assert_eq!(result.failure_count, 1);
}
