// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Brain contributors

use super::*;
use brain_core::SystemClock;
use tempfile::tempdir;

fn paths(dir: &tempfile::TempDir) -> (std::path::PathBuf, std::path::PathBuf) {
    (dir.path().join("entities.wal"), dir.path().join("entities.snap"))
}

fn entity(content: &str) -> Entity {
    Entity::builder().entity_type("note").content(content).content_hash(Entity::hash_content(content)).build()
}

#[test]
fn upsert_then_get_round_trips() {
    let dir = tempdir().unwrap();
    let (wal, snap) = paths(&dir);
    let clock = SystemClock;
    let mut db = EntityDb::open(&wal, &snap).unwrap();

    let e = entity("hello world");
    db.upsert(e.clone(), &clock).unwrap();

    let fetched = db.get(&e.id).unwrap();
    assert_eq!(fetched.content, "hello world");
}

#[test]
fn delete_missing_entity_is_not_found() {
    let dir = tempdir().unwrap();
    let (wal, snap) = paths(&dir);
    let clock = SystemClock;
    let mut db = EntityDb::open(&wal, &snap).unwrap();

    let err = db.delete(EntityId::new(), &clock).unwrap_err();
    assert_eq!(err.kind(), "not_found");
}

#[test]
fn list_filters_by_entity_type() {
    let dir = tempdir().unwrap();
    let (wal, snap) = paths(&dir);
    let clock = SystemClock;
    let mut db = EntityDb::open(&wal, &snap).unwrap();

    db.upsert(entity("note one"), &clock).unwrap();
    let mut other = entity("task one");
    other.entity_type = "task".into();
    db.upsert(other, &clock).unwrap();

    let notes = db.list("note", &ListOptions::default());
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].content, "note one");
}

#[test]
fn search_matches_substring_case_insensitively() {
    let dir = tempdir().unwrap();
    let (wal, snap) = paths(&dir);
    let clock = SystemClock;
    let mut db = EntityDb::open(&wal, &snap).unwrap();

    db.upsert(entity("Rust is great"), &clock).unwrap();
    db.upsert(entity("Cooking pasta"), &clock).unwrap();

    let results = db.search(&SearchQuery { query: Some("rust".into()), ..Default::default() });
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].content, "Rust is great");
}

#[test]
fn reopen_recovers_entities_after_snapshot() {
    let dir = tempdir().unwrap();
    let (wal, snap) = paths(&dir);
    let clock = SystemClock;

    let id = {
        let mut db = EntityDb::open(&wal, &snap).unwrap();
        let e = entity("durable note");
        db.upsert(e.clone(), &clock).unwrap();
        db.snapshot(&clock).unwrap();
        e.id
    };

    let reopened = EntityDb::open(&wal, &snap).unwrap();
    assert_eq!(reopened.get(&id).unwrap().content, "durable note");
}
