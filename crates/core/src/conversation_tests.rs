// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Brain contributors

use super::*;
use chrono::Duration;

fn msg(content: &str, ts: DateTime<Utc>) -> ChatMessage {
    ChatMessage { role: Role::User, content: content.into(), timestamp: ts }
}

#[test]
fn conversation_id_round_trips_interface_type() {
    let id = ConversationId::new("slack", "C123");
    assert_eq!(id.interface_type(), "slack");
    assert_eq!(id.as_str(), "slack:C123");
}

#[test]
fn needs_summarization_on_message_count() {
    let now = Utc::now();
    let mut convo = Conversation::new(ConversationId::new("slack", "C1"), now);
    for i in 0..5 {
        convo.push(msg(&format!("m{i}"), now));
    }
    assert!(convo.needs_summarization(5, 30, now));
    assert!(!convo.needs_summarization(10, 30, now));
}

#[test]
fn needs_summarization_on_age() {
    let start = Utc::now() - Duration::minutes(45);
    let mut convo = Conversation::new(ConversationId::new("slack", "C1"), start);
    convo.push(msg("old", start));
    assert!(convo.needs_summarization(100, 30, Utc::now()));
}

#[test]
fn cosine_similarity_identical_vectors_is_one() {
    let v = vec![1.0, 2.0, 3.0];
    assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
}

#[test]
fn cosine_similarity_orthogonal_is_zero() {
    assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
}

#[test]
fn merge_topic_folds_into_similar_existing() {
    let now = Utc::now();
    let mut convo = Conversation::new(ConversationId::new("slack", "C1"), now);
    convo.merge_topic(
        Topic { label: "rust".into(), summary: "talked about rust".into(), embedding: vec![1.0, 0.0], message_count: 3, updated: now },
        0.9,
    );
    convo.merge_topic(
        Topic { label: "rust".into(), summary: "more rust talk".into(), embedding: vec![1.0, 0.01], message_count: 2, updated: now },
        0.9,
    );
    assert_eq!(convo.topics.len(), 1);
    assert_eq!(convo.topics[0].message_count, 5);
    assert_eq!(convo.topics[0].summary, "more rust talk");
}

#[test]
fn merge_topic_appends_when_dissimilar() {
    let now = Utc::now();
    let mut convo = Conversation::new(ConversationId::new("slack", "C1"), now);
    convo.merge_topic(Topic { label: "rust".into(), summary: "a".into(), embedding: vec![1.0, 0.0], message_count: 1, updated: now }, 0.9);
    convo.merge_topic(Topic { label: "cooking".into(), summary: "b".into(), embedding: vec![0.0, 1.0], message_count: 1, updated: now }, 0.9);
    assert_eq!(convo.topics.len(), 2);
}
