// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Brain contributors

use super::*;
use crate::test_support;
use brain_core::Role;

fn reporter(job: &brain_core::Job, bus: brain_bus::Bus) -> ProgressReporter {
    ProgressReporter::new(job.id, job.root_job_id, bus, Arc::new(std::sync::atomic::AtomicBool::new(false)))
}

#[test]
fn start_conversation_is_deterministic() {
    let fixture = test_support::build();
    let manager = ConversationManager::new(fixture.shared.clone(), 20, 30);
    let a = manager.start_conversation("slack", "C123");
    let b = manager.start_conversation("slack", "C123");
    assert_eq!(a, b);
}

#[test]
fn add_message_enqueues_summarization_once_threshold_is_crossed() {
    let fixture = test_support::build();
    let manager = ConversationManager::new(fixture.shared.clone(), 3, 30);
    let id = manager.start_conversation("slack", "C1");

    manager.add_message(id.clone(), Role::User, "hi").unwrap();
    manager.add_message(id.clone(), Role::User, "there").unwrap();
    assert_eq!(fixture.shared.jobs.lock().pending_count(), 0);

    manager.add_message(id.clone(), Role::User, "friend").unwrap();
    assert_eq!(fixture.shared.jobs.lock().pending_count(), 1);

    let messages = manager.get_messages(&id, None);
    assert_eq!(messages.len(), 3);
}

#[tokio::test]
async fn summarize_handler_creates_a_topic_entity_and_clears_the_window() {
    let fixture = test_support::build();
    let manager = ConversationManager::new(fixture.shared.clone(), 20, 30);
    let id = manager.start_conversation("slack", "C1");
    for i in 0..20 {
        manager.add_message(id.clone(), Role::User, format!("message {i}")).unwrap();
    }

    let job = fixture.shared.jobs.lock().next_pending(fixture.shared.clock.as_ref()).unwrap();
    let handler = SummarizeConversationHandler::new(fixture.shared.clone());
    let progress = reporter(&job, fixture.shared.bus.clone());
    let result = handler.handle(&job, &progress).await.unwrap();
    assert_eq!(result["topics"], serde_json::json!(1));

    let topics = fixture.shared.entities.lock().list("conversation-topic", &brain_core::ListOptions::default());
    assert_eq!(topics.len(), 1);
    assert!(topics[0].embedding.is_some());

    let convo = fixture.shared.conversations.lock().get(&id).cloned().unwrap();
    assert!(convo.window.is_empty());
    assert_eq!(convo.topics.len(), 1);
}

#[tokio::test]
async fn summarize_handler_is_a_no_op_on_an_empty_window() {
    let fixture = test_support::build();
    let id = ConversationId::new("slack", "empty");
    let handler = SummarizeConversationHandler::new(fixture.shared.clone());
    let payload = serde_json::json!({ "conversationId": id.as_str() });
    let job = Job::new_root("conversation-topic", payload, fixture.shared.clock.now());
    let progress = reporter(&job, fixture.shared.bus.clone());

    let result = handler.handle(&job, &progress).await.unwrap();
    assert_eq!(result["topics"], serde_json::json!(0));
}
