// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Brain contributors

use super::*;
use brain_core::message::Target;
use parking_lot::Mutex as StdMutex;
use std::sync::Arc;

#[test]
fn publish_reaches_every_subscriber() {
    let bus = Bus::new();
    let seen = Arc::new(StdMutex::new(Vec::new()));

    for tag in ["a", "b"] {
        let seen = seen.clone();
        let tag = tag.to_string();
        bus.subscribe(
            "entity:updated",
            None,
            Box::new(move |_msg| {
                seen.lock().push(tag.clone());
                HandlerOutcome::Noop
            }),
        );
    }

    bus.publish("entity:updated", serde_json::json!({"entityId": "n1"}), None);
    assert_eq!(*seen.lock(), vec!["a".to_string(), "b".to_string()]);
}

#[test]
fn send_without_target_returns_no_handler_when_empty() {
    let bus = Bus::new();
    let outcome = bus.send("job-progress", serde_json::Value::Null, SendOptions::default());
    assert!(!outcome.success);
    assert_eq!(outcome.error.as_deref(), Some("no handler"));
}

#[test]
fn send_point_to_point_returns_handler_response() {
    let bus = Bus::new();
    bus.subscribe(
        "shell:query",
        None,
        Box::new(|_msg| HandlerOutcome::Handled(serde_json::json!({"answer": 42}))),
    );

    let outcome = bus.send("shell:query", serde_json::Value::Null, SendOptions::default());
    assert!(outcome.success);
    assert_eq!(outcome.data, Some(serde_json::json!({"answer": 42})));
}

#[test]
fn filter_restricts_delivery_to_matching_target() {
    let bus = Bus::new();
    let cli_seen = Arc::new(StdMutex::new(false));
    let slack_seen = Arc::new(StdMutex::new(false));

    {
        let cli_seen = cli_seen.clone();
        bus.subscribe(
            "job-progress",
            Some("cli:*".to_string()),
            Box::new(move |_msg| {
                *cli_seen.lock() = true;
                HandlerOutcome::Noop
            }),
        );
    }
    {
        let slack_seen = slack_seen.clone();
        bus.subscribe(
            "job-progress",
            Some("slack:*".to_string()),
            Box::new(move |_msg| {
                *slack_seen.lock() = true;
                HandlerOutcome::Noop
            }),
        );
    }

    bus.send(
        "job-progress",
        serde_json::Value::Null,
        SendOptions {
            target: Some(Target::Interface { interface_id: "cli".to_string() }),
            broadcast: true,
            ..Default::default()
        },
    );

    assert!(*cli_seen.lock());
    assert!(!*slack_seen.lock());
}

#[test]
fn failing_handler_does_not_block_the_next_one() {
    let bus = Bus::new();
    let second_ran = Arc::new(StdMutex::new(false));

    bus.subscribe("topic", None, Box::new(|_msg| HandlerOutcome::Failed("boom".to_string())));
    {
        let second_ran = second_ran.clone();
        bus.subscribe(
            "topic",
            None,
            Box::new(move |_msg| {
                *second_ran.lock() = true;
                HandlerOutcome::Handled(serde_json::Value::Null)
            }),
        );
    }

    let outcome = bus.send(
        "topic",
        serde_json::Value::Null,
        SendOptions { broadcast: true, ..Default::default() },
    );

    assert!(*second_ran.lock());
    assert!(!outcome.success);
    assert_eq!(outcome.error.as_deref(), Some("boom"));
}

#[test]
fn unsubscribe_stops_delivery() {
    let bus = Bus::new();
    let seen = Arc::new(StdMutex::new(0));
    let seen_clone = seen.clone();
    let id = bus.subscribe(
        "topic",
        None,
        Box::new(move |_msg| {
            *seen_clone.lock() += 1;
            HandlerOutcome::Noop
        }),
    );

    bus.publish("topic", serde_json::Value::Null, None);
    bus.unsubscribe(id);
    bus.publish("topic", serde_json::Value::Null, None);

    assert_eq!(*seen.lock(), 1);
}

#[test]
fn reply_to_carries_correlation_id() {
    let bus = Bus::new();
    let received = Arc::new(StdMutex::new(None));
    let received_clone = received.clone();
    bus.subscribe(
        "response",
        None,
        Box::new(move |msg| {
            *received_clone.lock() = msg.reply_to;
            HandlerOutcome::Noop
        }),
    );

    let correlation = brain_core::message::MessageId::new();
    bus.send(
        "response",
        serde_json::Value::Null,
        SendOptions { correlation_id: Some(correlation), broadcast: true, ..Default::default() },
    );

    assert_eq!(*received.lock(), Some(correlation));
}
