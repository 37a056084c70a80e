// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Brain contributors

//! In-process typed pub/sub with request/response and targeted routing
//! (kernel §4.2). Delivery is synchronous: a `send` or `publish` call runs
//! every matching handler, in registration order, before returning.

use brain_core::message::{Message, Target};
use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BusError {
    #[error("no handler matched target")]
    NoHandler,
}

/// What a handler returns for a single delivered message.
#[derive(Debug, Clone)]
pub enum HandlerOutcome {
    /// The handler produced a response.
    Handled(serde_json::Value),
    /// The handler declined to participate in this broadcast.
    Noop,
    /// The handler failed; carries a human-readable cause.
    Failed(String),
}

/// Aggregated result of a [`Bus::send`] call.
#[derive(Debug, Clone, Default)]
pub struct SendOutcome {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
}

impl SendOutcome {
    fn no_handler() -> Self {
        Self { success: false, data: None, error: Some("no handler".to_string()) }
    }
}

/// Options for [`Bus::send`]; defaults match a point-to-point, non-broadcast
/// call with no explicit target (delivered to any subscriber of the topic).
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    pub source: Option<String>,
    pub target: Option<Target>,
    pub correlation_id: Option<brain_core::message::MessageId>,
    pub broadcast: bool,
}

pub type Handler = Box<dyn Fn(&Message) -> HandlerOutcome + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

struct Subscription {
    id: SubscriptionId,
    topic: String,
    filter: Option<String>,
    handler: Handler,
}

/// Matches a target filter like `"cli:*"` against a subscriber key such as
/// `"plugin:cli"` or `"interface:cli"`. A trailing `*` matches any suffix;
/// anything else requires an exact match.
fn filter_matches(filter: &str, key: &str) -> bool {
    match filter.strip_suffix('*') {
        Some(prefix) => key.starts_with(prefix),
        None => filter == key,
    }
}

fn target_key(target: &Target) -> String {
    match target {
        Target::Broadcast => "broadcast".to_string(),
        Target::Plugin { plugin_id } => format!("plugin:{plugin_id}"),
        Target::Interface { interface_id } => format!("interface:{interface_id}"),
    }
}

#[derive(Default)]
struct BusState {
    subscriptions: Vec<Subscription>,
}

/// Process-internal message bus. Cheap to clone; clones share the same
/// subscriber registry.
#[derive(Clone)]
pub struct Bus {
    state: Arc<Mutex<BusState>>,
    next_id: Arc<AtomicU64>,
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus {
    pub fn new() -> Self {
        Self { state: Arc::new(Mutex::new(BusState::default())), next_id: Arc::new(AtomicU64::new(1)) }
    }

    /// Register a handler for `topic`. `filter`, if given, is matched against
    /// the addressing key of a message's [`Target`] (see [`filter_matches`]);
    /// a subscription with no filter receives every message on the topic.
    /// Returns an id that [`Bus::unsubscribe`] removes.
    pub fn subscribe(&self, topic: impl Into<String>, filter: Option<String>, handler: Handler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.state.lock().subscriptions.push(Subscription { id, topic: topic.into(), filter, handler });
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.state.lock().subscriptions.retain(|s| s.id != id);
    }

    /// Fire-and-forget broadcast: every matching handler runs, but responses
    /// and failures are only logged, never returned to the caller.
    pub fn publish(&self, topic: impl Into<String>, payload: serde_json::Value, source: Option<String>) {
        let outcome = self.send(
            topic,
            payload,
            SendOptions { source, target: None, correlation_id: None, broadcast: true },
        );
        if let Some(error) = outcome.error {
            tracing::warn!(error, "publish had failing subscribers");
        }
    }

    /// Deliver a message to every subscriber of `topic` whose filter matches
    /// `opts.target` (or to all subscribers of the topic if no target was
    /// given). See module docs for broadcast vs point-to-point aggregation.
    pub fn send(&self, topic: impl Into<String>, payload: serde_json::Value, opts: SendOptions) -> SendOutcome {
        let topic = topic.into();
        let target = opts.target.clone().unwrap_or(Target::Broadcast);
        let message = Message {
            id: brain_core::message::MessageId::new(),
            topic: topic.clone(),
            sender: opts.source.unwrap_or_else(|| "system".to_string()),
            target: target.clone(),
            payload,
            reply_to: opts.correlation_id,
            published: chrono::Utc::now(),
        };

        let matching: Vec<usize> = {
            let state = self.state.lock();
            state
                .subscriptions
                .iter()
                .enumerate()
                .filter(|(_, s)| s.topic == topic)
                .filter(|(_, s)| match &s.filter {
                    Some(f) => filter_matches(f, &target_key(&target)),
                    None => true,
                })
                .map(|(i, _)| i)
                .collect()
        };

        if matching.is_empty() {
            if opts.broadcast {
                return SendOutcome { success: true, data: None, error: None };
            }
            return SendOutcome::no_handler();
        }

        let mut results = Vec::with_capacity(matching.len());
        for idx in &matching {
            let outcome = self.invoke(*idx, &message);
            if let Some(outcome) = outcome {
                results.push(outcome);
            }
        }

        if !opts.broadcast {
            return match results.into_iter().next() {
                Some(HandlerOutcome::Handled(data)) => SendOutcome { success: true, data: Some(data), error: None },
                Some(HandlerOutcome::Failed(error)) => SendOutcome { success: false, data: None, error: Some(error) },
                Some(HandlerOutcome::Noop) | None => SendOutcome::no_handler(),
            };
        }

        let mut data = Vec::new();
        let mut errors = Vec::new();
        for outcome in results {
            match outcome {
                HandlerOutcome::Handled(value) => data.push(value),
                HandlerOutcome::Failed(error) => errors.push(error),
                HandlerOutcome::Noop => {}
            }
        }
        SendOutcome {
            success: errors.is_empty(),
            data: if data.is_empty() { None } else { Some(serde_json::Value::Array(data)) },
            error: if errors.is_empty() { None } else { Some(errors.join("; ")) },
        }
    }

    /// Invoke a single subscriber by registry index, converting a panic into
    /// a `Failed` outcome so one bad handler never stops delivery to others.
    fn invoke(&self, idx: usize, message: &Message) -> Option<HandlerOutcome> {
        let state = self.state.lock();
        let sub = state.subscriptions.get(idx)?;
        let topic = sub.topic.clone();
        let result = catch_unwind(AssertUnwindSafe(|| (sub.handler)(message)));
        drop(state);
        match result {
            Ok(outcome) => {
                if let HandlerOutcome::Failed(ref error) = outcome {
                    tracing::error!(topic, error, "handler failed");
                }
                Some(outcome)
            }
            Err(_) => {
                tracing::error!(topic, "handler panicked");
                Some(HandlerOutcome::Failed("handler panicked".to_string()))
            }
        }
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
