// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Brain contributors

//! Message bus envelope and addressing (kernel §3.6, §4.2).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Identifier for a single bus message, also used to correlate a
    /// response back to its request.
    pub struct MessageId("msg-");
}

/// Delivery target for a [`Message`].
///
/// `Broadcast` reaches every subscriber of the topic; `Plugin` reaches
/// only subscribers registered under that plugin id; `Interface` is the
/// routing surface owner-based delivery uses (§4.7) to reach whichever
/// interface plugin currently owns a given conversation/session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Target {
    Broadcast,
    Plugin { plugin_id: String },
    Interface { interface_id: String },
}

impl Target {
    /// Whether a subscriber identified by `plugin_id` should receive a
    /// message addressed to this target.
    pub fn matches(&self, plugin_id: &str) -> bool {
        match self {
            Target::Broadcast => true,
            Target::Plugin { plugin_id: p } | Target::Interface { interface_id: p } => p == plugin_id,
        }
    }
}

/// An envelope published on the message bus.
///
/// Invariant: `reply_to` is set only on a response message and names the
/// `id` of the request it answers; a request with no reply within its
/// caller-specified timeout resolves to `KernelError::Timeout` (§7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub topic: String,
    pub sender: String,
    pub target: Target,
    pub payload: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<MessageId>,
    pub published: DateTime<Utc>,
}

crate::builder! {
    pub struct MessageBuilder => Message {
        into {
            topic: String = "default",
            sender: String = "system",
        }
        set {
            target: Target = Target::Broadcast,
            payload: serde_json::Value = serde_json::Value::Null,
        }
        option {
            reply_to: MessageId = None,
        }
        computed {
            id: MessageId = MessageId::new(),
            published: DateTime<Utc> = Utc::now(),
        }
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
