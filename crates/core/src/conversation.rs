// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Brain contributors

//! Conversation memory data model (kernel §3.7, §4.10).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier for a conversation, composed from the owning interface and
/// its channel rather than generated — the same `(interface_type,
/// channel_id)` pair must always resolve to the same conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    pub fn new(interface_type: &str, channel_id: &str) -> Self {
        Self(format!("{interface_type}:{channel_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn interface_type(&self) -> &str {
        self.0.split_once(':').map(|(i, _)| i).unwrap_or(&self.0)
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
}

crate::simple_display!(Role {
    User => "user",
    Assistant => "assistant",
    System => "system",
});

/// A single turn in a conversation's message history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// A topic distilled from conversation history, carrying an embedding so
/// new summaries can be merged into it by cosine similarity instead of
/// accumulating duplicate topics (§4.10).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topic {
    pub label: String,
    pub summary: String,
    pub embedding: Vec<f32>,
    pub message_count: u32,
    pub updated: DateTime<Utc>,
}

/// Cosine similarity between two equal-length embedding vectors. Returns
/// `0.0` for a zero-magnitude vector rather than dividing by zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Sliding-window message history plus the distilled topics extracted
/// from it. `window` holds messages since the last summarization pass;
/// once it crosses the kernel's configured size/age threshold the
/// conversation manager folds it into `topics` and clears it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub window: Vec<ChatMessage>,
    pub topics: Vec<Topic>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl Conversation {
    pub fn new(id: ConversationId, now: DateTime<Utc>) -> Self {
        Self { id, window: Vec::new(), topics: Vec::new(), created: now, updated: now }
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.updated = message.timestamp;
        self.window.push(message);
    }

    /// Whether the sliding window is due for summarization under the
    /// given thresholds.
    pub fn needs_summarization(&self, message_threshold: u32, minutes_threshold: u32, now: DateTime<Utc>) -> bool {
        if self.window.len() as u32 >= message_threshold {
            return true;
        }
        match self.window.first() {
            Some(first) => (now - first.timestamp).num_minutes() >= minutes_threshold as i64,
            None => false,
        }
    }

    /// Merge a freshly distilled topic into the existing set: if an
    /// existing topic's embedding is at least `merge_threshold` similar,
    /// fold the new summary into it instead of appending a duplicate.
    pub fn merge_topic(&mut self, incoming: Topic, merge_threshold: f32) {
        let best = self
            .topics
            .iter_mut()
            .map(|t| (cosine_similarity(&t.embedding, &incoming.embedding), t))
            .filter(|(score, _)| *score >= merge_threshold)
            .max_by(|a, b| a.0.total_cmp(&b.0));

        match best {
            Some((_, existing)) => {
                existing.summary = incoming.summary;
                existing.embedding = incoming.embedding;
                existing.message_count += incoming.message_count;
                existing.updated = incoming.updated;
            }
            None => self.topics.push(incoming),
        }
    }
}

#[cfg(test)]
#[path = "conversation_tests.rs"]
mod tests;
