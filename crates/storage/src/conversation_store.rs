// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Brain contributors

//! Event-sourced conversation memory store (kernel §3.7, §4.10, §6).

use crate::migration::MigrationRegistry;
use crate::store::{Fold, Store, StoreError};
use brain_core::{ChatMessage, Clock, Conversation, ConversationId, KernelError, Topic};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const CONVERSATION_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ConversationEvent {
    MessageAppended { id: ConversationId, message: ChatMessage },
    WindowSummarized { id: ConversationId, topic: Topic, merge_threshold: f32 },
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ConversationState {
    conversations: IndexMap<ConversationId, Conversation>,
}

impl Fold<ConversationEvent> for ConversationState {
    fn apply(&mut self, event: &ConversationEvent) {
        match event {
            ConversationEvent::MessageAppended { id, message } => {
                let now = message.timestamp;
                let convo = self.conversations.entry(id.clone()).or_insert_with(|| Conversation::new(id.clone(), now));
                convo.push(message.clone());
            }
            ConversationEvent::WindowSummarized { id, topic, merge_threshold } => {
                if let Some(convo) = self.conversations.get_mut(id) {
                    convo.window.clear();
                    convo.merge_topic(topic.clone(), *merge_threshold);
                }
            }
        }
    }
}

impl ConversationState {
    pub fn get(&self, id: &ConversationId) -> Option<&Conversation> {
        self.conversations.get(id)
    }
}

/// Typed wrapper over the conversation [`Store`]: append a turn, check
/// whether the sliding window is due for summarization, and fold a
/// distilled topic back in (§4.10).
pub struct ConversationDb {
    store: Store<ConversationState, ConversationEvent>,
}

impl ConversationDb {
    pub fn open(wal_path: &Path, snapshot_path: &Path) -> Result<Self, StoreError> {
        let store = Store::open(wal_path, snapshot_path, CONVERSATION_SCHEMA_VERSION, MigrationRegistry::new())?;
        Ok(Self { store })
    }

    pub fn get(&self, id: &ConversationId) -> Option<&Conversation> {
        self.store.state().get(id)
    }

    pub fn append_message(&mut self, id: ConversationId, message: ChatMessage, clock: &dyn Clock) -> Result<(), KernelError> {
        self.store
            .append(ConversationEvent::MessageAppended { id, message }, clock)
            .map_err(|e| KernelError::handler("conversation store append failed").with_context("cause", e.to_string()))?;
        Ok(())
    }

    pub fn summarize_window(
        &mut self,
        id: ConversationId,
        topic: Topic,
        merge_threshold: f32,
        clock: &dyn Clock,
    ) -> Result<(), KernelError> {
        self.store
            .append(ConversationEvent::WindowSummarized { id, topic, merge_threshold }, clock)
            .map_err(|e| KernelError::handler("conversation store append failed").with_context("cause", e.to_string()))?;
        Ok(())
    }

    pub fn snapshot(&mut self, clock: &dyn Clock) -> Result<(), StoreError> {
        self.store.snapshot(clock)
    }
}

#[cfg(test)]
#[path = "conversation_store_tests.rs"]
mod tests;
