// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Brain contributors

//! Conversation memory orchestration (§4.10): message ingestion,
//! threshold-triggered summarization, and topic distillation merged by
//! embedding similarity. Topics are mirrored into the Entity DB as
//! `conversation-topic` entities — the sliding-window summary job is the
//! only writer of that entity type.

use crate::context::SharedHandles;
use async_trait::async_trait;
use brain_core::{ChatMessage, Clock, ConversationId, Entity, Job, KernelError, Role, Template, TemplateKey, TemplateVariable};
use brain_engine::{JobHandler, ProgressReporter};
use brain_registry::{GenerationContext, NewEntity, UpsertOptions};
use std::sync::Arc;

/// Messages per summarization window.
const BATCH_SIZE: usize = 20;
/// Step between window starts — `BATCH_SIZE` minus a 25% overlap.
const BATCH_STEP: usize = 15;
/// Minimum cosine similarity to fold a freshly distilled topic into an
/// existing one rather than creating a new entity.
const MERGE_THRESHOLD: f32 = 0.7;

const TOPIC_ENTITY_TYPE: &str = "conversation-topic";
const TOPIC_JOB_TYPE: &str = "conversation-topic";

fn topic_template_key() -> TemplateKey {
    TemplateKey::new("kernel", "conversation-topic")
}

fn topic_template() -> Template {
    Template {
        key: topic_template_key(),
        description: "Distill a window of conversation messages into a short topic label and summary.".to_string(),
        body: "Summarize the following conversation messages into a short topic label and a \
               one-paragraph summary. Preserve any context about the user, channel, or interface \
               that the messages reveal.\n\n{messages}"
            .to_string(),
        variables: vec![TemplateVariable {
            name: "messages".to_string(),
            description: "Newline-joined `role: content` lines for this window".to_string(),
            required: true,
            default: None,
        }],
        output_entity_type: Some(TOPIC_ENTITY_TYPE.to_string()),
    }
}

fn topic_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "label": { "type": "string" },
            "summary": { "type": "string" },
        },
        "required": ["label", "summary"],
    })
}

fn role_str(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::System => "system",
    }
}

/// Split `messages` into overlapping windows of up to `batch_size`,
/// stepping by `step`. Always includes a final partial window so no
/// trailing messages are dropped.
fn sliding_windows(messages: &[ChatMessage], batch_size: usize, step: usize) -> Vec<&[ChatMessage]> {
    if messages.is_empty() {
        return Vec::new();
    }
    let mut windows = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + batch_size).min(messages.len());
        windows.push(&messages[start..end]);
        if end == messages.len() {
            break;
        }
        start += step;
    }
    windows
}

/// Front door for conversation memory: starting/resuming a conversation,
/// appending messages, and reading back recent history. Most of this is a
/// thin wrapper over [`crate::context::InterfaceContext`]'s equivalents;
/// this type additionally owns the auto-summarization trigger, since a
/// plugin-facing context has no natural place to own job-enqueueing
/// thresholds.
pub struct ConversationManager {
    shared: Arc<SharedHandles>,
    message_threshold: u32,
    minutes_threshold: u32,
}

impl ConversationManager {
    /// Registers the built-in topic-distillation template. Call once at
    /// kernel boot, before any plugin registers its own templates.
    pub fn new(shared: Arc<SharedHandles>, message_threshold: u32, minutes_threshold: u32) -> Self {
        shared.templates.register_template(topic_template());
        Self { shared, message_threshold, minutes_threshold }
    }

    pub fn start_conversation(&self, interface_type: &str, channel_id: &str) -> ConversationId {
        ConversationId::new(interface_type, channel_id)
    }

    /// Append a message and, if the sliding window has crossed its
    /// size/age threshold, enqueue a non-blocking summarization job.
    pub fn add_message(&self, id: ConversationId, role: Role, content: impl Into<String>) -> Result<(), KernelError> {
        let clock = self.shared.clock.as_ref();
        let message = ChatMessage { role, content: content.into(), timestamp: clock.now() };
        self.shared.conversations.lock().append_message(id.clone(), message, clock)?;

        let due = {
            let conversations = self.shared.conversations.lock();
            conversations
                .get(&id)
                .map(|c| c.needs_summarization(self.message_threshold, self.minutes_threshold, clock.now()))
                .unwrap_or(false)
        };
        if due {
            self.enqueue_summarization(&id, clock)?;
        }
        Ok(())
    }

    pub fn get_messages(&self, id: &ConversationId, limit: Option<usize>) -> Vec<ChatMessage> {
        let conversations = self.shared.conversations.lock();
        let Some(convo) = conversations.get(id) else { return Vec::new() };
        match limit {
            Some(limit) => convo.window.iter().rev().take(limit).rev().cloned().collect(),
            None => convo.window.clone(),
        }
    }

    fn enqueue_summarization(&self, id: &ConversationId, clock: &dyn Clock) -> Result<(), KernelError> {
        let payload = serde_json::json!({ "conversationId": id.as_str() });
        let job = Job::new_root(TOPIC_JOB_TYPE, payload, clock.now());
        self.shared.jobs.lock().submit(job, clock)?;
        Ok(())
    }
}

/// Job handler for [`TOPIC_JOB_TYPE`]: groups the conversation's pending
/// window into overlapping batches, distills each into a topic via the
/// template registry, and merges it into the matching `conversation-topic`
/// entity (by embedding similarity) or creates a new one.
pub(crate) struct SummarizeConversationHandler {
    shared: Arc<SharedHandles>,
}

impl SummarizeConversationHandler {
    pub(crate) fn new(shared: Arc<SharedHandles>) -> Self {
        Self { shared }
    }

    fn find_merge_candidate(&self, conversation_id: &str, embedding: &[f32]) -> Option<Entity> {
        let entities = self.shared.entities.lock();
        let candidates = entities.list(TOPIC_ENTITY_TYPE, &brain_core::ListOptions::default());
        candidates
            .into_iter()
            .filter(|e| e.metadata.get("conversationId").and_then(|v| v.as_str()) == Some(conversation_id))
            .filter_map(|e| {
                let score =
                    e.embedding.as_deref().map(|existing| brain_core::conversation::cosine_similarity(existing, embedding));
                score.filter(|s| *s >= MERGE_THRESHOLD).map(|s| (s, e))
            })
            .max_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, e)| e)
    }

    async fn distill(&self, messages: &[ChatMessage]) -> Result<(String, String), KernelError> {
        let joined = messages.iter().map(|m| format!("{}: {}", role_str(m.role), m.content)).collect::<Vec<_>>().join("\n");
        let mut context = GenerationContext::default();
        context.variables.insert("messages".to_string(), serde_json::Value::String(joined));
        let value = self.shared.templates.generate_content(&topic_template_key(), &context, &topic_schema()).await?;
        let label = value.get("label").and_then(|v| v.as_str()).unwrap_or("conversation").to_string();
        let summary = value.get("summary").and_then(|v| v.as_str()).unwrap_or("").to_string();
        Ok((label, summary))
    }

    async fn mirror_topic(
        &self,
        conversation_id: &str,
        interface_type: &str,
        label: &str,
        summary: &str,
        embedding: Vec<f32>,
        clock: &dyn Clock,
    ) -> Result<(), KernelError> {
        let existing = self.find_merge_candidate(conversation_id, &embedding);
        let options = UpsertOptions { skip_embeddings: true, force: true, ..Default::default() };

        let id = match existing {
            Some(existing) => {
                let content = format!("{}\n\n{}", existing.content, summary);
                let mut metadata = existing.metadata.clone();
                metadata.insert("label".to_string(), serde_json::Value::String(label.to_string()));
                let input = NewEntity { entity_type: TOPIC_ENTITY_TYPE.to_string(), id: Some(existing.id), content, metadata };
                self.shared.entities.lock().upsert_entity(input, options, clock)?.id
            }
            None => {
                let mut metadata = std::collections::HashMap::new();
                metadata.insert("conversationId".to_string(), serde_json::Value::String(conversation_id.to_string()));
                metadata.insert("interfaceType".to_string(), serde_json::Value::String(interface_type.to_string()));
                metadata.insert("label".to_string(), serde_json::Value::String(label.to_string()));
                let content = format!("# {label}\n\n{summary}");
                let input = NewEntity { entity_type: TOPIC_ENTITY_TYPE.to_string(), id: None, content, metadata };
                self.shared.entities.lock().create_entity(input, options, clock)?.id
            }
        };

        self.shared.entities.lock().set_embedding(&id, embedding, clock)
    }
}

#[async_trait]
impl JobHandler for SummarizeConversationHandler {
    async fn handle(&self, job: &brain_core::Job, progress: &ProgressReporter) -> Result<serde_json::Value, KernelError> {
        let raw_id = job
            .payload
            .get("conversationId")
            .and_then(|v| v.as_str())
            .ok_or_else(|| KernelError::validation("conversation-topic job missing conversationId"))?
            .to_string();
        let id: ConversationId = serde_json::from_value(serde_json::Value::String(raw_id.clone()))
            .map_err(|e| KernelError::validation(format!("invalid conversationId: {e}")))?;
        let interface_type = id.interface_type().to_string();

        let window = {
            let conversations = self.shared.conversations.lock();
            conversations.get(&id).map(|c| c.window.clone()).unwrap_or_default()
        };
        if window.is_empty() {
            return Ok(serde_json::json!({ "topics": 0 }));
        }

        let windows = sliding_windows(&window, BATCH_SIZE, BATCH_STEP);
        let total = windows.len() as u64;
        let mut produced = 0u64;

        for batch in windows {
            let clock = self.shared.clock.as_ref();
            let (label, summary) = self.distill(batch).await?;
            let embedding = self.shared.gateway.generate_embedding(&summary).await?;

            self.mirror_topic(&raw_id, &interface_type, &label, &summary, embedding.clone(), clock).await?;

            let topic = brain_core::Topic {
                label,
                summary,
                embedding,
                message_count: batch.len() as u32,
                updated: clock.now(),
            };
            self.shared.conversations.lock().summarize_window(id.clone(), topic, MERGE_THRESHOLD, clock)?;

            produced += 1;
            progress.report(produced, total, None, Some(TOPIC_JOB_TYPE.to_string()));
        }

        Ok(serde_json::json!({ "topics": produced }))
    }
}

#[cfg(test)]
#[path = "conversation_manager_tests.rs"]
mod tests;
