// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Brain contributors

//! The capability-scoped contexts handed to a plugin's `on_register`/
//! `on_shutdown` hooks (§4.8). Each [`PluginKind`] gets strictly the
//! capabilities the table in §4.8 grants it — a `Core` plugin physically
//! cannot reach the entity registry because its context type has no
//! method for it, not because of a runtime check.

use crate::ledger::RegistrationLedger;
use brain_bus::{Bus, Handler, SendOptions, SendOutcome};
use brain_core::{ChatMessage, Clock, Conversation, ConversationId, KernelError, Logger, Role};
use brain_daemon::{Daemon, DaemonRegistry};
use brain_engine::{HandlerRegistry, JobHandler};
use brain_registry::{AiGateway, EntityRegistry, EntityValidator, NewEntity, TemplateRegistry, UpsertOptions};
use brain_storage::JobDb;
use parking_lot::Mutex;
use std::sync::Arc;

/// Capabilities every plugin gets regardless of declared kind.
#[derive(Clone)]
pub struct CoreContext {
    pub logger: Logger,
    clock: Arc<dyn Clock>,
}

impl CoreContext {
    pub fn new(logger: Logger, clock: Arc<dyn Clock>) -> Self {
        Self { logger, clock }
    }

    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }
}

/// Handles shared by [`ServiceContext`] and [`InterfaceContext`], plus the
/// ledger that lets a failed `on_register` be rolled back.
pub(crate) struct SharedHandles {
    pub entities: Mutex<EntityRegistry>,
    pub templates: Arc<TemplateRegistry>,
    pub jobs: Arc<Mutex<JobDb>>,
    pub handlers: Mutex<HandlerRegistry>,
    pub bus: Bus,
    /// A `tokio` mutex, not `parking_lot`: starting/stopping daemons holds
    /// the lock across `.await`, which a `parking_lot::Mutex` guard isn't
    /// meant for.
    pub daemons: tokio::sync::Mutex<DaemonRegistry<Arc<dyn Clock>>>,
    pub conversations: Mutex<brain_storage::ConversationDb>,
    pub clock: Arc<dyn Clock>,
    /// The same gateway handed to the template registry, kept here too so
    /// the embedding job handler and the conversation summarizer can call
    /// `generate_embedding` directly without going through content
    /// generation.
    pub gateway: Arc<dyn AiGateway>,
}

/// Everything a `Service` plugin may do beyond [`CoreContext`].
#[derive(Clone)]
pub struct ServiceContext {
    pub core: CoreContext,
    plugin_id: String,
    shared: Arc<SharedHandles>,
    ledger: Arc<Mutex<RegistrationLedger>>,
}

impl ServiceContext {
    pub(crate) fn new(
        plugin_id: impl Into<String>,
        core: CoreContext,
        shared: Arc<SharedHandles>,
        ledger: Arc<Mutex<RegistrationLedger>>,
    ) -> Self {
        Self { core, plugin_id: plugin_id.into(), shared, ledger }
    }

    pub fn register_entity_validator(&self, entity_type: impl Into<String>, validator: Arc<dyn EntityValidator>) {
        let entity_type = entity_type.into();
        self.shared.entities.lock().register_validator(entity_type.clone(), validator);
        self.ledger.lock().entity_validator(&self.plugin_id, entity_type);
    }

    pub fn create_entity(&self, input: NewEntity, options: UpsertOptions) -> Result<brain_core::Entity, KernelError> {
        self.shared.entities.lock().create_entity(input, options, self.shared.clock.as_ref())
    }

    pub fn upsert_entity(&self, input: NewEntity, options: UpsertOptions) -> Result<brain_core::Entity, KernelError> {
        self.shared.entities.lock().upsert_entity(input, options, self.shared.clock.as_ref())
    }

    pub fn delete_entity(&self, id: brain_core::EntityId) -> Result<(), KernelError> {
        self.shared.entities.lock().delete_entity(id, self.shared.clock.as_ref())
    }

    pub fn get_entity(&self, id: &brain_core::EntityId) -> Option<brain_core::Entity> {
        self.shared.entities.lock().get(id).cloned()
    }

    pub fn list_entities(&self, entity_type: &str, options: &brain_core::ListOptions) -> Vec<brain_core::Entity> {
        self.shared.entities.lock().list(entity_type, options)
    }

    pub fn search_entities(&self, query: &brain_core::SearchQuery) -> Vec<brain_core::Entity> {
        self.shared.entities.lock().search(query)
    }

    pub fn register_template(&self, template: brain_core::Template) {
        let key = template.key.clone();
        self.shared.templates.register_template(template);
        self.ledger.lock().template(&self.plugin_id, key);
    }

    /// Submits a root job owned by this plugin. Progress for this job (and
    /// any child job that copies `ownerPluginId` into its own metadata) is
    /// routed only to this plugin's `subscribe_progress` handler.
    pub fn submit_job(&self, job_type: impl Into<String>, payload: serde_json::Value) -> Result<brain_core::Job, KernelError> {
        let mut job = brain_core::Job::new_root(job_type, payload, self.shared.clock.now());
        job.metadata.insert("ownerPluginId".to_string(), serde_json::Value::String(self.plugin_id.clone()));
        self.shared.jobs.lock().submit(job, self.shared.clock.as_ref())
    }

    /// Submits a job that shares `parent.root_job_id`'s progress routing,
    /// for a plugin that fans a root job it owns out into follow-up work
    /// (e.g. a batch import enqueueing one job per item).
    pub fn submit_child_job(
        &self,
        parent: &brain_core::Job,
        job_type: impl Into<String>,
        payload: serde_json::Value,
    ) -> Result<brain_core::Job, KernelError> {
        let mut job = brain_core::Job::new_root(job_type, payload, self.shared.clock.now());
        job.parent_job_id = Some(parent.id);
        job.root_job_id = parent.root_job_id;
        let owner = parent
            .metadata
            .get("ownerPluginId")
            .cloned()
            .unwrap_or_else(|| serde_json::Value::String(self.plugin_id.clone()));
        job.metadata.insert("ownerPluginId".to_string(), owner);
        self.shared.jobs.lock().submit(job, self.shared.clock.as_ref())
    }

    pub fn get_job(&self, id: brain_core::JobId) -> Option<brain_core::Job> {
        self.shared.jobs.lock().get(&id).cloned()
    }

    pub fn register_job_handler(&self, job_type: impl Into<String>, handler: Arc<dyn JobHandler>) {
        let job_type = job_type.into();
        self.shared.handlers.lock().register(job_type.clone(), handler);
        self.ledger.lock().job_handler(&self.plugin_id, job_type);
    }

    pub fn subscribe(&self, topic: impl Into<String>, filter: Option<String>, handler: Handler) {
        let id = self.shared.bus.subscribe(topic, filter, handler);
        self.ledger.lock().subscription(&self.plugin_id, id);
    }

    pub fn publish(&self, topic: impl Into<String>, payload: serde_json::Value) {
        self.shared.bus.publish(topic, payload, Some(self.plugin_id.clone()));
    }

    pub fn send(&self, topic: impl Into<String>, payload: serde_json::Value, opts: SendOptions) -> SendOutcome {
        self.shared.bus.send(topic, payload, opts)
    }

    pub async fn register_daemon(&self, daemon: Arc<dyn Daemon>, depends_on: Vec<String>) {
        let name = daemon.name().to_string();
        self.shared.daemons.lock().await.register(daemon, depends_on);
        self.ledger.lock().daemon(&self.plugin_id, name);
    }
}

/// Everything an `Interface` plugin may do beyond [`ServiceContext`].
#[derive(Clone)]
pub struct InterfaceContext {
    pub service: ServiceContext,
}

impl InterfaceContext {
    pub(crate) fn new(service: ServiceContext) -> Self {
        Self { service }
    }

    /// Start (or resume) a conversation. Idempotent: the same
    /// `(interface_type, channel_id)` pair always resolves to the same id,
    /// and the conversation itself materializes lazily on its first
    /// message.
    pub fn start_conversation(&self, interface_type: &str, channel_id: &str) -> ConversationId {
        ConversationId::new(interface_type, channel_id)
    }

    pub fn add_message(&self, id: ConversationId, role: Role, content: impl Into<String>) -> Result<(), KernelError> {
        let clock = self.service.shared.clock.as_ref();
        let message = ChatMessage { role, content: content.into(), timestamp: clock.now() };
        self.service.shared.conversations.lock().append_message(id, message, clock)
    }

    pub fn get_messages(&self, id: &ConversationId, limit: Option<usize>) -> Vec<ChatMessage> {
        let conversations = self.service.shared.conversations.lock();
        let Some(convo) = conversations.get(id) else { return Vec::new() };
        match limit {
            Some(limit) => convo.window.iter().rev().take(limit).rev().cloned().collect(),
            None => convo.window.clone(),
        }
    }

    pub fn conversation(&self, id: &ConversationId) -> Option<Conversation> {
        self.service.shared.conversations.lock().get(id).cloned()
    }

    /// Subscribe to `job-progress`/`batch-progress` for jobs rooted at
    /// `root_job_id`, filtered via the bus's target routing so an
    /// interface only hears about the jobs it started.
    pub fn subscribe_progress(&self, plugin_id: &str, handler: Handler) {
        let handler = std::sync::Arc::new(handler);
        let job_handler = handler.clone();
        let job_handler: Handler = Box::new(move |message| job_handler(message));
        let batch_handler: Handler = Box::new(move |message| handler(message));
        self.service.subscribe("job-progress", Some(format!("plugin:{plugin_id}")), job_handler);
        self.service.subscribe("batch-progress", Some(format!("plugin:{plugin_id}")), batch_handler);
    }
}
