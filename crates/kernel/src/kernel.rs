// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Brain contributors

//! Top-level wiring: opens the three stores, builds the bus/registries/
//! daemon registry, registers the kernel's own built-in job handlers, and
//! exposes the surface a host process drives a plugin set through.

use crate::context::SharedHandles;
use crate::conversation_manager::{ConversationManager, SummarizeConversationHandler};
use crate::embed_handler::EmbedEntityHandler;
use crate::plugin::Plugin;
use crate::plugin_manager::PluginManager;
use brain_bus::Bus;
use brain_core::{Clock, KernelConfig, KernelError, Logger, SystemClock};
use brain_daemon::DaemonRegistry;
use brain_engine::{HandlerRegistry, WorkerPool};
use brain_registry::{AiGateway, EntityRegistry, TemplateRegistry};
use brain_storage::{ConversationDb, EntityDb, JobDb, StoreError};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BootError {
    #[error("failed to open store at {path}: {source}")]
    StoreOpen { path: String, source: StoreError },
}

/// A WAL path's sibling snapshot file: `<path>.snapshot.json`, next to it
/// rather than replacing its extension so the WAL itself stays inspectable.
fn snapshot_path_for(wal_path: &str) -> PathBuf {
    let mut path = PathBuf::from(wal_path);
    let file_name = path.file_name().map(|n| format!("{}.snapshot.json", n.to_string_lossy())).unwrap_or_default();
    path.set_file_name(file_name);
    path
}

fn open_store<T>(
    wal_path: &str,
    open: impl FnOnce(&Path, &Path) -> Result<T, StoreError>,
) -> Result<T, BootError> {
    let snapshot_path = snapshot_path_for(wal_path);
    open(Path::new(wal_path), &snapshot_path).map_err(|source| BootError::StoreOpen { path: wal_path.to_string(), source })
}

/// The assembled kernel: durable stores, message bus, capability-scoped
/// plugin contexts, and the built-in embedding/summarization job handlers.
/// A host process constructs one, adds its plugins, and drives the
/// lifecycle with [`Kernel::start`]/[`Kernel::shutdown`].
pub struct Kernel {
    shared: Arc<SharedHandles>,
    plugins: PluginManager,
    conversations: Arc<ConversationManager>,
    logger: Logger,
    worker_pool: Mutex<Option<Arc<WorkerPool<Arc<dyn Clock>>>>>,
}

impl Kernel {
    /// Open the three stores at the paths named in `config`, wire up the
    /// bus/registries/daemon registry, and register the built-in
    /// `embed-entity`/`embed-entities-batch`/`conversation-topic` handlers.
    /// Does not load any plugins or start any daemons — call
    /// [`Kernel::add_plugin`] then [`Kernel::start`] for that.
    pub fn boot(config: &KernelConfig, gateway: Arc<dyn AiGateway>) -> Result<Self, BootError> {
        Self::boot_with_clock(config, gateway, Arc::new(SystemClock))
    }

    pub fn boot_with_clock(config: &KernelConfig, gateway: Arc<dyn AiGateway>, clock: Arc<dyn Clock>) -> Result<Self, BootError> {
        let entity_db = open_store(&config.entity_db_path, EntityDb::open)?;
        let job_db = open_store(&config.job_db_path, JobDb::open)?;
        let conversation_db = open_store(&config.conversation_db_path, ConversationDb::open)?;

        let logger = Logger::root("brain");
        let bus = Bus::new();
        let jobs = Arc::new(Mutex::new(job_db));
        let entities = EntityRegistry::new(entity_db, jobs.clone(), bus.clone());
        let templates = Arc::new(TemplateRegistry::new(gateway.clone()));
        let daemons = DaemonRegistry::new(bus.clone(), clock.clone())
            .with_failure_threshold(3)
            .with_stop_timeout(std::time::Duration::from_millis(config.daemon_stop_timeout_ms));

        let shared = Arc::new(SharedHandles {
            entities: Mutex::new(entities),
            templates,
            jobs,
            handlers: Mutex::new(HandlerRegistry::new()),
            daemons: tokio::sync::Mutex::new(daemons),
            bus,
            conversations: Mutex::new(conversation_db),
            clock,
            gateway,
        });

        let embed_handler = Arc::new(EmbedEntityHandler::new(shared.clone()));
        {
            let mut handlers = shared.handlers.lock();
            handlers.register("embed-entity", embed_handler.clone());
            handlers.register("embed-entities-batch", embed_handler);
            handlers.register("conversation-topic", Arc::new(SummarizeConversationHandler::new(shared.clone())));
        }

        let conversations = Arc::new(ConversationManager::new(
            shared.clone(),
            config.summarization_message_threshold,
            config.summarization_minutes_threshold,
        ));
        let plugins = PluginManager::new(shared.clone(), logger.child("plugins"));

        Ok(Self { shared, plugins, conversations, logger, worker_pool: Mutex::new(None) })
    }

    pub fn add_plugin(&mut self, plugin: Arc<dyn Plugin>) {
        self.plugins.add_plugin(plugin);
    }

    pub fn conversations(&self) -> &ConversationManager {
        &self.conversations
    }

    pub fn is_plugin_degraded(&self, plugin_id: &str) -> bool {
        self.plugins.is_degraded(plugin_id)
    }

    /// Register every added plugin (rolling back any that fail), start
    /// their daemons, recover interrupted jobs, and build the worker pool
    /// from the final set of registered handlers. Returns the pool so the
    /// host can drive its poll loop (e.g. `pool.run(interval, shutdown_rx)`)
    /// on whatever task/executor it prefers.
    pub async fn start(&self, worker_concurrency: usize) -> Result<Arc<WorkerPool<Arc<dyn Clock>>>, KernelError> {
        self.plugins.load_all().await?;
        self.plugins.start_daemons().await;

        let handlers = self.shared.handlers.lock().clone();
        let pool = Arc::new(
            WorkerPool::new(self.shared.jobs.clone(), handlers, self.shared.bus.clone(), self.shared.clock.clone(), self.logger.child("worker-pool"))
                .with_concurrency(worker_concurrency),
        );
        pool.recover().map_err(|e| KernelError::handler(e.to_string()))?;
        *self.worker_pool.lock() = Some(pool.clone());
        Ok(pool)
    }

    pub async fn shutdown(&self) {
        self.plugins.shutdown().await;
        *self.worker_pool.lock() = None;
    }
}

#[cfg(test)]
#[path = "kernel_tests.rs"]
mod tests;
