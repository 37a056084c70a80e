// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Brain contributors

//! Drives the plugin lifecycle (§4.8): dependency-ordered
//! Construct→Register→Start→Active→Shutdown, with rollback of a plugin's
//! own registrations when its `on_register` fails.

use crate::context::{CoreContext, InterfaceContext, ServiceContext, SharedHandles};
use crate::ledger::{self, RegistrationLedger};
use crate::plugin::{Plugin, PluginContext, PluginKind};
use brain_core::{KernelError, Logger};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Loads plugins in dependency order, starts their daemons, and tears
/// everything down in reverse on shutdown.
pub struct PluginManager {
    shared: Arc<SharedHandles>,
    ledger: Arc<Mutex<RegistrationLedger>>,
    plugins: Vec<Arc<dyn Plugin>>,
    logger: Logger,
    registered: Mutex<HashSet<String>>,
    degraded: Mutex<HashSet<String>>,
}

impl PluginManager {
    pub fn new(shared: Arc<SharedHandles>, logger: Logger) -> Self {
        Self {
            shared,
            ledger: Arc::new(Mutex::new(RegistrationLedger::default())),
            plugins: Vec::new(),
            logger,
            registered: Mutex::new(HashSet::new()),
            degraded: Mutex::new(HashSet::new()),
        }
    }

    /// Construct step: add a plugin to the managed set. Must happen before
    /// [`PluginManager::load_all`].
    pub fn add_plugin(&mut self, plugin: Arc<dyn Plugin>) {
        self.plugins.push(plugin);
    }

    /// Register step: call `on_register` on every plugin in dependency
    /// order. Stops at the first failure, rolling back only that plugin's
    /// own registrations — plugins already registered before it stay
    /// loaded.
    pub async fn load_all(&self) -> Result<(), KernelError> {
        for idx in self.dependency_order() {
            let plugin = &self.plugins[idx];
            let ctx = self.build_context(plugin.as_ref());
            match plugin.on_register(&ctx).await {
                Ok(()) => {
                    self.registered.lock().insert(plugin.id().to_string());
                    self.logger.info("plugin registered", &[("plugin", plugin.id())]);
                }
                Err(e) => {
                    let error = e.to_string();
                    self.logger.error("plugin registration failed", &[("plugin", plugin.id()), ("error", error.as_str())]);
                    let registrations = self.ledger.lock().take(plugin.id());
                    ledger::apply(registrations, &self.shared).await;
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// Start step: start every registered daemon in dependency order. A
    /// daemon that fails to start marks the plugin that registered it
    /// degraded rather than failing the whole boot.
    pub async fn start_daemons(&self) {
        let results = self.shared.daemons.lock().await.start_all().await;
        for (name, result) in results {
            if let Err(e) = result {
                let owner = self.ledger.lock().owner_of_daemon(&name).map(str::to_string);
                if let Some(owner) = owner {
                    self.degraded.lock().insert(owner.clone());
                    self.logger.error(
                        "plugin marked degraded: daemon failed to start",
                        &[("plugin", owner.as_str()), ("daemon", name.as_str()), ("error", e.as_str())],
                    );
                }
            }
        }
    }

    pub fn is_degraded(&self, plugin_id: &str) -> bool {
        self.degraded.lock().contains(plugin_id)
    }

    pub fn registered_plugins(&self) -> Vec<String> {
        self.registered.lock().iter().cloned().collect()
    }

    /// Shutdown step: stop every daemon, then walk plugins in reverse
    /// dependency order releasing their bus subscriptions and other
    /// registrations and calling `on_shutdown`.
    pub async fn shutdown(&self) {
        self.shared.daemons.lock().await.stop_all().await;
        let mut order = self.dependency_order();
        order.reverse();
        for idx in order {
            let plugin = &self.plugins[idx];
            if !self.registered.lock().contains(plugin.id()) {
                continue;
            }
            let ctx = self.build_context(plugin.as_ref());
            if let Err(e) = plugin.on_shutdown(&ctx).await {
                let error = e.to_string();
                self.logger.error("plugin shutdown hook failed", &[("plugin", plugin.id()), ("error", error.as_str())]);
            }
            let registrations = self.ledger.lock().take(plugin.id());
            ledger::apply(registrations, &self.shared).await;
            self.registered.lock().remove(plugin.id());
            self.degraded.lock().remove(plugin.id());
        }
    }

    fn build_context(&self, plugin: &dyn Plugin) -> PluginContext {
        let core = CoreContext::new(self.logger.child(plugin.id()), self.shared.clock.clone());
        match plugin.kind() {
            PluginKind::Core => PluginContext::Core(core),
            PluginKind::Service => {
                PluginContext::Service(ServiceContext::new(plugin.id(), core, self.shared.clone(), self.ledger.clone()))
            }
            PluginKind::Interface => PluginContext::Interface(InterfaceContext::new(ServiceContext::new(
                plugin.id(),
                core,
                self.shared.clone(),
                self.ledger.clone(),
            ))),
        }
    }

    /// Topologically order plugins by `dependencies()`. Panics on an
    /// unknown dependency id or a cycle — the plugin set is fixed once
    /// construction finishes, so either is a programming error.
    fn dependency_order(&self) -> Vec<usize> {
        let index_of: HashMap<&str, usize> =
            self.plugins.iter().enumerate().map(|(i, p)| (p.id(), i)).collect();
        let mut visited = vec![false; self.plugins.len()];
        let mut visiting = vec![false; self.plugins.len()];
        let mut order = Vec::with_capacity(self.plugins.len());

        fn visit(
            idx: usize,
            plugins: &[Arc<dyn Plugin>],
            index_of: &HashMap<&str, usize>,
            visited: &mut [bool],
            visiting: &mut [bool],
            order: &mut Vec<usize>,
        ) {
            if visited[idx] {
                return;
            }
            assert!(!visiting[idx], "dependency cycle involving plugin {}", plugins[idx].id());
            visiting[idx] = true;
            for dep in plugins[idx].dependencies() {
                let dep_idx =
                    *index_of.get(dep.as_str()).unwrap_or_else(|| panic!("unknown plugin dependency {dep}"));
                visit(dep_idx, plugins, index_of, visited, visiting, order);
            }
            visiting[idx] = false;
            visited[idx] = true;
            order.push(idx);
        }

        for idx in 0..self.plugins.len() {
            visit(idx, &self.plugins, &index_of, &mut visited, &mut visiting, &mut order);
        }
        order
    }
}

#[cfg(test)]
#[path = "plugin_manager_tests.rs"]
mod tests;
