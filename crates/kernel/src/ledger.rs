// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Brain contributors

//! Tracks what each plugin registered, so a failed `on_register` — or an
//! ordinary shutdown — can undo exactly that plugin's footprint without
//! touching anything another plugin registered (§4.8).

use crate::context::SharedHandles;
use brain_bus::SubscriptionId;
use brain_core::TemplateKey;
use std::collections::HashMap;

pub(crate) enum Registration {
    EntityValidator(String),
    Template(TemplateKey),
    JobHandler(String),
    Subscription(SubscriptionId),
    Daemon(String),
}

#[derive(Default)]
pub(crate) struct RegistrationLedger {
    by_plugin: HashMap<String, Vec<Registration>>,
    daemon_owner: HashMap<String, String>,
}

impl RegistrationLedger {
    pub(crate) fn entity_validator(&mut self, plugin_id: &str, entity_type: String) {
        self.push(plugin_id, Registration::EntityValidator(entity_type));
    }

    pub(crate) fn template(&mut self, plugin_id: &str, key: TemplateKey) {
        self.push(plugin_id, Registration::Template(key));
    }

    pub(crate) fn job_handler(&mut self, plugin_id: &str, job_type: String) {
        self.push(plugin_id, Registration::JobHandler(job_type));
    }

    pub(crate) fn subscription(&mut self, plugin_id: &str, id: SubscriptionId) {
        self.push(plugin_id, Registration::Subscription(id));
    }

    pub(crate) fn daemon(&mut self, plugin_id: &str, name: String) {
        self.daemon_owner.insert(name.clone(), plugin_id.to_string());
        self.push(plugin_id, Registration::Daemon(name));
    }

    /// Which plugin registered the daemon named `name`, if any — used to
    /// mark a plugin degraded when its daemon fails to start (§4.8).
    pub(crate) fn owner_of_daemon(&self, name: &str) -> Option<&str> {
        self.daemon_owner.get(name).map(String::as_str)
    }

    fn push(&mut self, plugin_id: &str, registration: Registration) {
        self.by_plugin.entry(plugin_id.to_string()).or_default().push(registration);
    }

    /// Remove and return everything `plugin_id` registered, forgetting its
    /// ledger entry. Purely bookkeeping — apply the result with
    /// [`apply`] to actually undo the registrations.
    pub(crate) fn take(&mut self, plugin_id: &str) -> Vec<Registration> {
        let registrations = self.by_plugin.remove(plugin_id).unwrap_or_default();
        for registration in &registrations {
            if let Registration::Daemon(name) = registration {
                self.daemon_owner.remove(name);
            }
        }
        registrations
    }
}

/// Undo a plugin's registrations against the shared handles. Split out of
/// [`RegistrationLedger`] so the ledger's own lock never has to be held
/// across the daemon registry's `.await`.
pub(crate) async fn apply(registrations: Vec<Registration>, shared: &SharedHandles) {
    for registration in registrations {
        match registration {
            Registration::EntityValidator(entity_type) => {
                shared.entities.lock().unregister_validator(&entity_type);
            }
            Registration::Template(key) => shared.templates.unregister_template(&key),
            Registration::JobHandler(job_type) => shared.handlers.lock().unregister(&job_type),
            Registration::Subscription(id) => shared.bus.unsubscribe(id),
            Registration::Daemon(name) => shared.daemons.lock().await.unregister(&name),
        }
    }
}
