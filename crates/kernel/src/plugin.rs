// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Brain contributors

//! The contract a plugin implements to participate in the kernel's
//! lifecycle (§4.8): declare identity and dependencies, then register
//! whatever its [`PluginKind`] permits through the context it is handed.

use crate::context::{CoreContext, InterfaceContext, ServiceContext};
use async_trait::async_trait;
use brain_core::KernelError;

/// The capability tier a plugin declares at construction. Determines
/// which [`PluginContext`] variant its hooks receive — a `Core` plugin is
/// physically handed a [`CoreContext`] and has no way to reach the entity
/// registry, the job queue, or the bus, regardless of what it asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginKind {
    Core,
    Service,
    Interface,
}

/// The context passed to [`Plugin::on_register`]/[`Plugin::on_shutdown`],
/// scoped to the plugin's declared [`PluginKind`].
pub enum PluginContext {
    Core(CoreContext),
    Service(ServiceContext),
    Interface(InterfaceContext),
}

impl PluginContext {
    /// The [`CoreContext`] every variant carries, for logging/clock access
    /// regardless of kind.
    pub fn core(&self) -> &CoreContext {
        match self {
            PluginContext::Core(ctx) => ctx,
            PluginContext::Service(ctx) => &ctx.core,
            PluginContext::Interface(ctx) => &ctx.service.core,
        }
    }

    pub fn as_service(&self) -> Option<&ServiceContext> {
        match self {
            PluginContext::Service(ctx) => Some(ctx),
            PluginContext::Interface(ctx) => Some(&ctx.service),
            PluginContext::Core(_) => None,
        }
    }

    pub fn as_interface(&self) -> Option<&InterfaceContext> {
        match self {
            PluginContext::Interface(ctx) => Some(ctx),
            _ => None,
        }
    }
}

/// A unit of kernel-managed functionality. `id()` must be stable and
/// unique across the loaded plugin set — it namespaces every artifact the
/// plugin registers (templates, job types, bus subscriptions).
#[async_trait]
pub trait Plugin: Send + Sync {
    fn id(&self) -> &str;

    fn kind(&self) -> PluginKind;

    /// Other plugin ids that must finish `on_register` (and, for daemon
    /// startup ordering, have their daemons started) before this one.
    fn dependencies(&self) -> Vec<String> {
        Vec::new()
    }

    /// Register validators, templates, job handlers, bus subscriptions,
    /// and daemons. A returned error aborts the load of this plugin and
    /// every artifact already registered here is rolled back before the
    /// error propagates; daemons are not yet started at this point.
    async fn on_register(&self, ctx: &PluginContext) -> Result<(), KernelError>;

    /// Called once in reverse dependency order during kernel shutdown,
    /// after this plugin's daemons have been stopped and its bus
    /// subscriptions released.
    async fn on_shutdown(&self, ctx: &PluginContext) -> Result<(), KernelError> {
        let _ = ctx;
        Ok(())
    }
}
