// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Brain contributors

//! The contract a long-running service implements to be supervised by the
//! [`crate::registry::DaemonRegistry`] (§4.9).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Healthy,
    Warning,
    Error,
}

brain_core::simple_display!(HealthState {
    Healthy => "healthy",
    Warning => "warning",
    Error => "error",
});

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    pub state: HealthState,
    pub message: Option<String>,
    pub last_check: DateTime<Utc>,
}

impl Health {
    pub fn healthy(now: DateTime<Utc>) -> Self {
        Self { state: HealthState::Healthy, message: None, last_check: now }
    }

    pub fn error(message: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self { state: HealthState::Error, message: Some(message.into()), last_check: now }
    }
}

/// Policy applied when a daemon's health check crosses the consecutive
/// failure threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartPolicy {
    /// Restart with exponential backoff, up to `max_attempts`.
    RestartWithBackoff { max_attempts: u32 },
    /// Never restart automatically; mark degraded and wait for an operator.
    MarkDegraded,
}

/// A long-running service supervised by the kernel.
///
/// `start`/`stop` are called at most once per lifecycle (the registry
/// enforces ordering); `health_check` may be called concurrently with
/// neither and must not panic.
#[async_trait]
pub trait Daemon: Send + Sync {
    fn name(&self) -> &str;

    async fn start(&self) -> Result<(), String>;

    /// Must return within the registry's configured stop timeout; the
    /// registry proceeds with shutdown regardless and records a failure if
    /// it doesn't (§4.9).
    async fn stop(&self) -> Result<(), String>;

    async fn health_check(&self) -> Health;

    /// Restart policy on crossing the consecutive-failure threshold.
    /// Defaults to marking the daemon degraded.
    fn restart_policy(&self) -> RestartPolicy {
        RestartPolicy::MarkDegraded
    }
}
