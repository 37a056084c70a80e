// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Brain contributors

//! Supervises registered [`Daemon`]s: dependency-ordered start, periodic
//! health polling with restart/degrade policy, and timed graceful stop
//! (§4.9).

use crate::daemon::{Daemon, Health, HealthState, RestartPolicy};
use brain_bus::Bus;
use brain_core::{Clock, RetryBackoff};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("daemon {0} is not registered")]
    NotRegistered(String),
    #[error("daemon {0} failed to start: {1}")]
    StartFailed(String, String),
}

struct Entry {
    daemon: Arc<dyn Daemon>,
    depends_on: Vec<String>,
    last_health: Mutex<Option<Health>>,
    consecutive_failures: Mutex<u32>,
    restart_attempts: Mutex<u32>,
    degraded: Mutex<bool>,
}

/// Registers daemons in dependency order, starts/stops them, and polls
/// health on an interval, applying each daemon's [`RestartPolicy`] when
/// the consecutive-failure threshold is crossed.
pub struct DaemonRegistry<C: Clock> {
    entries: Vec<Entry>,
    bus: Bus,
    clock: C,
    failure_threshold: u32,
    stop_timeout: Duration,
    backoff: RetryBackoff,
}

impl<C: Clock + Clone> DaemonRegistry<C> {
    pub fn new(bus: Bus, clock: C) -> Self {
        Self {
            entries: Vec::new(),
            bus,
            clock,
            failure_threshold: 3,
            stop_timeout: Duration::from_secs(10),
            backoff: RetryBackoff::default(),
        }
    }

    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold.max(1);
        self
    }

    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    pub fn with_backoff(mut self, backoff: RetryBackoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Register a daemon with the names of daemons it must start after.
    pub fn register(&mut self, daemon: Arc<dyn Daemon>, depends_on: Vec<String>) {
        self.entries.push(Entry {
            daemon,
            depends_on,
            last_health: Mutex::new(None),
            consecutive_failures: Mutex::new(0),
            restart_attempts: Mutex::new(0),
            degraded: Mutex::new(false),
        });
    }

    /// Remove a registered daemon that was never started — used to roll
    /// back a plugin's registrations when its `onRegister` fails (§4.8).
    pub fn unregister(&mut self, name: &str) {
        self.entries.retain(|e| e.daemon.name() != name);
    }

    /// Start every registered daemon, ordered so a daemon never starts
    /// before everything it depends on. A cycle or a missing dependency
    /// name is a programming error and panics, since the dependency graph
    /// is fixed at registration time.
    pub async fn start_all(&self) -> Vec<(String, Result<(), String>)> {
        let order = self.dependency_order();
        let mut results = Vec::with_capacity(order.len());
        for idx in order {
            let entry = &self.entries[idx];
            let outcome = entry.daemon.start().await;
            if let Err(ref e) = outcome {
                tracing::error!(daemon = entry.daemon.name(), error = e, "daemon start failed");
            }
            results.push((entry.daemon.name().to_string(), outcome));
        }
        results
    }

    /// Stop every daemon in reverse dependency order, each bounded by the
    /// configured stop timeout. A timeout is recorded but does not block
    /// stopping the rest.
    pub async fn stop_all(&self) -> Vec<(String, Result<(), String>)> {
        let mut order = self.dependency_order();
        order.reverse();
        let mut results = Vec::with_capacity(order.len());
        for idx in order {
            let entry = &self.entries[idx];
            let outcome = match tokio::time::timeout(self.stop_timeout, entry.daemon.stop()).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(daemon = entry.daemon.name(), "stop timed out");
                    Err("stop timed out".to_string())
                }
            };
            results.push((entry.daemon.name().to_string(), outcome));
        }
        results
    }

    /// Topologically order entries so each daemon follows its dependencies.
    /// Panics on an unknown dependency name or a cycle.
    fn dependency_order(&self) -> Vec<usize> {
        let index_of: HashMap<&str, usize> =
            self.entries.iter().enumerate().map(|(i, e)| (e.daemon.name(), i)).collect();
        let mut visited = vec![false; self.entries.len()];
        let mut visiting = vec![false; self.entries.len()];
        let mut order = Vec::with_capacity(self.entries.len());

        fn visit(
            idx: usize,
            entries: &[Entry],
            index_of: &HashMap<&str, usize>,
            visited: &mut [bool],
            visiting: &mut [bool],
            order: &mut Vec<usize>,
        ) {
            if visited[idx] {
                return;
            }
            assert!(!visiting[idx], "dependency cycle involving daemon {}", entries[idx].daemon.name());
            visiting[idx] = true;
            for dep in &entries[idx].depends_on {
                let dep_idx =
                    *index_of.get(dep.as_str()).unwrap_or_else(|| panic!("unknown daemon dependency {dep}"));
                visit(dep_idx, entries, index_of, visited, visiting, order);
            }
            visiting[idx] = false;
            visited[idx] = true;
            order.push(idx);
        }

        for idx in 0..self.entries.len() {
            visit(idx, &self.entries, &index_of, &mut visited, &mut visiting, &mut order);
        }
        order
    }

    /// Poll every daemon's health once, applying restart/degrade policy on
    /// threshold breach. Returns each daemon's health for this round.
    pub async fn poll_health_once(&self) -> Vec<(String, Health)> {
        let mut snapshot = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            let health = entry.daemon.health_check().await;
            *entry.last_health.lock() = Some(health.clone());

            if health.state == HealthState::Error {
                let breach = {
                    let mut failures = entry.consecutive_failures.lock();
                    *failures += 1;
                    *failures >= self.failure_threshold && !*entry.degraded.lock()
                };
                if breach {
                    self.handle_threshold_breach(entry).await;
                }
            } else {
                *entry.consecutive_failures.lock() = 0;
            }
            snapshot.push((entry.daemon.name().to_string(), health));
        }
        snapshot
    }

    async fn handle_threshold_breach(&self, entry: &Entry) {
        match entry.daemon.restart_policy() {
            RestartPolicy::RestartWithBackoff { max_attempts } => {
                let mut attempts = entry.restart_attempts.lock();
                if *attempts >= max_attempts {
                    self.mark_degraded(entry);
                    return;
                }
                let delay_ms = self.backoff.delay_for(*attempts);
                *attempts += 1;
                drop(attempts);
                tracing::warn!(daemon = entry.daemon.name(), delay_ms, "restarting daemon after health failures");
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                if let Err(e) = entry.daemon.start().await {
                    tracing::error!(daemon = entry.daemon.name(), error = e, "daemon restart failed");
                    self.mark_degraded(entry);
                } else {
                    *entry.consecutive_failures.lock() = 0;
                }
            }
            RestartPolicy::MarkDegraded => self.mark_degraded(entry),
        }
    }

    fn mark_degraded(&self, entry: &Entry) {
        *entry.degraded.lock() = true;
        tracing::error!(daemon = entry.daemon.name(), "daemon marked degraded");
        self.bus.publish(
            "daemon:degraded",
            serde_json::json!({ "daemon": entry.daemon.name(), "at": self.clock.now() }),
            None,
        );
    }

    pub fn is_degraded(&self, name: &str) -> Result<bool, RegistryError> {
        self.entries
            .iter()
            .find(|e| e.daemon.name() == name)
            .map(|e| *e.degraded.lock())
            .ok_or_else(|| RegistryError::NotRegistered(name.to_string()))
    }

    pub fn health_of(&self, name: &str) -> Result<Option<Health>, RegistryError> {
        self.entries
            .iter()
            .find(|e| e.daemon.name() == name)
            .map(|e| e.last_health.lock().clone())
            .ok_or_else(|| RegistryError::NotRegistered(name.to_string()))
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
