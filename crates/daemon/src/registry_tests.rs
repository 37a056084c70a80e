// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Brain contributors

use super::*;
use async_trait::async_trait;
use brain_bus::{Bus, HandlerOutcome};
use std::sync::atomic::{AtomicU32, Ordering};

struct FlakyDaemon {
    name: String,
    fail_checks: AtomicU32,
    starts: AtomicU32,
    policy: RestartPolicy,
}

impl FlakyDaemon {
    fn new(name: &str, fail_checks: u32, policy: RestartPolicy) -> Self {
        Self { name: name.to_string(), fail_checks: AtomicU32::new(fail_checks), starts: AtomicU32::new(0), policy }
    }
}

#[async_trait]
impl Daemon for FlakyDaemon {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(&self) -> Result<(), String> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> Result<(), String> {
        Ok(())
    }

    async fn health_check(&self) -> Health {
        let remaining = self.fail_checks.load(Ordering::SeqCst);
        let now = chrono::Utc::now();
        if remaining > 0 {
            self.fail_checks.fetch_sub(1, Ordering::SeqCst);
            Health::error("boom", now)
        } else {
            Health::healthy(now)
        }
    }

    fn restart_policy(&self) -> RestartPolicy {
        self.policy
    }
}

struct HangingStopDaemon {
    name: String,
}

#[async_trait]
impl Daemon for HangingStopDaemon {
    fn name(&self) -> &str {
        &self.name
    }
    async fn start(&self) -> Result<(), String> {
        Ok(())
    }
    async fn stop(&self) -> Result<(), String> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(())
    }
    async fn health_check(&self) -> Health {
        Health::healthy(chrono::Utc::now())
    }
}

#[tokio::test]
async fn start_all_runs_dependencies_before_dependents() {
    let bus = Bus::new();
    let order = Arc::new(Mutex::new(Vec::new()));
    let clock = brain_core::SystemClock;
    let mut registry = DaemonRegistry::new(bus, clock);

    struct OrderRecording {
        name: String,
        order: Arc<Mutex<Vec<String>>>,
    }
    #[async_trait]
    impl Daemon for OrderRecording {
        fn name(&self) -> &str {
            &self.name
        }
        async fn start(&self) -> Result<(), String> {
            self.order.lock().push(self.name.clone());
            Ok(())
        }
        async fn stop(&self) -> Result<(), String> {
            Ok(())
        }
        async fn health_check(&self) -> Health {
            Health::healthy(chrono::Utc::now())
        }
    }

    registry.register(
        Arc::new(OrderRecording { name: "base".to_string(), order: order.clone() }),
        vec![],
    );
    registry.register(
        Arc::new(OrderRecording { name: "dependent".to_string(), order: order.clone() }),
        vec!["base".to_string()],
    );

    registry.start_all().await;
    assert_eq!(*order.lock(), vec!["base".to_string(), "dependent".to_string()]);
}

#[tokio::test]
async fn health_error_below_threshold_does_not_degrade() {
    let bus = Bus::new();
    let clock = brain_core::SystemClock;
    let mut registry = DaemonRegistry::new(bus, clock).with_failure_threshold(3);
    registry.register(Arc::new(FlakyDaemon::new("d", 2, RestartPolicy::MarkDegraded)), vec![]);

    registry.poll_health_once().await;
    registry.poll_health_once().await;

    assert!(!registry.is_degraded("d").unwrap());
}

#[tokio::test]
async fn health_error_at_threshold_marks_degraded_without_restart_policy() {
    let bus = Bus::new();
    let degraded_seen = Arc::new(Mutex::new(false));
    {
        let degraded_seen = degraded_seen.clone();
        bus.subscribe(
            "daemon:degraded",
            None,
            Box::new(move |_msg| {
                *degraded_seen.lock() = true;
                HandlerOutcome::Noop
            }),
        );
    }
    let clock = brain_core::SystemClock;
    let mut registry = DaemonRegistry::new(bus, clock).with_failure_threshold(3);
    registry.register(Arc::new(FlakyDaemon::new("d", 10, RestartPolicy::MarkDegraded)), vec![]);

    for _ in 0..3 {
        registry.poll_health_once().await;
    }

    assert!(registry.is_degraded("d").unwrap());
    assert!(*degraded_seen.lock());
}

#[tokio::test]
async fn restart_with_backoff_recovers_before_exhausting_attempts() {
    let bus = Bus::new();
    let clock = brain_core::SystemClock;
    let mut registry = DaemonRegistry::new(bus, clock)
        .with_failure_threshold(2)
        .with_backoff(brain_core::RetryBackoff { base_ms: 1, max_ms: 1 });
    let daemon = Arc::new(FlakyDaemon::new("d", 2, RestartPolicy::RestartWithBackoff { max_attempts: 5 }));
    registry.register(daemon.clone(), vec![]);

    registry.poll_health_once().await;
    registry.poll_health_once().await;

    assert!(!registry.is_degraded("d").unwrap());
    assert!(daemon.starts.load(Ordering::SeqCst) >= 1);
}

#[tokio::test]
async fn unregister_removes_a_daemon_before_it_is_started() {
    let bus = Bus::new();
    let clock = brain_core::SystemClock;
    let mut registry = DaemonRegistry::new(bus, clock);
    registry.register(Arc::new(FlakyDaemon::new("d", 0, RestartPolicy::MarkDegraded)), vec![]);
    registry.unregister("d");

    let results = registry.start_all().await;
    assert!(results.is_empty());
}

#[tokio::test]
async fn stop_all_records_timeout_without_blocking_other_daemons() {
    let bus = Bus::new();
    let clock = brain_core::SystemClock;
    let mut registry = DaemonRegistry::new(bus, clock).with_stop_timeout(Duration::from_millis(20));
    registry.register(Arc::new(HangingStopDaemon { name: "slow".to_string() }), vec![]);

    let results = registry.stop_all().await;
    assert_eq!(results.len(), 1);
    assert!(results[0].1.is_err());
}
