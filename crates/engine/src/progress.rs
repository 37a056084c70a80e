// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Brain contributors

//! Per-job progress reporting: EMA rate/ETA, throttled emission, and the
//! cooperative cancellation token handlers poll (§4.6, §4.7).

use brain_bus::{Bus, SendOptions};
use brain_core::message::Target;
use brain_core::JobId;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// At most this many `job-progress` messages go out per job per second;
/// handlers may call `report` far more often than that.
const MAX_EMISSIONS_PER_SEC: u32 = 10;
/// Weight given to the newest interval when updating the rate EMA.
const RATE_EMA_ALPHA: f64 = 0.3;

struct ThrottleState {
    last_emit: Option<Instant>,
    last_report_at: Option<Instant>,
    last_current: u64,
    ema_rate_per_sec: Option<f64>,
}

/// Handed to a [`crate::handler::JobHandler`] for the duration of one
/// invocation. Cloning is cheap; clones share the same throttle state and
/// cancellation flag so a handler can fan a reporter out to sub-tasks.
#[derive(Clone)]
pub struct ProgressReporter {
    job_id: JobId,
    root_job_id: JobId,
    bus: Bus,
    cancelled: Arc<AtomicBool>,
    target: Target,
    state: Arc<Mutex<ThrottleState>>,
}

impl ProgressReporter {
    pub fn new(job_id: JobId, root_job_id: JobId, bus: Bus, cancelled: Arc<AtomicBool>) -> Self {
        Self {
            job_id,
            root_job_id,
            bus,
            cancelled,
            target: Target::Broadcast,
            state: Arc::new(Mutex::new(ThrottleState {
                last_emit: None,
                last_report_at: None,
                last_current: 0,
                ema_rate_per_sec: None,
            })),
        }
    }

    /// Scope emitted progress to the job's owning plugin instead of every
    /// subscriber on the topic (§4.7's target-routed delivery). Without
    /// this, progress is broadcast and any interface can see any job.
    pub fn with_target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    /// Whether the job has been asked to cancel; handlers must check this
    /// periodically and return early when it flips true.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Report progress on the current job. `current == total` (the final
    /// call) always emits, bypassing the rate limit, so callers never miss
    /// the completion event.
    pub fn report(&self, current: u64, total: u64, message: Option<String>, operation: Option<String>) {
        let now = Instant::now();
        let is_final = total > 0 && current >= total;

        let (rate, should_emit) = {
            let mut state = self.state.lock();
            if let Some(prev_at) = state.last_report_at {
                let elapsed = now.duration_since(prev_at).as_secs_f64();
                if elapsed > 0.0 {
                    let delta = current.saturating_sub(state.last_current) as f64;
                    let instantaneous = delta / elapsed;
                    state.ema_rate_per_sec = Some(match state.ema_rate_per_sec {
                        Some(prev) => RATE_EMA_ALPHA * instantaneous + (1.0 - RATE_EMA_ALPHA) * prev,
                        None => instantaneous,
                    });
                }
            }
            state.last_report_at = Some(now);
            state.last_current = current;

            let min_interval = Duration::from_millis(1000 / MAX_EMISSIONS_PER_SEC as u64);
            let should_emit = is_final
                || match state.last_emit {
                    Some(last) => now.duration_since(last) >= min_interval,
                    None => true,
                };
            if should_emit {
                state.last_emit = Some(now);
            }
            (state.ema_rate_per_sec, should_emit)
        };

        if !should_emit {
            return;
        }

        let eta = match rate {
            Some(r) if r > 0.0 && total > current => Some((total - current) as f64 / r),
            _ => None,
        };
        let percentage = if total > 0 { (current as f64 / total as f64) * 100.0 } else { 0.0 };

        let mut progress = serde_json::json!({
            "current": current,
            "total": total,
            "percentage": percentage,
        });
        if let Some(r) = rate {
            progress["rate"] = serde_json::json!(r);
        }
        if let Some(e) = eta {
            progress["eta"] = serde_json::json!(e);
        }

        let payload = serde_json::json!({
            "id": self.job_id.as_str(),
            "type": "job",
            "status": brain_core::JobStatus::Running.to_string(),
            "progress": progress,
            "message": message,
            "operation": operation,
            "metadata": { "rootJobId": self.root_job_id.as_str() },
        });
        let opts = SendOptions {
            source: Some(self.job_id.to_string()),
            target: Some(self.target.clone()),
            correlation_id: None,
            broadcast: true,
        };
        let outcome = self.bus.send("job-progress", payload, opts);
        if let Some(error) = outcome.error {
            tracing::warn!(error, "job-progress had failing subscribers");
        }
    }
}

/// Emits the aggregate `batch-progress` event (§4.6) whenever a batch
/// member transitions into a terminal state.
pub fn publish_batch_progress(bus: &Bus, batch: &brain_core::Batch) {
    let payload = serde_json::json!({
        "id": batch.id.as_str(),
        "type": "batch",
        "status": batch.status.to_string(),
        "progress": {
            "current": batch.completed + batch.failed,
            "total": batch.total,
            "percentage": if batch.total > 0 {
                ((batch.completed + batch.failed) as f64 / batch.total as f64) * 100.0
            } else {
                0.0
            },
        },
        "completed": batch.completed,
        "failed": batch.failed,
    });
    bus.publish("batch-progress", payload, None);
}

#[cfg(test)]
#[path = "progress_tests.rs"]
mod tests;
