// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Brain contributors

//! Layered kernel configuration: compiled-in defaults, an optional TOML
//! file, then environment variable overrides. The loader never partially
//! applies a layer — a malformed value anywhere surfaces one [`ConfigError`]
//! naming the offending key and the kernel refuses to start.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Errors produced while loading or validating [`KernelConfig`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {message}")]
    ReadFailed { path: String, message: String },

    #[error("failed to parse config file {path}: {message}")]
    ParseFailed { path: String, message: String },

    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// The single validated configuration value passed by value to every
/// component that needs it. Constructed once at startup; never read from
/// a global.
#[derive(Debug, Clone, PartialEq)]
pub struct KernelConfig {
    pub entity_db_path: String,
    pub job_db_path: String,
    pub conversation_db_path: String,
    pub ai_gateway_endpoint: String,
    pub ai_api_key: String,
    pub worker_pool_size: u32,
    pub daemon_health_interval_ms: u64,
    pub daemon_stop_timeout_ms: u64,
    pub progress_poll_interval_ms: u64,
    pub summarization_message_threshold: u32,
    pub summarization_minutes_threshold: u32,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            entity_db_path: "brain-entities.wal".into(),
            job_db_path: "brain-jobs.wal".into(),
            conversation_db_path: "brain-conversations.wal".into(),
            ai_gateway_endpoint: String::new(),
            ai_api_key: String::new(),
            worker_pool_size: num_cpus_fallback(),
            daemon_health_interval_ms: 30_000,
            daemon_stop_timeout_ms: 10_000,
            progress_poll_interval_ms: 500,
            summarization_message_threshold: 20,
            summarization_minutes_threshold: 30,
        }
    }
}

fn num_cpus_fallback() -> u32 {
    std::thread::available_parallelism().map(|n| n.get() as u32).unwrap_or(4)
}

/// Raw TOML shape — every field optional so a partial file only overrides
/// what it mentions.
#[derive(Debug, Default, Deserialize)]
struct RawFileConfig {
    entity_db_path: Option<String>,
    job_db_path: Option<String>,
    conversation_db_path: Option<String>,
    ai_gateway_endpoint: Option<String>,
    ai_api_key: Option<String>,
    worker_pool_size: Option<u32>,
    daemon_health_interval_ms: Option<u64>,
    daemon_stop_timeout_ms: Option<u64>,
    progress_poll_interval_ms: Option<u64>,
    summarization_message_threshold: Option<u32>,
    summarization_minutes_threshold: Option<u32>,
}

impl KernelConfig {
    /// Load configuration: defaults, then an optional TOML file, then
    /// `BRAIN_*` environment overrides.
    pub fn load(file_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = file_path {
            let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
            let raw: RawFileConfig =
                toml::from_str(&contents).map_err(|e| ConfigError::ParseFailed {
                    path: path.display().to_string(),
                    message: e.to_string(),
                })?;
            config.apply_file(raw);
        }

        config.apply_env()?;
        Ok(config)
    }

    fn apply_file(&mut self, raw: RawFileConfig) {
        if let Some(v) = raw.entity_db_path {
            self.entity_db_path = v;
        }
        if let Some(v) = raw.job_db_path {
            self.job_db_path = v;
        }
        if let Some(v) = raw.conversation_db_path {
            self.conversation_db_path = v;
        }
        if let Some(v) = raw.ai_gateway_endpoint {
            self.ai_gateway_endpoint = v;
        }
        if let Some(v) = raw.ai_api_key {
            self.ai_api_key = v;
        }
        if let Some(v) = raw.worker_pool_size {
            self.worker_pool_size = v;
        }
        if let Some(v) = raw.daemon_health_interval_ms {
            self.daemon_health_interval_ms = v;
        }
        if let Some(v) = raw.daemon_stop_timeout_ms {
            self.daemon_stop_timeout_ms = v;
        }
        if let Some(v) = raw.progress_poll_interval_ms {
            self.progress_poll_interval_ms = v;
        }
        if let Some(v) = raw.summarization_message_threshold {
            self.summarization_message_threshold = v;
        }
        if let Some(v) = raw.summarization_minutes_threshold {
            self.summarization_minutes_threshold = v;
        }
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        env_string(&mut self.entity_db_path, "BRAIN_ENTITY_DB_PATH");
        env_string(&mut self.job_db_path, "BRAIN_JOB_DB_PATH");
        env_string(&mut self.conversation_db_path, "BRAIN_CONVERSATION_DB_PATH");
        env_string(&mut self.ai_gateway_endpoint, "BRAIN_AI_GATEWAY_ENDPOINT");
        env_string(&mut self.ai_api_key, "BRAIN_AI_API_KEY");
        env_parsed(&mut self.worker_pool_size, "BRAIN_WORKER_POOL_SIZE")?;
        env_parsed(&mut self.daemon_health_interval_ms, "BRAIN_DAEMON_HEALTH_INTERVAL_MS")?;
        env_parsed(&mut self.daemon_stop_timeout_ms, "BRAIN_DAEMON_STOP_TIMEOUT_MS")?;
        env_parsed(&mut self.progress_poll_interval_ms, "BRAIN_PROGRESS_POLL_INTERVAL_MS")?;
        env_parsed(
            &mut self.summarization_message_threshold,
            "BRAIN_SUMMARIZATION_MESSAGE_THRESHOLD",
        )?;
        env_parsed(
            &mut self.summarization_minutes_threshold,
            "BRAIN_SUMMARIZATION_MINUTES_THRESHOLD",
        )?;
        Ok(())
    }
}

fn env_string(target: &mut String, key: &str) {
    if let Ok(val) = std::env::var(key) {
        *target = val;
    }
}

fn env_parsed<T: std::str::FromStr>(target: &mut T, key: &str) -> Result<(), ConfigError> {
    if let Ok(val) = std::env::var(key) {
        *target = val
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key: key.to_string(), message: val })?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
