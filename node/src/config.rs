// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Node configuration.
//!
//! Defaults match a single-user deployment: state under `$HOME/app-data`,
//! three store attempts with 400ms..4s backoff. Every field can be
//! overridden through a `STATEHOST_*` environment variable.

use statehost_kernel::{ReplayPolicy, SnapshotFormat};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Retry tunables applied to every Durable Store operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryOptions {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(400),
            max_delay: Duration::from_secs(4),
        }
    }
}

impl RetryOptions {
    /// No waiting between attempts. Used by tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }
}

/// When the snapshot manager writes a new snapshot, and what it keeps.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SnapshotPolicy {
    /// Snapshot once this many transitions accumulated since the last one.
    pub every_transitions: Option<u64>,
    /// Snapshot once this many encoded log bytes accumulated since the last one.
    pub max_log_bytes: Option<u64>,
    /// Number of snapshots kept after a successful write (at least 1).
    pub retain: usize,
    /// Remove log records covered by the oldest retained snapshot.
    pub compact_log: bool,
}

impl Default for SnapshotPolicy {
    fn default() -> Self {
        Self {
            every_transitions: Some(1000),
            max_log_bytes: Some(64 * 1024 * 1024),
            retain: 3,
            compact_log: false,
        }
    }
}

impl SnapshotPolicy {
    pub fn every(transitions: u64) -> Self {
        Self {
            every_transitions: Some(transitions),
            max_log_bytes: None,
            ..Self::default()
        }
    }

    pub fn never() -> Self {
        Self {
            every_transitions: None,
            max_log_bytes: None,
            ..Self::default()
        }
    }

    pub fn is_due(&self, transitions_since: u64, bytes_since: u64) -> bool {
        if transitions_since == 0 {
            return false;
        }
        let by_count = self.every_transitions.map_or(false, |k| transitions_since >= k);
        let by_size = self.max_log_bytes.map_or(false, |max| bytes_since >= max);
        by_count || by_size
    }
}

/// Everything the engine needs besides the program and the store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EngineOptions {
    pub format: SnapshotFormat,
    pub snapshot: SnapshotPolicy,
    pub replay: ReplayPolicy,
}

#[derive(Clone, Debug)]
pub struct NodeConfig {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub retry: RetryOptions,
    pub engine: EngineOptions,
    /// Requests waiting for the processor beyond this are refused.
    pub queue_depth: usize,
    pub max_body_bytes: usize,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            data_dir: default_data_dir(|key| std::env::var(key).ok()),
            retry: RetryOptions::default(),
            engine: EngineOptions::default(),
            queue_depth: 1024,
            max_body_bytes: 16 * 1024 * 1024,
        }
    }
}

impl NodeConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup (the environment in
    /// production, a map in tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self {
            data_dir: default_data_dir(&lookup),
            ..Self::default()
        };

        if let Some(v) = lookup("STATEHOST_BIND") {
            cfg.bind_addr = parse("STATEHOST_BIND", &v)?;
        }
        if let Some(v) = lookup("STATEHOST_DATA_DIR") {
            cfg.data_dir = PathBuf::from(v);
        }

        if let Some(v) = lookup("STATEHOST_RETRY_ATTEMPTS") {
            let attempts: u32 = parse("STATEHOST_RETRY_ATTEMPTS", &v)?;
            if attempts == 0 {
                return Err(invalid("STATEHOST_RETRY_ATTEMPTS", &v, "must be at least 1"));
            }
            cfg.retry.max_attempts = attempts;
        }
        if let Some(v) = lookup("STATEHOST_RETRY_INITIAL_MS") {
            cfg.retry.initial_delay = Duration::from_millis(parse("STATEHOST_RETRY_INITIAL_MS", &v)?);
        }
        if let Some(v) = lookup("STATEHOST_RETRY_MAX_MS") {
            cfg.retry.max_delay = Duration::from_millis(parse("STATEHOST_RETRY_MAX_MS", &v)?);
        }

        if let Some(v) = lookup("STATEHOST_SNAPSHOT_EVERY") {
            cfg.engine.snapshot.every_transitions = parse_optional("STATEHOST_SNAPSHOT_EVERY", &v)?;
        }
        if let Some(v) = lookup("STATEHOST_SNAPSHOT_MAX_LOG_BYTES") {
            cfg.engine.snapshot.max_log_bytes = parse_optional("STATEHOST_SNAPSHOT_MAX_LOG_BYTES", &v)?;
        }
        if let Some(v) = lookup("STATEHOST_SNAPSHOT_RETAIN") {
            let retain: usize = parse("STATEHOST_SNAPSHOT_RETAIN", &v)?;
            if retain == 0 {
                return Err(invalid("STATEHOST_SNAPSHOT_RETAIN", &v, "must be at least 1"));
            }
            cfg.engine.snapshot.retain = retain;
        }
        if let Some(v) = lookup("STATEHOST_COMPACT_LOG") {
            cfg.engine.snapshot.compact_log = parse_bool("STATEHOST_COMPACT_LOG", &v)?;
        }
        if let Some(v) = lookup("STATEHOST_SNAPSHOT_FORMAT") {
            cfg.engine.format = v
                .parse()
                .map_err(|e: statehost_kernel::KernelError| invalid("STATEHOST_SNAPSHOT_FORMAT", &v, &e.to_string()))?;
        }
        if let Some(v) = lookup("STATEHOST_VERIFY_REPLAY") {
            cfg.engine.replay.verify_responses = parse_bool("STATEHOST_VERIFY_REPLAY", &v)?;
        }
        if let Some(v) = lookup("STATEHOST_STATE_DIGEST") {
            cfg.engine.replay.record_state_digest = parse_bool("STATEHOST_STATE_DIGEST", &v)?;
        }

        if let Some(v) = lookup("STATEHOST_QUEUE_DEPTH") {
            let depth: usize = parse("STATEHOST_QUEUE_DEPTH", &v)?;
            if depth == 0 {
                return Err(invalid("STATEHOST_QUEUE_DEPTH", &v, "must be at least 1"));
            }
            cfg.queue_depth = depth;
        }
        if let Some(v) = lookup("STATEHOST_MAX_BODY_BYTES") {
            cfg.max_body_bytes = parse("STATEHOST_MAX_BODY_BYTES", &v)?;
        }

        Ok(cfg)
    }
}

/// `<root>/app-data`, root being the first of HOME, HOME_EXPANDED,
/// USERPROFILE, or the current directory.
pub fn default_data_dir<F>(lookup: F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    let root = ["HOME", "HOME_EXPANDED", "USERPROFILE"]
        .iter()
        .find_map(|key| lookup(key).filter(|v| !v.is_empty()))
        .map(PathBuf::from)
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));
    root.join("app-data")
}

fn invalid(key: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| invalid(key, value, &e.to_string()))
}

/// `off`, `none` or `0` disable the trigger.
fn parse_optional(key: &'static str, value: &str) -> Result<Option<u64>, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "off" | "none" | "0" => Ok(None),
        _ => parse(key, value).map(Some),
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(key, value, "expected a boolean")),
    }
}
