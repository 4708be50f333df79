//! Batcher and pool configuration structures.

use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default accumulation window in milliseconds.
pub const DEFAULT_WINDOW_MS: u64 = 10;
/// Default cap on operations per flush.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 100;
/// Default maximum age of the oldest pending operation in milliseconds.
pub const DEFAULT_MAX_WAIT_MS: u64 = 50;

/// Flush policy for a single batcher.
///
/// Fields missing from serialized input fall back to the crate defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatcherConfig {
    /// Passive delay allowed to accumulate more operations before a flush fires.
    pub window_ms: u64,
    /// Hard cap on operations drained per flush.
    pub max_batch_size: usize,
    /// Maximum age of the oldest pending operation. A flush starts once it is
    /// reached even if the window has not elapsed, unless a drain is already
    /// in flight.
    pub max_wait_ms: u64,
    /// Maximum queued operations before `execute` rejects. `None` is unbounded.
    pub max_queue_depth: Option<usize>,
}

impl Default for BatcherConfig {
    fn default() -> Self {
        Self {
            window_ms: DEFAULT_WINDOW_MS,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            max_wait_ms: DEFAULT_MAX_WAIT_MS,
            max_queue_depth: None,
        }
    }
}

impl BatcherConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the accumulation window.
    #[must_use]
    pub const fn with_window_ms(mut self, window_ms: u64) -> Self {
        self.window_ms = window_ms;
        self
    }

    /// Set the per-flush size cap.
    #[must_use]
    pub const fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = max_batch_size;
        self
    }

    /// Set the forced-flush age.
    #[must_use]
    pub const fn with_max_wait_ms(mut self, max_wait_ms: u64) -> Self {
        self.max_wait_ms = max_wait_ms;
        self
    }

    /// Bound the queue; further `execute` calls are rejected once it is reached.
    #[must_use]
    pub const fn with_max_queue_depth(mut self, max_queue_depth: usize) -> Self {
        self.max_queue_depth = Some(max_queue_depth);
        self
    }

    /// Accumulation window as a [`Duration`].
    pub const fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    /// Forced-flush age as a [`Duration`].
    pub const fn max_wait(&self) -> Duration {
        Duration::from_millis(self.max_wait_ms)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_batch_size == 0 {
            return Err("max_batch_size must be greater than 0".into());
        }
        if self.max_queue_depth == Some(0) {
            return Err("max_queue_depth must be greater than 0 when set".into());
        }
        Ok(())
    }

    /// Load a configuration from `<PREFIX>_WINDOW_MS`, `<PREFIX>_MAX_BATCH_SIZE`,
    /// `<PREFIX>_MAX_WAIT_MS` and `<PREFIX>_MAX_QUEUE_DEPTH`, reading a `.env`
    /// file first if one is present. Unset variables keep their defaults.
    pub fn from_env(prefix: &str) -> Result<Self, String> {
        let _ = dotenvy::dotenv();

        let mut cfg = Self::default();
        if let Some(v) = read_env(prefix, "WINDOW_MS")? {
            cfg.window_ms = v;
        }
        if let Some(v) = read_env(prefix, "MAX_BATCH_SIZE")? {
            cfg.max_batch_size = v;
        }
        if let Some(v) = read_env(prefix, "MAX_WAIT_MS")? {
            cfg.max_wait_ms = v;
        }
        if let Some(v) = read_env(prefix, "MAX_QUEUE_DEPTH")? {
            cfg.max_queue_depth = Some(v);
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

fn read_env<V>(prefix: &str, key: &str) -> Result<Option<V>, String>
where
    V: FromStr,
    V::Err: Display,
{
    let name = format!("{prefix}_{key}");
    match std::env::var(&name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| format!("{name}: {e}")),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(format!("{name}: {e}")),
    }
}

/// Pool configuration: a default policy plus per-domain overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Policy used for domains without an explicit entry.
    pub default: BatcherConfig,
    /// Map of domain key to its own policy.
    pub domains: HashMap<String, BatcherConfig>,
}

impl PoolConfig {
    /// Create a pool configuration with the given default policy.
    pub fn new(default: BatcherConfig) -> Self {
        Self {
            default,
            domains: HashMap::new(),
        }
    }

    /// Add or replace the policy for a domain.
    #[must_use]
    pub fn with_domain(mut self, domain: impl Into<String>, config: BatcherConfig) -> Self {
        self.domains.insert(domain.into(), config);
        self
    }

    /// Policy that applies to `domain`.
    pub fn for_domain(&self, domain: &str) -> &BatcherConfig {
        self.domains.get(domain).unwrap_or(&self.default)
    }

    /// Validate the default policy and every domain override.
    pub fn validate(&self) -> Result<(), String> {
        self.default
            .validate()
            .map_err(|e| format!("default policy invalid: {e}"))?;
        for (name, domain) in &self.domains {
            domain
                .validate()
                .map_err(|e| format!("domain `{name}` invalid: {e}"))?;
        }
        Ok(())
    }

    /// Parse pool configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }
}
