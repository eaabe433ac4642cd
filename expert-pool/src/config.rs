//! Pool configuration.

use crate::error::ConfigError;
use std::env;
use std::time::Duration;

/// Environment variable overriding [`PoolConfig::max_instances_per_type`].
pub const MAX_INSTANCES_ENV: &str = "EXPERT_POOL_MAX_INSTANCES";
/// Environment variable overriding [`PoolConfig::idle_timeout`], in seconds.
pub const IDLE_TIMEOUT_ENV: &str = "EXPERT_POOL_IDLE_TIMEOUT_SECS";

/// Configuration for the expert pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Capacity applied to every expert type that does not set its own `max_instances`.
    pub max_instances_per_type: usize,
    /// Idle duration after which [`ExpertPool::cleanup_expired`](crate::ExpertPool::cleanup_expired)
    /// evicts an instance. The pool never sweeps on its own.
    pub idle_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_instances_per_type: 3,
            idle_timeout: Duration::from_secs(30 * 60),
        }
    }
}

impl PoolConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_instances_per_type(mut self, max: usize) -> Self {
        self.max_instances_per_type = max;
        self
    }

    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Build a config from the process environment, falling back to defaults
    /// for unset variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(MAX_INSTANCES_ENV) {
            config.max_instances_per_type = parse_value(MAX_INSTANCES_ENV, &raw)?;
        }

        if let Some(raw) = lookup(IDLE_TIMEOUT_ENV) {
            let secs: u64 = parse_value(IDLE_TIMEOUT_ENV, &raw)?;
            config.idle_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: raw.to_string(),
    })
}
