//! Worker configuration: TOML file plus environment overrides.

use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::worker::WorkerSettings;
use reporter_breaker::BreakerPolicy;

fn default_workers() -> usize {
    4
}

fn default_message_timeout_secs() -> u64 {
    300
}

fn default_failure_threshold() -> u32 {
    5
}

fn default_cooldown_secs() -> u64 {
    30
}

fn default_schema() -> String {
    "public".to_string()
}

fn default_max_connections() -> u32 {
    100
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub workers: usize,
    pub message_timeout_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            message_timeout_secs: default_message_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BreakerConfig {
    pub failure_threshold: u32,
    pub cooldown_secs: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            cooldown_secs: default_cooldown_secs(),
        }
    }
}

/// One configured data source. The connection itself is owned by the host
/// process; `max_connections` bounds its session pool.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub database_type: String,
    #[serde(default)]
    pub schemas: Vec<String>,
    #[serde(default = "default_schema")]
    pub default_schema: String,
    #[serde(default)]
    pub encryption_profile: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub breaker: BreakerConfig,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

impl Config {
    /// Load from a TOML file, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let mut config = Self::from_toml(&raw)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).context("failed to parse config file")
    }

    /// `REPORTER_WORKERS` and `REPORTER_MESSAGE_TIMEOUT_SECS` override the
    /// file values when set.
    pub fn apply_env_overrides(&mut self) {
        if let Some(workers) = env_number("REPORTER_WORKERS") {
            self.worker.workers = workers as usize;
        }
        if let Some(timeout) = env_number("REPORTER_MESSAGE_TIMEOUT_SECS") {
            self.worker.message_timeout_secs = timeout;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.worker.workers == 0 {
            bail!("worker.workers must be at least 1");
        }
        if self.worker.message_timeout_secs == 0 {
            bail!("worker.message_timeout_secs must be at least 1");
        }
        for source in &self.sources {
            if source.name.is_empty() {
                bail!("every source needs a name");
            }
            if !matches!(source.database_type.as_str(), "postgresql" | "mongodb") {
                bail!(
                    "source {}: unsupported database_type {:?}",
                    source.name,
                    source.database_type
                );
            }
            if source.max_connections == 0 {
                bail!("source {}: max_connections must be at least 1", source.name);
            }
        }
        let mut names: Vec<&str> = self.sources.iter().map(|s| s.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        if names.len() != self.sources.len() {
            bail!("source names must be unique");
        }
        Ok(())
    }

    pub fn worker_settings(&self) -> WorkerSettings {
        WorkerSettings {
            workers: self.worker.workers,
            message_timeout: std::time::Duration::from_secs(self.worker.message_timeout_secs),
        }
    }

    pub fn breaker_policy(&self) -> BreakerPolicy {
        BreakerPolicy {
            failure_threshold: self.breaker.failure_threshold,
            cooldown: std::time::Duration::from_secs(self.breaker.cooldown_secs),
        }
    }
}

fn env_number(name: &str) -> Option<u64> {
    std::env::var(name).ok()?.trim().parse().ok()
}
