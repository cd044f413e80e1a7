//! Server configuration
//!
//! Read from the TOML file named by `ARENA_CONFIG` (optional; every field has
//! a default), then overridden by environment variables:
//!
//! - `ARENA_SCHEDULER_INTERVAL_SECS`: scheduling daemon period (default: 1)
//! - `ARENA_RANKING_INTERVAL_SECS`: ranking daemon period (default: 30)
//! - `ARENA_ROSTER_PATH`: roster file to load

use anyhow::{Context, Result};
use arena_core::Settings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::{GAME_CACHE_SIZE, LIST_CACHE_SIZE};
use crate::daemon::DaemonConfig;
use crate::scheduler::{
    SchedulerConfig, DEFAULT_MAX_PLANNED_MATCHES, DEFAULT_STORE_TIMEOUT_SECS, DEFAULT_TIMEOUT_GRACE_SECS,
};

pub const CONFIG_PATH_ENV: &str = "ARENA_CONFIG";
pub const SCHEDULER_INTERVAL_ENV: &str = "ARENA_SCHEDULER_INTERVAL_SECS";
pub const RANKING_INTERVAL_ENV: &str = "ARENA_RANKING_INTERVAL_SECS";
pub const ROSTER_PATH_ENV: &str = "ARENA_ROSTER_PATH";

pub const DEFAULT_SCHEDULER_INTERVAL_SECS: u64 = 1;
pub const DEFAULT_RANKING_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_CYCLE_BUDGET_SECS: u64 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Seconds between scheduling daemon cycles
    pub scheduler_interval_secs: u64,
    /// Seconds between ranking daemon cycles
    pub ranking_interval_secs: u64,
    /// Time budget for the external calls of one daemon cycle
    pub cycle_budget_secs: u64,
    /// Extra seconds a match gets past its timeout
    pub timeout_grace_secs: i64,
    /// Deadline for storing one finished game
    pub store_timeout_secs: u64,
    pub max_planned_matches: usize,
    pub list_cache_size: usize,
    pub game_cache_size: usize,
    pub roster_path: Option<PathBuf>,
    /// Settings in effect at startup
    pub settings: Settings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            scheduler_interval_secs: DEFAULT_SCHEDULER_INTERVAL_SECS,
            ranking_interval_secs: DEFAULT_RANKING_INTERVAL_SECS,
            cycle_budget_secs: DEFAULT_CYCLE_BUDGET_SECS,
            timeout_grace_secs: DEFAULT_TIMEOUT_GRACE_SECS,
            store_timeout_secs: DEFAULT_STORE_TIMEOUT_SECS,
            max_planned_matches: DEFAULT_MAX_PLANNED_MATCHES,
            list_cache_size: LIST_CACHE_SIZE,
            game_cache_size: GAME_CACHE_SIZE,
            roster_path: None,
            settings: Settings::default(),
        }
    }
}

impl ServerConfig {
    /// Load the configuration the binary runs with.
    pub fn load() -> Result<Self> {
        let config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_file(&path)?,
            Err(_) => Self::default(),
        };
        Ok(config.with_overrides(|key| std::env::var(key).ok()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_toml(&source).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn from_toml(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value.
    ///
    /// Unparseable values are ignored.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(secs) = lookup(SCHEDULER_INTERVAL_ENV).and_then(|s| s.parse().ok()) {
            self.scheduler_interval_secs = secs;
        }
        if let Some(secs) = lookup(RANKING_INTERVAL_ENV).and_then(|s| s.parse().ok()) {
            self.ranking_interval_secs = secs;
        }
        if let Some(path) = lookup(ROSTER_PATH_ENV).filter(|p| !p.is_empty()) {
            self.roster_path = Some(PathBuf::from(path));
        }
        self
    }

    pub fn daemon_config(&self) -> DaemonConfig {
        DaemonConfig {
            scheduler_interval: Duration::from_secs(self.scheduler_interval_secs.max(1)),
            ranking_interval: Duration::from_secs(self.ranking_interval_secs.max(1)),
            cycle_budget: Duration::from_secs(self.cycle_budget_secs),
        }
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            timeout_grace: chrono::Duration::seconds(self.timeout_grace_secs.max(0)),
            max_planned: self.max_planned_matches,
            store_timeout: Duration::from_secs(self.store_timeout_secs.max(1)),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
