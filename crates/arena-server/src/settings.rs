//! Shared, live-updatable competition settings

use arena_core::{Settings, SettingsError, SettingsUpdate};
use std::sync::{PoisonError, RwLock};

/// Current settings, replaced as a whole on every accepted update.
#[derive(Debug, Default)]
pub struct SettingsHandle {
    current: RwLock<Settings>,
}

impl SettingsHandle {
    pub fn new(settings: Settings) -> Self {
        Self {
            current: RwLock::new(settings),
        }
    }

    /// Copy of the settings to use for one decision.
    pub fn snapshot(&self) -> Settings {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Validate and apply `update`. On error nothing changes.
    pub fn update(&self, update: &SettingsUpdate) -> Result<Settings, SettingsError> {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let next = current.apply(update)?;
        *current = next.clone();
        tracing::info!(
            end_time = %next.end_time,
            max_concurrent = next.max_concurrent_matches,
            timeout_secs = next.match_timeout.num_seconds(),
            "settings updated"
        );
        Ok(next)
    }
}
