//! Publishes windowed standings for autoplay and the stats surface

use anyhow::{Context, Result};
use arena_core::Clock;
use std::sync::{Arc, PoisonError, RwLock};
use tournament::{tally, RankingSnapshot};

use crate::cache::ResultCache;
use crate::roster::Roster;
use crate::settings::SettingsHandle;

pub struct RankingAggregator {
    current: RwLock<Arc<RankingSnapshot>>,
    cache: Arc<ResultCache>,
    roster: Arc<dyn Roster>,
    settings: Arc<SettingsHandle>,
    clock: Arc<dyn Clock>,
}

impl RankingAggregator {
    pub fn new(
        cache: Arc<ResultCache>,
        roster: Arc<dyn Roster>,
        settings: Arc<SettingsHandle>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            current: RwLock::new(Arc::new(RankingSnapshot::default())),
            cache,
            roster,
            settings,
            clock,
        }
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> Arc<RankingSnapshot> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Recompute standings over the ranking window and publish them.
    ///
    /// On error the previously published snapshot stays in place.
    pub async fn recompute(&self) -> Result<Arc<RankingSnapshot>> {
        let period = self.settings.snapshot().ranking_period;
        let now = self.clock.now();

        let teams = self.roster.teams().await.context("failed to list teams for ranking")?;
        let records = self.cache.get_since(now - period);

        let snapshot = Arc::new(tally(
            teams.iter().map(|t| t.id.as_str()),
            records.iter().filter(|r| r.end_time <= now).map(|r| r.as_ref()),
            period.num_milliseconds(),
        ));
        self.publish(Arc::clone(&snapshot));

        tracing::debug!(
            teams = snapshot.results.len(),
            games = records.len(),
            "ranking updated"
        );
        Ok(snapshot)
    }

    fn publish(&self, snapshot: Arc<RankingSnapshot>) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = snapshot;
    }
}

#[cfg(test)]
#[path = "ranking_tests.rs"]
mod ranking_tests;
