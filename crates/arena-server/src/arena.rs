//! Service facade
//!
//! [`Arena`] wires the scheduler, repository, ranking and settings together
//! and exposes the operations the transport layer maps onto runner, public
//! and admin routes.

use anyhow::Result;
use arena_core::{Clock, GameRecord, GameResult, Match, Settings, SettingsUpdate};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tournament::{generate_report, RankingSnapshot};
use uuid::Uuid;

use crate::cache::ResultCache;
use crate::config::ServerConfig;
use crate::daemon::{DaemonConfig, Daemons};
use crate::error::{ArenaError, ArenaResult};
use crate::ranking::RankingAggregator;
use crate::repository::GameRepository;
use crate::roster::Roster;
use crate::scheduler::MatchScheduler;
use crate::settings::SettingsHandle;
use crate::store::GameStore;

/// Work handed to a runner on pop.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunnerAssignment {
    /// How many matches the runner may run at once
    pub max_matches_per_runner: usize,
    pub match_timeout_secs: i64,
    pub matches: Vec<Match>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OngoingMatch {
    pub id: Uuid,
    pub team1_id: String,
    pub team2_id: String,
    pub start_time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_games: u64,
    pub end_time: DateTime<Utc>,
    pub ranking: RankingSnapshot,
}

/// What a client needs to render the competition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchData {
    /// Team id to display name
    pub team_id_mapping: HashMap<String, String>,
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GamePage {
    pub results: Vec<GameRecord>,
    pub total_game_count: u64,
}

pub struct Arena {
    scheduler: Arc<MatchScheduler>,
    repository: Arc<GameRepository>,
    ranking: Arc<RankingAggregator>,
    settings: Arc<SettingsHandle>,
    roster: Arc<dyn Roster>,
    clock: Arc<dyn Clock>,
}

impl Arena {
    pub fn new(
        config: &ServerConfig,
        store: Arc<dyn GameStore>,
        roster: Arc<dyn Roster>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let cache = Arc::new(ResultCache::new(config.list_cache_size, config.game_cache_size));
        let settings = Arc::new(SettingsHandle::new(config.settings.clone()));
        let repository = Arc::new(GameRepository::new(store, Arc::clone(&cache)));

        let scheduler = Arc::new(MatchScheduler::new(
            Arc::clone(&repository),
            Arc::clone(&roster),
            Arc::clone(&settings),
            Arc::clone(&clock),
            config.scheduler_config(),
        ));
        let ranking = Arc::new(RankingAggregator::new(
            cache,
            Arc::clone(&roster),
            Arc::clone(&settings),
            Arc::clone(&clock),
        ));

        Self {
            scheduler,
            repository,
            ranking,
            settings,
            roster,
            clock,
        }
    }

    /// Warm the cache and publish a first ranking.
    ///
    /// A cache warm-up failure is fatal; a failed first ranking is not, the
    /// ranking daemon retries it.
    pub async fn start(&self) -> Result<()> {
        self.repository.warm_up().await?;
        if let Err(e) = self.ranking.recompute().await {
            tracing::warn!(error = %format!("{e:#}"), "initial ranking failed");
        }
        Ok(())
    }

    pub fn spawn_daemons(&self, config: DaemonConfig) -> Daemons {
        Daemons::spawn(
            Arc::clone(&self.scheduler),
            Arc::clone(&self.ranking),
            Arc::clone(self.repository.cache()),
            config,
        )
    }

    pub fn scheduler(&self) -> &Arc<MatchScheduler> {
        &self.scheduler
    }

    pub fn ranking(&self) -> &Arc<RankingAggregator> {
        &self.ranking
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        self.repository.cache()
    }

    pub async fn pop_matches(&self, n: usize) -> RunnerAssignment {
        let settings = self.settings.snapshot();
        let matches = self.scheduler.dispatch(n).await;
        RunnerAssignment {
            max_matches_per_runner: settings.max_matches_per_runner,
            match_timeout_secs: settings.match_timeout.num_seconds(),
            matches,
        }
    }

    pub async fn submit_result(&self, result: &GameResult) -> ArenaResult<()> {
        self.scheduler.complete_match(result).await.map(|_| ())
    }

    pub async fn force_enqueue(&self, team1_id: &str, team2_id: &str) -> ArenaResult<Match> {
        Ok(self.scheduler.force_enqueue(team1_id, team2_id).await?)
    }

    pub async fn set_autoplay(&self, enabled: bool) {
        self.scheduler.set_autoplay(enabled).await;
    }

    pub async fn list_ongoing(&self) -> Vec<OngoingMatch> {
        self.scheduler
            .list_ongoing()
            .await
            .into_iter()
            .filter_map(|m| {
                Some(OngoingMatch {
                    start_time: m.launch_time?,
                    id: m.id,
                    team1_id: m.team1_id,
                    team2_id: m.team2_id,
                })
            })
            .collect()
    }

    pub fn settings(&self) -> Settings {
        self.settings.snapshot()
    }

    pub fn update_settings(&self, update: &SettingsUpdate) -> ArenaResult<Settings> {
        Ok(self.settings.update(update)?)
    }

    pub fn stats(&self) -> Stats {
        Stats {
            total_games: self.repository.total_games(),
            end_time: self.settings.snapshot().end_time,
            ranking: self.ranking.snapshot().as_ref().clone(),
        }
    }

    pub async fn launch_data(&self) -> ArenaResult<LaunchData> {
        Ok(LaunchData {
            team_id_mapping: self.team_names().await?,
            end_time: self.settings.snapshot().end_time,
        })
    }

    pub fn is_expired(&self) -> bool {
        self.settings.snapshot().is_expired(self.clock.now())
    }

    pub async fn list_games(&self, limit: usize, page: usize) -> ArenaResult<GamePage> {
        let results = self
            .repository
            .list_games(limit, page)
            .await
            .map_err(ArenaError::Store)?;
        Ok(GamePage {
            results: results.iter().map(|r| r.as_ref().clone()).collect(),
            total_game_count: self.repository.total_games(),
        })
    }

    pub async fn get_game(&self, id: Uuid) -> ArenaResult<Option<Arc<GameRecord>>> {
        self.repository.get_game(id).await.map_err(ArenaError::Store)
    }

    pub async fn reset(&self) {
        self.scheduler.reset().await;
    }

    /// Text leaderboard of the current ranking window.
    pub async fn leaderboard(&self) -> ArenaResult<String> {
        let names = self.team_names().await?;
        Ok(generate_report(&self.ranking.snapshot(), &names))
    }

    async fn team_names(&self) -> ArenaResult<HashMap<String, String>> {
        let teams = self.roster.teams().await.map_err(ArenaError::Roster)?;
        Ok(teams.into_iter().map(|t| (t.id, t.name)).collect())
    }
}
