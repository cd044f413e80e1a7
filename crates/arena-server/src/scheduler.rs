//! Match scheduling state machine
//!
//! A match moves through three states:
//!
//! ```text
//! planned (FIFO queue) --dispatch--> ongoing (by id) --complete/timeout--> recorded
//! ```
//!
//! Queue, ongoing set and the autoplay flag live behind one async lock, so a
//! match id is only ever in one place and is handed to exactly one runner.
//! Completion persists the game while still holding that lock, bounded by
//! the store timeout; the result cache is always locked after the scheduler,
//! never before.

use arena_core::{
    Clock, ErrorPayload, GameRecord, GameResult, Match, ScheduleError, TeamImages,
};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;
use tournament::{select_opponent, select_team, RankingSnapshot, SelectionError};
use uuid::Uuid;

use crate::error::{ArenaError, ArenaResult};
use crate::repository::GameRepository;
use crate::roster::{Entrants, Roster};
use crate::settings::SettingsHandle;

/// Extra time a match gets past its timeout before it is swept
pub const DEFAULT_TIMEOUT_GRACE_SECS: i64 = 30;
/// Autoplay never grows the planned queue past this
pub const DEFAULT_MAX_PLANNED_MATCHES: usize = 50;
/// Longest a single game write may take before it counts as failed
pub const DEFAULT_STORE_TIMEOUT_SECS: u64 = 5;

/// Fixed scheduler tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Added to the match timeout before a match is declared timed out
    pub timeout_grace: Duration,
    /// Cap on the planned queue for autoplay
    pub max_planned: usize,
    /// Deadline for persisting one finished game
    pub store_timeout: std::time::Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            timeout_grace: Duration::seconds(DEFAULT_TIMEOUT_GRACE_SECS),
            max_planned: DEFAULT_MAX_PLANNED_MATCHES,
            store_timeout: std::time::Duration::from_secs(DEFAULT_STORE_TIMEOUT_SECS),
        }
    }
}

/// Outcome of one timeout sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Matches removed from the ongoing set
    pub swept: usize,
    /// Swept matches whose error record could not be stored
    pub unsaved: usize,
}

#[derive(Debug, Default)]
struct SchedulerState {
    planned: VecDeque<Match>,
    ongoing: HashMap<Uuid, Match>,
    autoplay: bool,
}

impl SchedulerState {
    /// One entry per team slot in the planned queue.
    fn pending_team_ids(&self) -> Vec<String> {
        self.planned
            .iter()
            .flat_map(|m| [m.team1_id.clone(), m.team2_id.clone()])
            .collect()
    }
}

pub struct MatchScheduler {
    state: RwLock<SchedulerState>,
    repository: Arc<GameRepository>,
    roster: Arc<dyn Roster>,
    settings: Arc<SettingsHandle>,
    clock: Arc<dyn Clock>,
    config: SchedulerConfig,
}

impl MatchScheduler {
    pub fn new(
        repository: Arc<GameRepository>,
        roster: Arc<dyn Roster>,
        settings: Arc<SettingsHandle>,
        clock: Arc<dyn Clock>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            state: RwLock::new(SchedulerState::default()),
            repository,
            roster,
            settings,
            clock,
            config,
        }
    }

    /// Append a match to the planned queue.
    ///
    /// Both teams must be distinct and registered. The scheduler assigns the
    /// match a fresh id and clears any launch stamp; the queued match is
    /// returned.
    pub async fn enqueue(&self, mut m: Match) -> Result<Match, ScheduleError> {
        if m.team1_id == m.team2_id {
            return Err(ScheduleError::SameTeam);
        }

        let teams = self
            .roster
            .teams()
            .await
            .map_err(|e| ScheduleError::ImageLookup(format!("{e:#}")))?;
        for id in [&m.team1_id, &m.team2_id] {
            if !teams.iter().any(|t| &t.id == id) {
                return Err(ScheduleError::UnknownTeam(id.clone()));
            }
        }

        m.id = Uuid::new_v4();
        m.launch_time = None;

        let mut state = self.state.write().await;
        state.planned.push_back(m.clone());
        tracing::debug!(match_id = %m.id, team1 = %m.team1_id, team2 = %m.team2_id, "match enqueued");
        Ok(m)
    }

    /// Queue a match between two specific contestants.
    ///
    /// Both ids are resolved to their current image before anything is
    /// queued; any failure leaves the scheduler untouched.
    pub async fn force_enqueue(&self, team1_id: &str, team2_id: &str) -> Result<Match, ScheduleError> {
        if team1_id == team2_id {
            return Err(ScheduleError::SameTeam);
        }

        let teams = self
            .roster
            .teams()
            .await
            .map_err(|e| ScheduleError::ImageLookup(format!("{e:#}")))?;
        for id in [team1_id, team2_id] {
            if !teams.iter().any(|t| t.id == id) {
                return Err(ScheduleError::UnknownTeam(id.to_string()));
            }
        }

        let ids = [team1_id.to_string(), team2_id.to_string()];
        let images = self.roster.list_images(&ids).await.map_err(|e| {
            tracing::warn!(error = %e, "image lookup failed");
            ScheduleError::ImageLookup(format!("{e:#}"))
        })?;

        let image1 = primary_image(&images, team1_id)?;
        let image2 = primary_image(&images, team2_id)?;
        let m = Match::planned(team1_id, &image1, team2_id, &image2);

        let mut state = self.state.write().await;
        state.planned.push_back(m.clone());
        tracing::info!(match_id = %m.id, team1 = team1_id, team2 = team2_id, "match force-queued");
        Ok(m)
    }

    /// Hand up to `n` planned matches to a runner.
    ///
    /// Never exceeds the free concurrency slots. Returned matches carry their
    /// launch stamp and are now ongoing.
    pub async fn dispatch(&self, n: usize) -> Vec<Match> {
        let max_concurrent = self.settings.snapshot().max_concurrent_matches;
        let mut state = self.state.write().await;

        let free = max_concurrent.saturating_sub(state.ongoing.len());
        let count = n.min(state.planned.len()).min(free);
        if count == 0 {
            return Vec::new();
        }

        let now = self.clock.now();
        let mut launched = Vec::with_capacity(count);
        for mut m in state.planned.drain(..count).collect::<Vec<_>>() {
            m.launch_time = Some(now);
            state.ongoing.insert(m.id, m.clone());
            launched.push(m);
        }

        tracing::debug!(
            dispatched = launched.len(),
            ongoing = state.ongoing.len(),
            planned = state.planned.len(),
            "matches dispatched"
        );
        launched
    }

    /// Record a runner's result for an ongoing match.
    ///
    /// Unknown or already finished ids are rejected without side effects. Once
    /// accepted the match is gone from the ongoing set even if persisting the
    /// record fails; it is never re-queued.
    pub async fn complete_match(&self, result: &GameResult) -> ArenaResult<GameRecord> {
        let mut state = self.state.write().await;
        let m = state
            .ongoing
            .remove(&result.id)
            .ok_or(ArenaError::UnknownMatch(result.id))?;

        let record = GameRecord::from_result(&m, result, self.clock.now());
        self.persist(record.clone()).await.map_err(ArenaError::Store)?;

        tracing::info!(
            match_id = %m.id,
            winner = record.winner_id.as_deref().unwrap_or("-"),
            is_error = record.is_error,
            "match completed"
        );
        Ok(record)
    }

    /// Complete every ongoing match that has overrun its deadline with a
    /// timeout error record.
    ///
    /// A match launched at `t` times out once `now > t + timeout + grace`.
    /// A swept match stays swept even when its record cannot be stored.
    pub async fn sweep_timeouts(&self) -> SweepReport {
        let timeout = self.settings.snapshot().match_timeout;
        let deadline = timeout + self.config.timeout_grace;
        let now = self.clock.now();

        let mut state = self.state.write().await;
        let expired: Vec<Uuid> = state
            .ongoing
            .values()
            .filter(|m| m.launch_time.is_some_and(|launched| now > launched + deadline))
            .map(|m| m.id)
            .collect();

        let mut report = SweepReport::default();
        for id in &expired {
            let Some(m) = state.ongoing.remove(id) else {
                continue;
            };
            tracing::warn!(
                match_id = %m.id,
                team1 = %m.team1_id,
                team2 = %m.team2_id,
                "match timed out"
            );
            let record = timeout_record(&m, timeout, now);
            report.swept += 1;
            if self.persist(record).await.is_err() {
                report.unsaved += 1;
            }
        }

        report
    }

    async fn persist(&self, record: GameRecord) -> anyhow::Result<()> {
        let id = record.id;
        let deadline = self.config.store_timeout;
        let stored = match tokio::time::timeout(deadline, self.repository.add_game(record)).await {
            Ok(stored) => stored,
            Err(_) => Err(anyhow::anyhow!(
                "store write timed out after {}ms",
                deadline.as_millis()
            )),
        };
        stored.map_err(|e| {
            tracing::error!(match_id = %id, error = %format!("{e:#}"), "failed to store game");
            e
        })
    }

    /// Forget every ongoing match. Planned matches stay queued.
    pub async fn reset(&self) {
        let mut state = self.state.write().await;
        let dropped = state.ongoing.len();
        state.ongoing.clear();
        tracing::info!(dropped, "ongoing matches reset");
    }

    /// Ongoing matches, oldest launch first.
    pub async fn list_ongoing(&self) -> Vec<Match> {
        let state = self.state.read().await;
        let mut ongoing: Vec<Match> = state.ongoing.values().cloned().collect();
        ongoing.sort_by_key(|m| (m.launch_time, m.id));
        ongoing
    }

    /// Planned matches in dispatch order.
    pub async fn list_planned(&self) -> Vec<Match> {
        self.state.read().await.planned.iter().cloned().collect()
    }

    pub async fn planned_len(&self) -> usize {
        self.state.read().await.planned.len()
    }

    pub async fn ongoing_len(&self) -> usize {
        self.state.read().await.ongoing.len()
    }

    pub async fn set_autoplay(&self, enabled: bool) {
        self.state.write().await.autoplay = enabled;
        tracing::info!(enabled, "autoplay toggled");
    }

    pub async fn is_autoplay_enabled(&self) -> bool {
        self.state.read().await.autoplay
    }

    /// Top up the planned queue with fairly selected matches.
    ///
    /// Adds at most one match per schedulable team and never grows the queue
    /// past the configured cap. Matches already queued count against their
    /// teams. If the ranking lacks a schedulable team, no further match is
    /// added this cycle and the error is returned. Returns the number of
    /// matches added.
    pub async fn plan_autoplay<R: Rng + Send>(
        &self,
        ranking: &RankingSnapshot,
        entrants: &Entrants,
        rng: &mut R,
    ) -> Result<usize, SelectionError> {
        let schedulable: Vec<TeamImages> = entrants.schedulable();
        let pool: Vec<TeamImages> = entrants.pool();
        if schedulable.is_empty() || pool.len() < 2 {
            return Ok(0);
        }

        let mut state = self.state.write().await;
        if !state.autoplay {
            return Ok(0);
        }

        let count = self
            .config
            .max_planned
            .saturating_sub(state.planned.len())
            .min(schedulable.len());

        let mut pending = state.pending_team_ids();
        let mut added = 0;
        for _ in 0..count {
            let primary = {
                let pending: Vec<&str> = pending.iter().map(String::as_str).collect();
                match select_team(ranking, &schedulable, &pending, rng) {
                    Ok(team) => team,
                    Err(e) => {
                        tracing::debug!(added, error = %e, "autoplay stopped early");
                        return Err(e);
                    }
                }
            };
            let Some(opponent) = select_opponent(&primary.team_id, &pool, rng) else {
                break;
            };
            let (Some(image1), Some(image2)) = (primary.primary(), opponent.primary()) else {
                continue;
            };

            let m = Match::planned(
                &primary.team_id,
                &image1.full_url,
                &opponent.team_id,
                &image2.full_url,
            );
            pending.push(m.team1_id.clone());
            pending.push(m.team2_id.clone());
            state.planned.push_back(m);
            added += 1;
        }

        if added > 0 {
            tracing::debug!(added, planned = state.planned.len(), "autoplay planned matches");
        }
        Ok(added)
    }

    /// Fetch the current entrants from the roster.
    pub async fn entrants(&self) -> anyhow::Result<Entrants> {
        Entrants::fetch(self.roster.as_ref()).await
    }
}

fn primary_image(images: &[TeamImages], team_id: &str) -> Result<String, ScheduleError> {
    images
        .iter()
        .find(|t| t.team_id == team_id)
        .and_then(TeamImages::primary)
        .map(|image| image.full_url.clone())
        .ok_or_else(|| ScheduleError::NoImage(team_id.to_string()))
}

/// Error record for a match that never reported back.
fn timeout_record(m: &Match, timeout: Duration, now: DateTime<Utc>) -> GameRecord {
    let result = GameResult {
        is_error: true,
        ..GameResult::draw(m.id)
    };
    let mut record = GameRecord::from_result(m, &result, now);

    let payload = ErrorPayload::timeout(format!(
        "no result received within {}s",
        timeout.num_seconds()
    ));
    record.error_data = match payload.encode() {
        Ok(encoded) => Some(encoded),
        Err(e) => {
            tracing::warn!(match_id = %m.id, error = %e, "failed to encode timeout payload");
            None
        }
    };
    record
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod scheduler_tests;
