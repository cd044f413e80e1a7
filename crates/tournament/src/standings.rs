//! Windowed standings for every roster team

use arena_core::GameRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Win/draw/loss totals for one team over the ranking window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamStanding {
    pub team_id: String,
    pub total_games: u32,
    pub total_wins: u32,
    pub total_draws: u32,
    pub total_losses: u32,
}

impl TeamStanding {
    pub fn new(team_id: &str) -> Self {
        Self {
            team_id: team_id.to_string(),
            total_games: 0,
            total_wins: 0,
            total_draws: 0,
            total_losses: 0,
        }
    }

    /// Games that were neither won nor drawn.
    ///
    /// This counts losses together with errored games, which is what autoplay
    /// penalizes.
    pub fn total_errors(&self) -> u32 {
        self.total_games
            .saturating_sub(self.total_wins)
            .saturating_sub(self.total_draws)
    }

    /// Score over the window (1 for win, 0.5 for draw, 0 otherwise)
    pub fn score(&self) -> f64 {
        if self.total_games == 0 {
            return 0.0;
        }
        (self.total_wins as f64 + 0.5 * self.total_draws as f64) / self.total_games as f64
    }
}

/// Standings published by one ranking cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingSnapshot {
    /// Window length in milliseconds
    pub update_period: i64,
    pub results: Vec<TeamStanding>,
}

impl RankingSnapshot {
    pub fn new(update_period: i64, results: Vec<TeamStanding>) -> Self {
        Self {
            update_period,
            results,
        }
    }

    pub fn get(&self, team_id: &str) -> Option<&TeamStanding> {
        self.results.iter().find(|s| s.team_id == team_id)
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Accumulates standings, one entry per roster team.
#[derive(Debug, Clone, Default)]
pub struct StandingsTable {
    standings: Vec<TeamStanding>,
    index: HashMap<String, usize>,
}

impl StandingsTable {
    /// Seed a zero standing for each team.
    pub fn new<'a>(team_ids: impl IntoIterator<Item = &'a str>) -> Self {
        let mut table = Self::default();
        for id in team_ids {
            if table.index.contains_key(id) {
                continue;
            }
            table.index.insert(id.to_string(), table.standings.len());
            table.standings.push(TeamStanding::new(id));
        }
        table
    }

    /// Count one finished game.
    ///
    /// Both sides get a game even when the game errored; an errored game
    /// counts as neither a draw nor a result. Returns `false` (and counts
    /// nothing) when a participant is not in the table.
    pub fn record_game(&mut self, record: &GameRecord) -> bool {
        let (Some(&t1), Some(&t2)) = (
            self.index.get(&record.team1_id),
            self.index.get(&record.team2_id),
        ) else {
            return false;
        };

        self.standings[t1].total_games += 1;
        self.standings[t2].total_games += 1;

        if record.is_error {
            return true;
        }

        match record.winner_id.as_deref() {
            None => {
                self.standings[t1].total_draws += 1;
                self.standings[t2].total_draws += 1;
            }
            Some(winner) if winner == record.team1_id => {
                self.standings[t1].total_wins += 1;
                self.standings[t2].total_losses += 1;
            }
            Some(winner) if winner == record.team2_id => {
                self.standings[t2].total_wins += 1;
                self.standings[t1].total_losses += 1;
            }
            Some(winner) => {
                tracing::debug!(game_id = %record.id, winner, "winner is not a participant");
            }
        }

        true
    }

    pub fn get(&self, team_id: &str) -> Option<&TeamStanding> {
        self.index.get(team_id).map(|&i| &self.standings[i])
    }

    pub fn into_snapshot(self, update_period: i64) -> RankingSnapshot {
        RankingSnapshot::new(update_period, self.standings)
    }
}

/// Compute fresh standings for `team_ids` from the games in the window.
///
/// Games naming a team outside the roster are skipped.
pub fn tally<'a, 'r>(
    team_ids: impl IntoIterator<Item = &'a str>,
    records: impl IntoIterator<Item = &'r GameRecord>,
    update_period: i64,
) -> RankingSnapshot {
    let mut table = StandingsTable::new(team_ids);
    for record in records {
        if !table.record_game(record) {
            tracing::debug!(
                game_id = %record.id,
                team1 = %record.team1_id,
                team2 = %record.team2_id,
                "skipping game with a team outside the roster"
            );
        }
    }
    table.into_snapshot(update_period)
}

#[cfg(test)]
#[path = "standings_tests.rs"]
mod standings_tests;
