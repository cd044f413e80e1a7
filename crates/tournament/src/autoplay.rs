//! Fair selection of the next team to schedule
//!
//! Every schedulable team starts with the same probability. Teams that have
//! played less than average (counting matches already waiting in the planned
//! queue) are boosted, teams above average are shrunk, and teams whose error
//! count is an outlier are halved. Only the final draw is random, so the
//! weights can be inspected and tested directly.

use arena_core::TeamImages;
use rand::Rng;
use std::collections::HashMap;
use thiserror::Error;

use crate::standings::RankingSnapshot;
use crate::stats::Summary;

/// Why no team could be selected this cycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("no schedulable teams")]
    NoCandidates,
    /// Deciding on partial standings would be unfair, so the cycle is skipped.
    #[error("team {team_id} is missing from the ranking")]
    MissingRanking { team_id: String },
}

/// One schedulable team and its selection weight.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate<'a> {
    pub team: &'a TeamImages,
    /// Games in the ranking window plus matches already planned
    pub games: u32,
    /// Games neither won nor drawn in the ranking window
    pub errors: u32,
    pub weight: f64,
}

/// Weighted team picker built from the current standings.
#[derive(Debug, Clone)]
pub struct FairnessSelector<'a> {
    candidates: Vec<Candidate<'a>>,
}

impl<'a> FairnessSelector<'a> {
    /// Build the candidate list and compute weights.
    ///
    /// `pending` holds one entry per team slot in the planned queue, so a team
    /// appearing in two planned matches appears twice.
    pub fn new(
        ranking: &RankingSnapshot,
        schedulable: &'a [TeamImages],
        pending: &[&str],
    ) -> Result<Self, SelectionError> {
        let mut pending_counts: HashMap<&str, u32> = HashMap::new();
        for id in pending {
            *pending_counts.entry(*id).or_insert(0) += 1;
        }

        let available: Vec<&TeamImages> = schedulable.iter().filter(|t| t.is_available()).collect();
        if available.is_empty() {
            return Err(SelectionError::NoCandidates);
        }

        let base_weight = 1.0 / available.len() as f64;
        let mut candidates = Vec::with_capacity(available.len());
        for team in available {
            let standing = ranking
                .get(&team.team_id)
                .ok_or_else(|| SelectionError::MissingRanking {
                    team_id: team.team_id.clone(),
                })?;

            let pending = pending_counts.get(team.team_id.as_str()).copied().unwrap_or(0);
            candidates.push(Candidate {
                team,
                games: standing.total_games + pending,
                errors: standing.total_errors(),
                weight: base_weight,
            });
        }

        compute_weights(&mut candidates);
        Ok(Self { candidates })
    }

    #[cfg(test)]
    pub(crate) fn candidates(&self) -> &[Candidate<'a>] {
        &self.candidates
    }

    /// Weight of `team_id`, if it is a candidate.
    #[cfg(test)]
    pub(crate) fn weight_of(&self, team_id: &str) -> Option<f64> {
        self.candidates
            .iter()
            .find(|c| c.team.team_id == team_id)
            .map(|c| c.weight)
    }

    /// Draw one team proportionally to its weight.
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> &'a TeamImages {
        if let [only] = self.candidates.as_slice() {
            return only.team;
        }

        let total: f64 = self.candidates.iter().map(|c| c.weight).sum();
        if total <= 0.0 {
            let idx = rng.gen_range(0..self.candidates.len());
            return self.candidates[idx].team;
        }

        let draw = rng.gen_range(0.0..total);
        let mut cumulative = 0.0;
        let mut last_positive = self.candidates[0].team;
        for candidate in &self.candidates {
            if candidate.weight <= 0.0 {
                continue;
            }
            cumulative += candidate.weight;
            last_positive = candidate.team;
            if cumulative >= draw {
                return candidate.team;
            }
        }

        // Rounding can leave the draw a hair above the final cumulative sum
        last_positive
    }
}

/// Apply the fairness multipliers to candidates that start at equal weight.
pub fn compute_weights(candidates: &mut [Candidate<'_>]) {
    let games: Vec<f64> = candidates.iter().map(|c| c.games as f64).collect();
    let errors: Vec<f64> = candidates.iter().map(|c| c.errors as f64).collect();
    let games = Summary::of(&games);
    let errors = Summary::of(&errors);
    let error_ceiling = errors.mean + 2.0 * errors.std_dev();

    for candidate in candidates.iter_mut() {
        if games.mean > 1.0 {
            let factor = ((games.mean - candidate.games as f64) / games.mean) * 2.0 + 1.0;
            candidate.weight = (candidate.weight * factor).max(0.0);
        }

        if errors.mean > 1.0 && candidate.errors as f64 > error_ceiling {
            candidate.weight /= 2.0;
        }
    }
}

/// Pick the next team to schedule.
pub fn select_team<'a, R: Rng + ?Sized>(
    ranking: &RankingSnapshot,
    schedulable: &'a [TeamImages],
    pending: &[&str],
    rng: &mut R,
) -> Result<&'a TeamImages, SelectionError> {
    let selector = FairnessSelector::new(ranking, schedulable, pending)?;
    Ok(selector.choose(rng))
}

/// Pick an opponent uniformly from `pool`, never `primary_id` itself.
///
/// Opponents are not weighted; house bots are part of the pool.
pub fn select_opponent<'a, R: Rng + ?Sized>(
    primary_id: &str,
    pool: &'a [TeamImages],
    rng: &mut R,
) -> Option<&'a TeamImages> {
    let others: Vec<&TeamImages> = pool
        .iter()
        .filter(|t| t.team_id != primary_id && t.is_available())
        .collect();
    if others.is_empty() {
        return None;
    }
    Some(others[rng.gen_range(0..others.len())])
}

#[cfg(test)]
#[path = "autoplay_tests.rs"]
mod autoplay_tests;
