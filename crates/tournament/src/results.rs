//! Leaderboard reporting

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::standings::{RankingSnapshot, TeamStanding};

/// Standings sorted for display: most wins first, then best score, then id.
pub fn leaderboard(snapshot: &RankingSnapshot) -> Vec<&TeamStanding> {
    let mut entries: Vec<&TeamStanding> = snapshot.results.iter().collect();
    entries.sort_by(|a, b| {
        b.total_wins
            .cmp(&a.total_wins)
            .then_with(|| b.score().partial_cmp(&a.score()).unwrap_or(Ordering::Equal))
            .then_with(|| a.team_id.cmp(&b.team_id))
    });
    entries
}

/// Generate a text report of the current standings.
///
/// `names` maps team ids to display names; unknown ids are shown as-is.
pub fn generate_report(snapshot: &RankingSnapshot, names: &HashMap<String, String>) -> String {
    let mut report = String::new();
    report.push_str(&format!(
        "=== Leaderboard (last {} min) ===\n\n",
        snapshot.update_period / 60_000
    ));
    report.push_str(&format!(
        "{:<24} {:>6} {:>5} {:>5} {:>5} {:>7}\n",
        "Team", "Games", "W", "D", "L", "Score"
    ));
    report.push_str(&"-".repeat(57));
    report.push('\n');

    for entry in leaderboard(snapshot) {
        let name = names.get(&entry.team_id).unwrap_or(&entry.team_id);
        report.push_str(&format!(
            "{:<24} {:>6} {:>5} {:>5} {:>5} {:>6.1}%\n",
            name,
            entry.total_games,
            entry.total_wins,
            entry.total_draws,
            entry.total_losses,
            entry.score() * 100.0
        ));
    }

    report
}
