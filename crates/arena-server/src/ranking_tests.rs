use super::*;
use crate::repository::GameRepository;
use crate::roster::StaticRoster;
use crate::store::MemoryGameStore;
use arena_core::{GameRecord, ImageRef, ManualClock, Settings, TeamImages, TeamInfo};
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 17, 11, 0, 0).unwrap()
}

fn game(team1: &str, team2: &str, winner: Option<&str>, minutes_ago: i64) -> GameRecord {
    let end = now() - Duration::minutes(minutes_ago);
    GameRecord {
        id: Uuid::new_v4(),
        start_time: end,
        end_time: end,
        team1_id: team1.to_string(),
        team2_id: team2.to_string(),
        winner_id: winner.map(str::to_string),
        is_error: false,
        team1_score: 0.0,
        team2_score: 0.0,
        error_data: None,
        game_data: None,
    }
}

fn roster() -> StaticRoster {
    ["a", "b"].into_iter().fold(StaticRoster::default(), |roster, id| {
        roster.with_team(
            TeamInfo {
                id: id.to_string(),
                name: id.to_uppercase(),
                is_bot: false,
            },
            vec![ImageRef::new("latest", id)],
        )
    })
}

/// Roster that can be switched into a failing state.
#[derive(Default)]
struct FlakyRoster {
    inner: StaticRoster,
    failing: AtomicBool,
}

#[async_trait]
impl Roster for FlakyRoster {
    async fn teams(&self) -> anyhow::Result<Vec<TeamInfo>> {
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("registry unavailable");
        }
        self.inner.teams().await
    }

    async fn list_images(&self, team_ids: &[String]) -> anyhow::Result<Vec<TeamImages>> {
        self.inner.list_images(team_ids).await
    }
}

#[tokio::test]
async fn test_recompute_counts_only_the_window() {
    let cache = Arc::new(ResultCache::default());
    cache.add_record(game("a", "b", Some("a"), 5));
    cache.add_record(game("a", "b", None, 29));
    cache.add_record(game("a", "b", Some("b"), 31));

    let aggregator = RankingAggregator::new(
        Arc::clone(&cache),
        Arc::new(roster()),
        Arc::new(SettingsHandle::new(Settings::default())),
        Arc::new(ManualClock::new(now())),
    );
    assert!(aggregator.snapshot().is_empty());

    let snapshot = aggregator.recompute().await.unwrap();
    assert_eq!(snapshot.update_period, 30 * 60 * 1000);

    let a = snapshot.get("a").unwrap();
    assert_eq!((a.total_games, a.total_wins, a.total_draws, a.total_losses), (2, 1, 1, 0));
    let b = snapshot.get("b").unwrap();
    assert_eq!(b.total_losses, 1);

    assert_eq!(*aggregator.snapshot(), *snapshot);
}

#[tokio::test]
async fn test_failed_recompute_keeps_previous_snapshot() {
    let cache = Arc::new(ResultCache::default());
    cache.add_record(game("a", "b", Some("a"), 1));
    let roster = Arc::new(FlakyRoster {
        inner: roster(),
        ..Default::default()
    });

    let aggregator = RankingAggregator::new(
        Arc::clone(&cache),
        roster.clone(),
        Arc::new(SettingsHandle::default()),
        Arc::new(ManualClock::new(now())),
    );
    let first = aggregator.recompute().await.unwrap();

    roster.failing.store(true, Ordering::SeqCst);
    cache.add_record(game("a", "b", Some("b"), 0));
    assert!(aggregator.recompute().await.is_err());

    assert!(Arc::ptr_eq(&aggregator.snapshot(), &first));
    assert_eq!(aggregator.snapshot().get("a").unwrap().total_games, 1);
}

#[tokio::test]
async fn test_window_follows_ranking_period_setting() {
    let cache = Arc::new(ResultCache::default());
    cache.add_record(game("a", "b", Some("a"), 5));
    cache.add_record(game("a", "b", Some("a"), 15));

    let settings = Arc::new(SettingsHandle::default());
    settings
        .update(&arena_core::SettingsUpdate {
            ranking_period_secs: Some(10 * 60),
            ..Default::default()
        })
        .unwrap();

    let aggregator = RankingAggregator::new(
        cache,
        Arc::new(roster()),
        settings,
        Arc::new(ManualClock::new(now())),
    );
    let snapshot = aggregator.recompute().await.unwrap();
    assert_eq!(snapshot.get("a").unwrap().total_wins, 1);
    assert_eq!(snapshot.update_period, 600_000);
}

#[tokio::test]
async fn test_reading_an_evicted_game_does_not_double_count_it() {
    let games: Vec<GameRecord> = (5..9).map(|m| game("a", "b", Some("a"), m)).collect();
    let oldest = games[3].id;
    let cache = Arc::new(ResultCache::new(100, 2));
    let repository = GameRepository::new(
        Arc::new(MemoryGameStore::with_games(games)),
        Arc::clone(&cache),
    );
    repository.warm_up().await.unwrap();
    assert!(cache.get_by_id(&oldest).is_none());

    assert!(repository.get_game(oldest).await.unwrap().is_some());
    assert_eq!(cache.len(), 4);

    let aggregator = RankingAggregator::new(
        cache,
        Arc::new(roster()),
        Arc::new(SettingsHandle::default()),
        Arc::new(ManualClock::new(now())),
    );
    let snapshot = aggregator.recompute().await.unwrap();
    assert_eq!(snapshot.get("a").unwrap().total_games, 4);
    assert_eq!(snapshot.get("b").unwrap().total_losses, 4);
}
