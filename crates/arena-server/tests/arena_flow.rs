//! End-to-end flows through the arena facade

use arena_core::{
    ErrorKind, GameResult, ImageRef, ManualClock, ScheduleError, SettingsUpdate, TeamInfo,
};
use arena_server::{Arena, ArenaError, MemoryGameStore, ServerConfig, StaticRoster};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::Arc;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 17, 10, 0, 0).unwrap()
}

fn roster() -> StaticRoster {
    let entry = |id: &str, name: &str, is_bot: bool| TeamInfo {
        id: id.to_string(),
        name: name.to_string(),
        is_bot,
    };
    StaticRoster::default()
        .with_team(entry("castors", "Les Castors", false), vec![ImageRef::new("latest", "reg/castors:latest")])
        .with_team(entry("hiboux", "Les Hiboux", false), vec![ImageRef::new("latest", "reg/hiboux:latest")])
        .with_team(entry("renards", "Les Renards", false), vec![ImageRef::new("latest", "reg/renards:latest")])
        .with_team(entry("random", "Random bot", true), vec![ImageRef::new("latest", "reg/bots/random:latest")])
}

async fn arena() -> (Arena, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(t0()));
    let arena = Arena::new(
        &ServerConfig::default(),
        Arc::new(MemoryGameStore::new()),
        Arc::new(roster()),
        clock.clone(),
    );
    arena.start().await.unwrap();
    (arena, clock)
}

#[tokio::test]
async fn test_runner_round_trip() {
    let (arena, clock) = arena().await;
    arena.force_enqueue("castors", "random").await.unwrap();

    let assignment = arena.pop_matches(4).await;
    assert_eq!(assignment.max_matches_per_runner, 1);
    assert_eq!(assignment.match_timeout_secs, 300);
    assert_eq!(assignment.matches.len(), 1);
    let m = &assignment.matches[0];
    assert_eq!(m.image_team1, "reg/castors:latest");

    let ongoing = arena.list_ongoing().await;
    assert_eq!(ongoing.len(), 1);
    assert_eq!(ongoing[0].start_time, t0());

    clock.advance(Duration::seconds(75));
    let log = STANDARD.encode(b"1. e4 e5 2. Nf3 Nc6");
    let result = GameResult {
        game_data: Some(log),
        team1_score: 1.0,
        ..GameResult::won_by(m.id, "castors")
    };
    arena.submit_result(&result).await.unwrap();
    assert!(matches!(
        arena.submit_result(&result).await,
        Err(ArenaError::UnknownMatch(_))
    ));

    let stored = arena.get_game(m.id).await.unwrap().unwrap();
    assert_eq!(stored.end_time, t0() + Duration::seconds(75));
    assert_eq!(stored.start_time, t0());
    assert!(stored.game_data.is_some());

    let page = arena.list_games(10, 0).await.unwrap();
    assert_eq!(page.total_game_count, 1);
    assert_eq!(page.results.len(), 1);

    arena.ranking().recompute().await.unwrap();
    let stats = arena.stats();
    assert_eq!(stats.total_games, 1);
    assert_eq!(stats.ranking.get("castors").unwrap().total_wins, 1);
    assert_eq!(stats.ranking.get("random").unwrap().total_losses, 1);

    let board = arena.leaderboard().await.unwrap();
    assert!(board.contains("Les Castors"));
}

#[tokio::test]
async fn test_force_enqueue_errors_surface() {
    let (arena, _) = arena().await;

    let err = arena.force_enqueue("castors", "castors").await.unwrap_err();
    assert!(matches!(err, ArenaError::Schedule(ScheduleError::SameTeam)));
    assert_eq!(err.to_string(), "Teams must be different");

    let err = arena.force_enqueue("castors", "loups").await.unwrap_err();
    assert_eq!(err.to_string(), "Team not found: loups");
    assert!(arena.pop_matches(10).await.matches.is_empty());
}

#[tokio::test]
async fn test_timed_out_match_is_recorded_as_error() {
    let (arena, clock) = arena().await;
    arena.force_enqueue("hiboux", "renards").await.unwrap();
    let m = arena.pop_matches(1).await.matches.remove(0);

    clock.advance(Duration::minutes(5) + Duration::seconds(31));
    assert_eq!(arena.scheduler().sweep_timeouts().await.swept, 1);
    assert!(arena.list_ongoing().await.is_empty());

    let record = arena.get_game(m.id).await.unwrap().unwrap();
    assert!(record.is_error);
    assert_eq!(record.error_payload().unwrap().unwrap().kind, ErrorKind::Timeout);

    arena.ranking().recompute().await.unwrap();
    let ranking = arena.stats().ranking;
    let hiboux = ranking.get("hiboux").unwrap();
    assert_eq!((hiboux.total_games, hiboux.total_wins, hiboux.total_draws), (1, 0, 0));
    assert_eq!(hiboux.total_errors(), 1);
}

#[tokio::test]
async fn test_concurrency_limit_follows_settings() {
    let (arena, _) = arena().await;
    for (a, b) in [("castors", "hiboux"), ("hiboux", "renards"), ("renards", "castors")] {
        arena.force_enqueue(a, b).await.unwrap();
    }

    arena
        .update_settings(&SettingsUpdate {
            max_concurrent_matches: Some(1),
            max_matches_per_runner: Some(2),
            ..Default::default()
        })
        .unwrap();

    let first = arena.pop_matches(3).await;
    assert_eq!(first.matches.len(), 1);
    assert_eq!(first.max_matches_per_runner, 2);
    assert!(arena.pop_matches(3).await.matches.is_empty());

    arena
        .submit_result(&GameResult::draw(first.matches[0].id))
        .await
        .unwrap();
    assert_eq!(arena.pop_matches(3).await.matches.len(), 1);
}

#[tokio::test]
async fn test_invalid_settings_update_is_rejected_whole() {
    let (arena, _) = arena().await;
    let before = arena.settings();

    let err = arena.update_settings(&SettingsUpdate {
        ranking_period_secs: Some(60),
        max_matches_per_runner: Some(0),
        ..Default::default()
    });
    assert!(matches!(err, Err(ArenaError::Settings(_))));
    assert_eq!(arena.settings(), before);
}

#[tokio::test]
async fn test_reset_abandons_ongoing_matches() {
    let (arena, _) = arena().await;
    arena.force_enqueue("castors", "hiboux").await.unwrap();
    let m = arena.pop_matches(1).await.matches.remove(0);

    arena.reset().await;

    assert!(arena.list_ongoing().await.is_empty());
    assert!(arena.submit_result(&GameResult::draw(m.id)).await.is_err());
    assert_eq!(arena.stats().total_games, 0);
}

#[tokio::test]
async fn test_launch_data_and_expiry() {
    let (arena, clock) = arena().await;

    let data = arena.launch_data().await.unwrap();
    assert_eq!(data.team_id_mapping["renards"], "Les Renards");
    assert_eq!(data.team_id_mapping.len(), 4);

    let end = arena.settings().end_time;
    clock.set(end);
    assert!(!arena.is_expired());
    clock.set(end + Duration::seconds(1));
    assert!(arena.is_expired());
}

#[tokio::test]
async fn test_warm_up_serves_existing_games() {
    let clock = Arc::new(ManualClock::new(t0()));
    let first = Arena::new(
        &ServerConfig::default(),
        Arc::new(MemoryGameStore::new()),
        Arc::new(roster()),
        clock.clone(),
    );
    first.force_enqueue("castors", "hiboux").await.unwrap();
    let m = first.pop_matches(1).await.matches.remove(0);
    first
        .submit_result(&GameResult::won_by(m.id, "hiboux"))
        .await
        .unwrap();
    let record = first.get_game(m.id).await.unwrap().unwrap();

    // a restarted arena over the same stored games
    let store = MemoryGameStore::with_games([record.as_ref().clone()]);
    let second = Arena::new(&ServerConfig::default(), Arc::new(store), Arc::new(roster()), clock);
    second.start().await.unwrap();

    assert_eq!(second.stats().total_games, 1);
    assert_eq!(second.cache().len(), 1);
    assert_eq!(second.stats().ranking.get("hiboux").unwrap().total_wins, 1);
}

#[tokio::test]
async fn test_views_serialize_in_camel_case() {
    let (arena, _) = arena().await;
    arena.force_enqueue("castors", "hiboux").await.unwrap();
    arena.pop_matches(1).await;

    let ongoing = serde_json::to_value(arena.list_ongoing().await).unwrap();
    assert_eq!(ongoing[0]["team1Id"], "castors");
    assert!(ongoing[0].get("startTime").is_some());

    let page = serde_json::to_value(arena.list_games(10, 0).await.unwrap()).unwrap();
    assert_eq!(page["totalGameCount"], 0);

    let launch = serde_json::to_value(arena.launch_data().await.unwrap()).unwrap();
    assert_eq!(launch["teamIdMapping"]["hiboux"], "Les Hiboux");
}
