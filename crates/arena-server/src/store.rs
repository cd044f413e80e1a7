//! Persistent storage of finished games
//!
//! The server only relies on the [`GameStore`] trait. [`MemoryGameStore`]
//! keeps everything in process and backs standalone runs and tests.

use anyhow::Result;
use arena_core::GameRecord;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use uuid::Uuid;

/// Storage backend for game records.
///
/// Errors are passed through to callers without interpretation.
#[async_trait]
pub trait GameStore: Send + Sync {
    /// Fetch a single game.
    async fn get_by_id(&self, id: Uuid) -> Result<Option<GameRecord>>;

    /// Up to `limit` games starting at `offset`, newest end time first.
    async fn get_page(&self, limit: usize, offset: usize) -> Result<Vec<GameRecord>>;

    /// Persist a finished game.
    async fn insert(&self, record: &GameRecord) -> Result<()>;

    /// Number of stored games.
    async fn count_all(&self) -> Result<u64>;
}

/// In-process store.
#[derive(Debug, Default)]
pub struct MemoryGameStore {
    games: RwLock<HashMap<Uuid, GameRecord>>,
}

impl MemoryGameStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with existing games.
    pub fn with_games(games: impl IntoIterator<Item = GameRecord>) -> Self {
        let games = games.into_iter().map(|g| (g.id, g)).collect();
        Self {
            games: RwLock::new(games),
        }
    }
}

#[async_trait]
impl GameStore for MemoryGameStore {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<GameRecord>> {
        let games = self.games.read().unwrap_or_else(PoisonError::into_inner);
        Ok(games.get(&id).cloned())
    }

    async fn get_page(&self, limit: usize, offset: usize) -> Result<Vec<GameRecord>> {
        let games = self.games.read().unwrap_or_else(PoisonError::into_inner);
        let mut ordered: Vec<&GameRecord> = games.values().collect();
        ordered.sort_by(|a, b| b.end_time.cmp(&a.end_time).then_with(|| a.id.cmp(&b.id)));

        Ok(ordered
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn insert(&self, record: &GameRecord) -> Result<()> {
        let mut games = self.games.write().unwrap_or_else(PoisonError::into_inner);
        if games.contains_key(&record.id) {
            anyhow::bail!("game {} already stored", record.id);
        }
        games.insert(record.id, record.clone());
        Ok(())
    }

    async fn count_all(&self) -> Result<u64> {
        let games = self.games.read().unwrap_or_else(PoisonError::into_inner);
        Ok(games.len() as u64)
    }
}
