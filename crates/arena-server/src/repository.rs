//! Read-through access to finished games
//!
//! Reads are served from the [`ResultCache`] when it covers the request and
//! fall back to the [`GameStore`] otherwise. Writes go to the store first and
//! only reach the cache once they are persisted.

use anyhow::{Context, Result};
use arena_core::GameRecord;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use crate::cache::ResultCache;
use crate::store::GameStore;

pub struct GameRepository {
    store: Arc<dyn GameStore>,
    cache: Arc<ResultCache>,
    total_games: AtomicU64,
}

impl GameRepository {
    pub fn new(store: Arc<dyn GameStore>, cache: Arc<ResultCache>) -> Self {
        Self {
            store,
            cache,
            total_games: AtomicU64::new(0),
        }
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    /// Load the newest games into the cache and initialise the game count.
    ///
    /// The cache is trimmed to its capacities before returning.
    ///
    /// Returns the number of games loaded.
    pub async fn warm_up(&self) -> Result<usize> {
        let total = self
            .store
            .count_all()
            .await
            .context("failed to count stored games")?;
        self.total_games.store(total, Ordering::Relaxed);

        let recent = self
            .store
            .get_page(self.cache.list_capacity(), 0)
            .await
            .context("failed to load recent games")?;
        let loaded = recent.len();
        for record in recent {
            self.cache.add_record(record);
        }
        self.cache.cleanup();

        tracing::info!(loaded, total, "game cache warmed up");
        Ok(loaded)
    }

    pub async fn get_game(&self, id: Uuid) -> Result<Option<Arc<GameRecord>>> {
        if let Some(record) = self.cache.get_by_id(&id) {
            return Ok(Some(record));
        }

        let Some(record) = self.store.get_by_id(id).await? else {
            return Ok(None);
        };

        let found = Arc::new(record.clone());
        self.cache.add_record(record);
        Ok(Some(found))
    }

    /// Page `page` of `limit` games, newest first.
    pub async fn list_games(&self, limit: usize, page: usize) -> Result<Vec<Arc<GameRecord>>> {
        if let Some(hit) = self.cache.get_page(limit, page) {
            return Ok(hit);
        }

        let offset = limit.saturating_mul(page);
        let records = self.store.get_page(limit, offset).await?;
        let page_records: Vec<Arc<GameRecord>> = records.iter().cloned().map(Arc::new).collect();
        self.cache.add_page(records, offset);

        tracing::trace!(limit, page, fetched = page_records.len(), "game list served from store");
        Ok(page_records)
    }

    /// Persist a finished game, then make it visible through the cache.
    ///
    /// A store failure leaves the cache untouched.
    pub async fn add_game(&self, record: GameRecord) -> Result<()> {
        self.store.insert(&record).await?;
        self.cache.add_record(record);
        self.total_games.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    pub fn total_games(&self) -> u64 {
        self.total_games.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
#[path = "repository_tests.rs"]
mod repository_tests;
