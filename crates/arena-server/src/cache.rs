//! Bounded in-memory cache of finished games
//!
//! Two views over the same records:
//! - an id map for point lookups, capped at `map_capacity`
//! - a list ordered newest first (by end time), capped at `list_capacity`
//!
//! The list only answers page requests for a contiguous prefix it actually
//! holds; anything else is a miss and the caller goes to the store.

use arena_core::GameRecord;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

/// Default number of records kept in the ordered list
pub const LIST_CACHE_SIZE: usize = 1000;
/// Default number of records kept in the id map
pub const GAME_CACHE_SIZE: usize = 200;

#[derive(Debug, Default)]
struct CacheInner {
    mapping: HashMap<Uuid, Arc<GameRecord>>,
    list: Vec<Arc<GameRecord>>,
}

/// Thread-safe result cache.
#[derive(Debug)]
pub struct ResultCache {
    inner: RwLock<CacheInner>,
    list_capacity: usize,
    map_capacity: usize,
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(LIST_CACHE_SIZE, GAME_CACHE_SIZE)
    }
}

impl ResultCache {
    pub fn new(list_capacity: usize, map_capacity: usize) -> Self {
        Self {
            inner: RwLock::new(CacheInner::default()),
            list_capacity,
            map_capacity,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, CacheInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CacheInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn list_capacity(&self) -> usize {
        self.list_capacity
    }

    /// Insert or replace a record and keep the list ordered by end time.
    ///
    /// The list may hold a record the map no longer (or never) indexed, so
    /// the old list entry is dropped regardless of the map.
    pub fn add_record(&self, record: GameRecord) {
        let record = Arc::new(record);
        let mut inner = self.write();

        inner.mapping.insert(record.id, Arc::clone(&record));
        inner.list.retain(|r| r.id != record.id);
        inner.list.push(record);
        inner.list.sort_by(|a, b| b.end_time.cmp(&a.end_time));
    }

    pub fn get_by_id(&self, id: &Uuid) -> Option<Arc<GameRecord>> {
        self.read().mapping.get(id).cloned()
    }

    /// Page `page` of size `limit`, newest first.
    ///
    /// Returns `None` unless the cached list covers the whole page.
    pub fn get_page(&self, limit: usize, page: usize) -> Option<Vec<Arc<GameRecord>>> {
        let start = limit.checked_mul(page)?;
        let end = start.checked_add(limit)?;
        let inner = self.read();
        if inner.list.len() < end {
            return None;
        }
        Some(inner.list[start..end].to_vec())
    }

    /// Backfill the list with records fetched from the store at `offset`.
    ///
    /// Ignored when the list is already full, when the records would leave a
    /// gap, or when they would not extend coverage. Anything past the list
    /// capacity is dropped by the next [`cleanup`](Self::cleanup).
    /// Returns whether the records were accepted.
    pub fn add_page(&self, records: Vec<GameRecord>, offset: usize) -> bool {
        let mut inner = self.write();
        let len = inner.list.len();
        let end = offset.saturating_add(records.len());

        if len >= self.list_capacity || offset > len || end <= len {
            return false;
        }

        inner.list.truncate(offset);
        inner.list.extend(records.into_iter().map(Arc::new));
        true
    }

    /// Every cached record that ended strictly after `since`.
    pub fn get_since(&self, since: DateTime<Utc>) -> Vec<Arc<GameRecord>> {
        self.read()
            .list
            .iter()
            .filter(|r| r.end_time > since)
            .cloned()
            .collect()
    }

    /// Enforce both capacities.
    ///
    /// The list is cut back to its capacity. Once the map reaches its
    /// capacity, the oldest listed records are evicted until the map is down
    /// to half of it.
    pub fn cleanup(&self) {
        let mut inner = self.write();
        let CacheInner { mapping, list } = &mut *inner;

        if list.len() > self.list_capacity {
            list.truncate(self.list_capacity);
        }

        if mapping.len() < self.map_capacity {
            return;
        }

        let target = self.map_capacity / 2;
        for record in list.iter().rev() {
            if mapping.len() <= target {
                break;
            }
            mapping.remove(&record.id);
        }

        tracing::debug!(
            list = list.len(),
            mapping = mapping.len(),
            "result cache trimmed"
        );
    }

    /// Number of records in the ordered list.
    pub fn len(&self) -> usize {
        self.read().list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of records reachable by id.
    pub fn map_len(&self) -> usize {
        self.read().mapping.len()
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod cache_tests;
