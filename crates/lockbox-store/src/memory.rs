//! In-memory implementations of the store traits.
//!
//! Same semantics as SQLite, no persistence. [`MemoryLogStore`] serializes
//! mutations behind one lock; [`MemoryReplayCache`] is a moka cache with
//! per-entry expiry.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use moka::future::Cache;
use parking_lot::Mutex;

use lockbox_core::{Clock, Direction, Entry, Index, SystemClock};

use crate::context::Context;
use crate::error::{Result, StoreError};
use crate::traits::{LogStore, RangeQuery, ReplayCache};

/// In-memory ordered log store.
///
/// All data is lost when the store is dropped.
pub struct MemoryLogStore {
    inner: Mutex<HashMap<String, PathLog>>,
    clock: Arc<dyn Clock>,
}

#[derive(Default)]
struct PathLog {
    entries: BTreeMap<Index, Entry>,
    /// Last index ever assigned on this path.
    high_water: Index,
}

impl PathLog {
    fn push(&mut self, path: &str, data: Bytes, timestamp: i64) -> Index {
        self.high_water += 1;
        let index = self.high_water;
        self.entries.insert(
            index,
            Entry {
                path: path.to_string(),
                index,
                timestamp,
                data,
            },
        );
        index
    }
}

impl MemoryLogStore {
    /// Create a new empty store on the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a store that stamps entries with `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            clock,
        }
    }
}

impl Default for MemoryLogStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LogStore for MemoryLogStore {
    async fn append(&self, ctx: &Context, path: &str, data: Bytes) -> Result<Index> {
        let mut inner = self.inner.lock();
        ctx.check()?;

        let now = self.clock.now_millis();
        let index = inner.entry(path.to_string()).or_default().push(path, data, now);
        Ok(index)
    }

    async fn replace_all(&self, ctx: &Context, path: &str, data: Vec<Bytes>) -> Result<()> {
        let mut inner = self.inner.lock();
        ctx.check()?;

        let log = inner.entry(path.to_string()).or_default();
        log.entries.clear();
        for item in data {
            let now = self.clock.now_millis();
            log.push(path, item, now);
        }
        Ok(())
    }

    async fn delete(&self, ctx: &Context, path: &str) -> Result<()> {
        let mut inner = self.inner.lock();
        ctx.check()?;

        if let Some(log) = inner.get_mut(path) {
            log.entries.clear();
        }
        Ok(())
    }

    async fn range(&self, ctx: &Context, path: &str, query: RangeQuery) -> Result<Vec<Entry>> {
        let inner = self.inner.lock();
        ctx.check()?;

        let Some(log) = inner.get(path) else {
            return Ok(Vec::new());
        };

        let admitted = log.entries.values().filter(|e| query.admits(e.index));
        let entries = match query.direction {
            Direction::Ascending => admitted.take(query.limit).cloned().collect(),
            Direction::Descending => admitted.rev().take(query.limit).cloned().collect(),
        };
        Ok(entries)
    }

    async fn exists(&self, ctx: &Context, path: &str) -> Result<bool> {
        let inner = self.inner.lock();
        ctx.check()?;

        Ok(inner.get(path).is_some_and(|log| !log.entries.is_empty()))
    }
}

/// A cached value and the instant it stops being live.
#[derive(Clone)]
struct Slot {
    value: String,
    expires_at: Option<Instant>,
}

/// Per-entry expiry read from the slot itself.
struct SlotExpiry;

impl moka::Expiry<String, Slot> for SlotExpiry {
    fn expire_after_create(&self, _key: &String, slot: &Slot, created_at: Instant) -> Option<Duration> {
        slot.expires_at.map(|at| at.saturating_duration_since(created_at))
    }

    fn expire_after_update(
        &self,
        _key: &String,
        slot: &Slot,
        updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        slot.expires_at.map(|at| at.saturating_duration_since(updated_at))
    }
}

/// In-memory replay cache backed by a [`moka::future::Cache`].
///
/// Keys leave only when their own TTL ends; nothing is evicted for space.
/// With a [`limit`](Self::with_limit), a full cache refuses new keys with
/// [`StoreError::Full`] instead of dropping live ones.
pub struct MemoryReplayCache {
    slots: Cache<String, Slot>,
    limit: Option<u64>,
}

impl MemoryReplayCache {
    /// Unbounded cache.
    pub fn new() -> Self {
        Self {
            slots: Cache::builder().expire_after(SlotExpiry).build(),
            limit: None,
        }
    }

    /// Cache that fails closed once it tracks `limit` live keys.
    pub fn with_limit(limit: u64) -> Self {
        Self {
            limit: Some(limit),
            ..Self::new()
        }
    }

    /// Flush moka's pending maintenance, so expired keys are dropped now.
    pub async fn run_pending_tasks(&self) {
        self.slots.run_pending_tasks().await;
    }

    fn is_full(&self) -> bool {
        self.limit.is_some_and(|limit| self.slots.entry_count() >= limit)
    }

    async fn admit(&self, key: &str) -> Result<()> {
        if self.is_full() {
            self.slots.run_pending_tasks().await;
            if self.is_full() && !self.slots.contains_key(key) {
                return Err(StoreError::Full);
            }
        }
        Ok(())
    }
}

impl Default for MemoryReplayCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReplayCache for MemoryReplayCache {
    async fn get(&self, ctx: &Context, key: &str) -> Result<Option<String>> {
        ctx.check()?;
        Ok(self.slots.get(key).await.map(|slot| slot.value))
    }

    async fn set(&self, ctx: &Context, key: &str, value: &str) -> Result<()> {
        ctx.check()?;
        self.admit(key).await?;
        let slot = Slot {
            value: value.to_string(),
            expires_at: None,
        };
        self.slots.insert(key.to_string(), slot).await;
        Ok(())
    }

    async fn expire(&self, ctx: &Context, key: &str, ttl: Duration) -> Result<()> {
        ctx.check()?;
        if let Some(mut slot) = self.slots.get(key).await {
            slot.expires_at = Some(Instant::now() + ttl);
            self.slots.insert(key.to_string(), slot).await;
        }
        Ok(())
    }

    async fn set_if_absent(
        &self,
        ctx: &Context,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool> {
        ctx.check()?;
        self.admit(key).await?;
        let slot = Slot {
            value: value.to_string(),
            expires_at: Some(Instant::now() + ttl),
        };
        let entry = self.slots.entry(key.to_string()).or_insert(slot).await;
        Ok(entry.is_fresh())
    }
}
