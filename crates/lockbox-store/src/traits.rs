//! Capability traits for the storage collaborators.
//!
//! The sync engines depend on [`LogStore`] and the verifier depends on
//! [`ReplayCache`]; neither knows which backend it is talking to.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use lockbox_core::{Direction, Entry, Index};

use crate::context::Context;
use crate::error::Result;

/// A directional range over one log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeQuery {
    /// Exclusive bound: entries after it when ascending, before it when
    /// descending. `None` starts from the beginning or the end.
    pub from: Option<Index>,
    /// Maximum number of entries to return.
    pub limit: usize,
    pub direction: Direction,
}

impl RangeQuery {
    /// Ascending from the start.
    pub fn all(limit: usize) -> Self {
        Self {
            from: None,
            limit,
            direction: Direction::Ascending,
        }
    }

    /// The newest entry only.
    pub fn last() -> Self {
        Self {
            from: None,
            limit: 1,
            direction: Direction::Descending,
        }
    }

    /// Whether an index falls strictly inside this range's bound.
    pub fn admits(&self, index: Index) -> bool {
        match (self.from, self.direction) {
            (None, _) => true,
            (Some(from), Direction::Ascending) => index > from,
            (Some(from), Direction::Descending) => index < from,
        }
    }
}

/// Per-path append-only ordered log.
///
/// # Design Notes
///
/// - **Monotonic indices**: the first entry of a path gets index 1 and
///   every later entry a strictly larger one. Concurrent appends to the
///   same path never share an index.
/// - **High-water mark**: `replace_all` and `delete` remove entries but not
///   the path's last assigned index, so indices are never reused.
#[async_trait]
pub trait LogStore: Send + Sync {
    /// Append one entry, returning its index.
    async fn append(&self, ctx: &Context, path: &str, data: Bytes) -> Result<Index>;

    /// Atomically drop every entry of `path` and append `data` in order.
    async fn replace_all(&self, ctx: &Context, path: &str, data: Vec<Bytes>) -> Result<()>;

    /// Drop every entry of `path`.
    async fn delete(&self, ctx: &Context, path: &str) -> Result<()>;

    /// Read entries in the query's direction, at most `limit` of them.
    async fn range(&self, ctx: &Context, path: &str, query: RangeQuery) -> Result<Vec<Entry>>;

    /// True iff `path` has at least one live entry.
    async fn exists(&self, ctx: &Context, path: &str) -> Result<bool>;
}

/// Expiring key-value store recording consumed nonces.
#[async_trait]
pub trait ReplayCache: Send + Sync {
    /// Value of a live key.
    async fn get(&self, ctx: &Context, key: &str) -> Result<Option<String>>;

    /// Set a key with no expiry, replacing any previous value.
    async fn set(&self, ctx: &Context, key: &str, value: &str) -> Result<()>;

    /// Give an existing key a lifetime of `ttl` from now. No-op if absent.
    async fn expire(&self, ctx: &Context, key: &str, ttl: Duration) -> Result<()>;

    /// Set `key` with a lifetime of `ttl` unless a live value already exists.
    ///
    /// Returns `true` if this call wrote the key. Atomic: of any number of
    /// concurrent callers for the same absent key, exactly one gets `true`.
    async fn set_if_absent(
        &self,
        ctx: &Context,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool>;
}
