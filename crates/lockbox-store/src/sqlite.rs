//! SQLite backend for both the log store and the replay cache.
//!
//! One connection behind a mutex; every call hops onto the blocking pool.
//! Every mutation runs in its own transaction and re-checks the caller's
//! [`Context`] just before commit, so a call that reports `Canceled` has
//! written nothing.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use rusqlite::{params, Connection, OptionalExtension};

use lockbox_core::{Clock, Direction, Entry, Index, SystemClock};

use crate::context::Context;
use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{LogStore, RangeQuery, ReplayCache};

/// [`LogStore`] and [`ReplayCache`] over a single SQLite database.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    clock: Arc<dyn Clock>,
}

impl SqliteStore {
    /// Open (or create) the database file and bring its schema up to date.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self::from_connection(conn))
    }

    /// Private in-memory database.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            clock: Arc::new(SystemClock),
        }
    }

    /// Stamp entries and evaluate expiry with `clock` instead of system time.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Delete replay keys whose lifetime has ended. Returns how many went.
    pub async fn purge_expired(&self, ctx: &Context) -> Result<usize> {
        self.blocking(ctx, |conn, _ctx, clock| {
            let removed = conn.execute(
                "DELETE FROM replay_cache WHERE expires_at IS NOT NULL AND expires_at <= ?1",
                params![clock.now_millis()],
            )?;
            Ok(removed)
        })
        .await
    }

    /// Run `f` on the connection inside `spawn_blocking`.
    async fn blocking<F, T>(&self, ctx: &Context, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection, &Context, &dyn Clock) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        ctx.check()?;
        let conn = Arc::clone(&self.conn);
        let clock = Arc::clone(&self.clock);
        let ctx = ctx.clone();

        tokio::task::spawn_blocking(move || {
            let mut conn = lock(&conn)?;
            f(&mut conn, &ctx, clock.as_ref())
        })
        .await
        .map_err(|e| {
            StoreError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
                Some(format!("spawn_blocking failed: {}", e)),
            ))
        })?
    }
    /// Like [`blocking`](Self::blocking), but stops waiting once `ctx` is done.
    async fn read<F, T>(&self, ctx: &Context, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection, &Context, &dyn Clock) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        ctx.run(self.blocking(ctx, f)).await
    }
}

fn lock(conn: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>> {
    conn.lock().map_err(|e| {
        StoreError::Database(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
            Some(format!("mutex poisoned: {}", e)),
        ))
    })
}

/// Bump the path's high-water mark and insert one entry at it.
fn insert_entry(conn: &Connection, path: &str, data: &[u8], timestamp: i64) -> Result<Index> {
    let index: Index = conn.query_row(
        "INSERT INTO log_heads (path, high_water) VALUES (?1, 1)
         ON CONFLICT(path) DO UPDATE SET high_water = high_water + 1
         RETURNING high_water",
        params![path],
        |row| row.get(0),
    )?;

    conn.execute(
        "INSERT INTO entries (path, idx, ts, data) VALUES (?1, ?2, ?3, ?4)",
        params![path, index, timestamp, data],
    )?;

    Ok(index)
}

fn row_to_entry(path: &str, row: &rusqlite::Row<'_>) -> rusqlite::Result<Entry> {
    let data: Vec<u8> = row.get("data")?;
    Ok(Entry {
        path: path.to_string(),
        index: row.get("idx")?,
        timestamp: row.get("ts")?,
        data: Bytes::from(data),
    })
}

fn ttl_millis(ttl: Duration) -> i64 {
    i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX)
}

#[async_trait]
impl LogStore for SqliteStore {
    async fn append(&self, ctx: &Context, path: &str, data: Bytes) -> Result<Index> {
        let path = path.to_string();
        self.blocking(ctx, move |conn, ctx, clock| {
            let tx = conn.transaction()?;
            let index = insert_entry(&tx, &path, &data, clock.now_millis())?;
            ctx.check()?;
            tx.commit()?;
            Ok(index)
        })
        .await
    }

    async fn replace_all(&self, ctx: &Context, path: &str, data: Vec<Bytes>) -> Result<()> {
        let path = path.to_string();
        self.blocking(ctx, move |conn, ctx, clock| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM entries WHERE path = ?1", params![path])?;
            for item in &data {
                insert_entry(&tx, &path, item, clock.now_millis())?;
            }
            ctx.check()?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn delete(&self, ctx: &Context, path: &str) -> Result<()> {
        let path = path.to_string();
        self.blocking(ctx, move |conn, ctx, _clock| {
            let tx = conn.transaction()?;
            let removed = tx.execute("DELETE FROM entries WHERE path = ?1", params![path])?;
            ctx.check()?;
            tx.commit()?;
            tracing::debug!(path = %path, removed, "deleted log");
            Ok(())
        })
        .await
    }

    async fn range(&self, ctx: &Context, path: &str, query: RangeQuery) -> Result<Vec<Entry>> {
        let path = path.to_string();
        self.read(ctx, move |conn, _ctx, _clock| {
            let limit = i64::try_from(query.limit).unwrap_or(i64::MAX);
            let sql = match query.direction {
                Direction::Ascending => {
                    "SELECT idx, ts, data FROM entries
                     WHERE path = ?1 AND idx > ?2 ORDER BY idx ASC LIMIT ?3"
                }
                Direction::Descending => {
                    "SELECT idx, ts, data FROM entries
                     WHERE path = ?1 AND idx < ?2 ORDER BY idx DESC LIMIT ?3"
                }
            };
            let bound = match (query.from, query.direction) {
                (Some(from), _) => from,
                (None, Direction::Ascending) => 0,
                (None, Direction::Descending) => i64::MAX,
            };

            let mut stmt = conn.prepare_cached(sql)?;
            let entries = stmt
                .query_map(params![path, bound, limit], |row| row_to_entry(&path, row))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(entries)
        })
        .await
    }

    async fn exists(&self, ctx: &Context, path: &str) -> Result<bool> {
        let path = path.to_string();
        self.read(ctx, move |conn, _ctx, _clock| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM entries WHERE path = ?1)",
                params![path],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
        .await
    }
}

#[async_trait]
impl ReplayCache for SqliteStore {
    async fn get(&self, ctx: &Context, key: &str) -> Result<Option<String>> {
        let key = key.to_string();
        self.read(ctx, move |conn, _ctx, clock| {
            conn.query_row(
                "SELECT value FROM replay_cache
                 WHERE key = ?1 AND (expires_at IS NULL OR expires_at > ?2)",
                params![key, clock.now_millis()],
                |row| row.get(0),
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn set(&self, ctx: &Context, key: &str, value: &str) -> Result<()> {
        let key = key.to_string();
        let value = value.to_string();
        self.blocking(ctx, move |conn, ctx, _clock| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO replay_cache (key, value, expires_at) VALUES (?1, ?2, NULL)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, expires_at = NULL",
                params![key, value],
            )?;
            ctx.check()?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn expire(&self, ctx: &Context, key: &str, ttl: Duration) -> Result<()> {
        let key = key.to_string();
        self.blocking(ctx, move |conn, ctx, clock| {
            let now = clock.now_millis();
            let tx = conn.transaction()?;
            tx.execute(
                "UPDATE replay_cache SET expires_at = ?2
                 WHERE key = ?1 AND (expires_at IS NULL OR expires_at > ?3)",
                params![key, now.saturating_add(ttl_millis(ttl)), now],
            )?;
            ctx.check()?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn set_if_absent(
        &self,
        ctx: &Context,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool> {
        let key = key.to_string();
        let value = value.to_string();
        self.blocking(ctx, move |conn, ctx, clock| {
            let now = clock.now_millis();
            let tx = conn.transaction()?;
            // An expired row is reclaimed in place; a live one is left alone.
            let written = tx.execute(
                "INSERT INTO replay_cache (key, value, expires_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE
                     SET value = excluded.value, expires_at = excluded.expires_at
                     WHERE replay_cache.expires_at IS NOT NULL
                       AND replay_cache.expires_at <= ?4",
                params![key, value, now.saturating_add(ttl_millis(ttl)), now],
            )?;
            ctx.check()?;
            tx.commit()?;
            Ok(written == 1)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};

    struct ManualClock(AtomicI64);

    impl Clock for ManualClock {
        fn now_millis(&self) -> i64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    fn data(s: &str) -> Bytes {
        Bytes::copy_from_slice(s.as_bytes())
    }

    async fn indices(store: &SqliteStore, path: &str, query: RangeQuery) -> Vec<Index> {
        store
            .range(&Context::background(), path, query)
            .await
            .unwrap()
            .iter()
            .map(|e| e.index)
            .collect()
    }

    #[tokio::test]
    async fn test_append_and_range() {
        let store = SqliteStore::open_memory().unwrap();
        let ctx = Context::background();

        for i in 1..=5 {
            let idx = store.append(&ctx, "p", data(&format!("m{}", i))).await.unwrap();
            assert_eq!(idx, i);
        }

        let all = store.range(&ctx, "p", RangeQuery::all(100)).await.unwrap();
        assert_eq!(all.len(), 5);
        assert_eq!(all[0].data, data("m1"));
        assert_eq!(all[0].path, "p");

        let page = RangeQuery {
            from: Some(2),
            limit: 2,
            direction: Direction::Ascending,
        };
        assert_eq!(indices(&store, "p", page).await, vec![3, 4]);

        let desc = RangeQuery {
            from: None,
            limit: 3,
            direction: Direction::Descending,
        };
        assert_eq!(indices(&store, "p", desc).await, vec![5, 4, 3]);

        let last = store.range(&ctx, "p", RangeQuery::last()).await.unwrap();
        assert_eq!(last[0].data, data("m5"));
    }

    #[tokio::test]
    async fn test_replace_and_delete_keep_high_water() {
        let store = SqliteStore::open_memory().unwrap();
        let ctx = Context::background();

        store.append(&ctx, "v", data("a")).await.unwrap();
        store.append(&ctx, "v", data("b")).await.unwrap();
        store
            .replace_all(&ctx, "v", vec![data("x"), data("y")])
            .await
            .unwrap();
        assert_eq!(indices(&store, "v", RangeQuery::all(10)).await, vec![3, 4]);

        store.delete(&ctx, "v").await.unwrap();
        assert!(!store.exists(&ctx, "v").await.unwrap());
        assert_eq!(store.append(&ctx, "v", data("z")).await.unwrap(), 5);
        assert!(store.exists(&ctx, "v").await.unwrap());
    }

    #[tokio::test]
    async fn test_entries_use_store_clock() {
        let clock = Arc::new(ManualClock(AtomicI64::new(1_234_567_890_000)));
        let store = SqliteStore::open_memory().unwrap().with_clock(clock);
        let ctx = Context::background();

        store.append(&ctx, "p", data("a")).await.unwrap();
        let entries = store.range(&ctx, "p", RangeQuery::all(1)).await.unwrap();
        assert_eq!(entries[0].timestamp, 1_234_567_890_000);
    }

    #[tokio::test]
    async fn test_persistence_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lockbox.db");
        let ctx = Context::background();

        {
            let store = SqliteStore::open(&path).unwrap();
            store.append(&ctx, "p", data("kept")).await.unwrap();
            store.delete(&ctx, "p").await.unwrap();
            store.append(&ctx, "p", data("again")).await.unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        let entries = store.range(&ctx, "p", RangeQuery::all(10)).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].index, 2);
        assert_eq!(store.append(&ctx, "p", data("next")).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_cancelled_append_writes_nothing() {
        let store = SqliteStore::open_memory().unwrap();
        let ctx = Context::background();
        ctx.cancel();

        let err = store.append(&ctx, "p", data("x")).await.unwrap_err();
        assert!(matches!(err, StoreError::Canceled));
        assert!(!store.exists(&Context::background(), "p").await.unwrap());
        assert_eq!(
            store.append(&Context::background(), "p", data("y")).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_set_if_absent_reclaims_expired() {
        let clock = Arc::new(ManualClock(AtomicI64::new(1_000)));
        let store = SqliteStore::open_memory().unwrap().with_clock(clock.clone());
        let ctx = Context::background();
        let ttl = Duration::from_millis(500);

        assert!(store.set_if_absent(&ctx, "auth-n", "1", ttl).await.unwrap());
        assert!(!store.set_if_absent(&ctx, "auth-n", "1", ttl).await.unwrap());
        assert_eq!(store.get(&ctx, "auth-n").await.unwrap().as_deref(), Some("1"));

        clock.0.store(1_500, Ordering::SeqCst);
        assert_eq!(store.get(&ctx, "auth-n").await.unwrap(), None);
        assert!(store.set_if_absent(&ctx, "auth-n", "1", ttl).await.unwrap());
    }

    #[tokio::test]
    async fn test_set_then_expire_then_purge() {
        let clock = Arc::new(ManualClock(AtomicI64::new(0)));
        let store = SqliteStore::open_memory().unwrap().with_clock(clock.clone());
        let ctx = Context::background();

        store.set(&ctx, "k", "v").await.unwrap();
        assert!(!store
            .set_if_absent(&ctx, "k", "w", Duration::from_secs(1))
            .await
            .unwrap());

        store.expire(&ctx, "k", Duration::from_millis(10)).await.unwrap();
        clock.0.store(10, Ordering::SeqCst);
        assert_eq!(store.get(&ctx, "k").await.unwrap(), None);
        assert_eq!(store.purge_expired(&ctx).await.unwrap(), 1);
        assert_eq!(store.purge_expired(&ctx).await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_set_if_absent_is_atomic() {
        let store = SqliteStore::open_memory().unwrap();
        let mut handles = Vec::new();
        for _ in 0..32 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .set_if_absent(&Context::background(), "auth-race", "1", Duration::from_secs(60))
                    .await
                    .unwrap()
            }));
        }
        let mut winners = 0;
        for h in handles {
            if h.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }
}
