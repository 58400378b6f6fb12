//! Paged reads over a named log.
//!
//! The pagination contract shared by every log-backed resource:
//!
//! - `idx`: resume strictly after (ascending) or before (descending) this index
//! - `limit`: page size, capped by the caller-supplied maximum
//! - `dir`: `asc` (default) or `desc`
//!
//! A page carries the index of its last entry. An empty page carries the
//! requested `idx` back unchanged, so the caller resumes from the same spot.

use std::sync::Arc;

use serde::Deserialize;

use lockbox_core::{CoreError, Cursor, Direction, Entry, Index};
use lockbox_store::{Context, LogStore, RangeQuery};

use crate::error::{Result, SyncError};

/// Raw pagination query parameters, as they arrive on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PageParams {
    pub idx: Option<String>,
    pub limit: Option<String>,
    pub dir: Option<String>,
}

impl PageParams {
    /// Parse into a cursor. Empty values count as absent.
    pub fn to_cursor(&self) -> Result<Cursor> {
        let index = match non_empty(&self.idx) {
            Some(raw) => Some(raw.parse::<Index>().map_err(|_| SyncError::InvalidQuery {
                param: "index",
                value: raw.to_string(),
            })?),
            None => None,
        };

        let limit = match non_empty(&self.limit) {
            Some(raw) => Some(raw.parse::<usize>().map_err(|_| SyncError::InvalidQuery {
                param: "limit",
                value: raw.to_string(),
            })?),
            None => None,
        };

        let direction = match non_empty(&self.dir) {
            Some(raw) => raw.parse::<Direction>().map_err(|e| match e {
                CoreError::InvalidDirection(v) => SyncError::InvalidDirection(v),
                other => SyncError::InvalidDirection(other.to_string()),
            })?,
            None => Direction::Ascending,
        };

        Ok(Cursor {
            index,
            limit,
            direction,
        })
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// One page of a log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub entries: Vec<Entry>,
    /// Index of the last entry delivered, or the cursor's index if none.
    pub index: Index,
}

/// Reads pages from any log path.
#[derive(Clone)]
pub struct EventSync {
    store: Arc<dyn LogStore>,
}

impl EventSync {
    pub fn new(store: Arc<dyn LogStore>) -> Self {
        Self { store }
    }

    /// Read one page of `path`, never more than `max` entries.
    pub async fn page(&self, ctx: &Context, path: &str, cursor: &Cursor, max: usize) -> Result<Page> {
        let query = RangeQuery {
            from: cursor.start(),
            limit: cursor.effective_limit(max),
            direction: cursor.direction,
        };
        let entries = self.store.range(ctx, path, query).await?;
        let index = entries
            .last()
            .map(|e| e.index)
            .unwrap_or_else(|| cursor.index.unwrap_or(0));

        tracing::debug!(path, from = ?cursor.index, got = entries.len(), to = index, "events");
        Ok(Page { entries, index })
    }

    /// Append one opaque record to `path`.
    pub async fn append(&self, ctx: &Context, path: &str, data: bytes::Bytes) -> Result<Index> {
        Ok(self.store.append(ctx, path, data).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use lockbox_store::MemoryLogStore;

    fn params(idx: Option<&str>, limit: Option<&str>, dir: Option<&str>) -> PageParams {
        PageParams {
            idx: idx.map(String::from),
            limit: limit.map(String::from),
            dir: dir.map(String::from),
        }
    }

    async fn seeded(n: usize) -> EventSync {
        let sync = EventSync::new(Arc::new(MemoryLogStore::new()));
        let ctx = Context::background();
        for i in 1..=n {
            sync.append(&ctx, "channel/c/msgs", Bytes::from(format!("m{}", i)))
                .await
                .unwrap();
        }
        sync
    }

    #[test]
    fn test_params_defaults() {
        let cursor = params(None, None, None).to_cursor().unwrap();
        assert_eq!(cursor, Cursor::default());

        let cursor = params(Some(""), Some(""), Some("")).to_cursor().unwrap();
        assert_eq!(cursor, Cursor::default());
    }

    #[test]
    fn test_params_parse() {
        let cursor = params(Some("7"), Some("20"), Some("desc")).to_cursor().unwrap();
        assert_eq!(cursor.index, Some(7));
        assert_eq!(cursor.limit, Some(20));
        assert_eq!(cursor.direction, Direction::Descending);
    }

    #[test]
    fn test_params_errors() {
        assert!(matches!(
            params(Some("x"), None, None).to_cursor(),
            Err(SyncError::InvalidQuery { param: "index", .. })
        ));
        assert!(matches!(
            params(None, Some("-1"), None).to_cursor(),
            Err(SyncError::InvalidQuery { param: "limit", .. })
        ));
        let err = params(None, None, Some("up")).to_cursor().unwrap_err();
        assert!(matches!(err, SyncError::InvalidDirection(ref d) if d == "up"));
        assert_eq!(err.to_string(), "invalid dir");
    }

    #[tokio::test]
    async fn test_ascending_pages_resume() {
        let sync = seeded(5).await;
        let ctx = Context::background();

        let first = sync
            .page(&ctx, "channel/c/msgs", &params(None, Some("2"), None).to_cursor().unwrap(), 100)
            .await
            .unwrap();
        assert_eq!(first.entries.iter().map(|e| e.index).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(first.index, 2);

        let second = sync
            .page(&ctx, "channel/c/msgs", &Cursor { index: Some(first.index), limit: Some(10), direction: Direction::Ascending }, 100)
            .await
            .unwrap();
        assert_eq!(second.entries.iter().map(|e| e.index).collect::<Vec<_>>(), vec![3, 4, 5]);
        assert_eq!(second.index, 5);

        let empty = sync
            .page(&ctx, "channel/c/msgs", &Cursor::after(5), 100)
            .await
            .unwrap();
        assert!(empty.entries.is_empty());
        assert_eq!(empty.index, 5);
    }

    #[tokio::test]
    async fn test_limit_capped_by_max() {
        let sync = seeded(5).await;
        let cursor = params(None, Some("1000"), None).to_cursor().unwrap();
        let page = sync
            .page(&Context::background(), "channel/c/msgs", &cursor, 3)
            .await
            .unwrap();
        assert_eq!(page.entries.len(), 3);
    }

    #[tokio::test]
    async fn test_descending() {
        let sync = seeded(4).await;
        let cursor = params(None, None, Some("desc")).to_cursor().unwrap();
        let page = sync
            .page(&Context::background(), "channel/c/msgs", &cursor, 100)
            .await
            .unwrap();
        assert_eq!(page.entries.iter().map(|e| e.index).collect::<Vec<_>>(), vec![4, 3, 2, 1]);
        assert_eq!(page.index, 1);
    }

    #[tokio::test]
    async fn test_unknown_path_is_empty_not_error() {
        let sync = seeded(0).await;
        let page = sync
            .page(&Context::background(), "nowhere", &Cursor::default(), 10)
            .await
            .unwrap();
        assert!(page.entries.is_empty());
        assert_eq!(page.index, 0);
    }
}
