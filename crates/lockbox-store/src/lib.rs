//! # Lockbox Store
//!
//! Storage collaborators for Lockbox: the ordered log store that backs every
//! vault and channel, and the replay cache that records consumed nonces.
//!
//! ## Overview
//!
//! Both collaborators sit behind async traits so the sync engines and the
//! verifier never see a concrete backend. [`SqliteStore`] implements both
//! and is the production backend. [`MemoryLogStore`] and
//! [`MemoryReplayCache`] are for tests and single-process deployments.
//!
//! ## Key Types
//!
//! - [`LogStore`] - Per-path append-only log with monotonic indices
//! - [`ReplayCache`] - Expiring key-value store with atomic set-if-absent
//! - [`Context`] - Cancellation token plus optional deadline
//! - [`RangeQuery`] - Directional range over a log
//!
//! ## Usage
//!
//! ```rust,no_run
//! use bytes::Bytes;
//! use lockbox_store::{Context, LogStore, SqliteStore};
//!
//! async fn example() {
//!     // Open a SQLite database
//!     let store = SqliteStore::open("lockbox.db").unwrap();
//!
//!     // Append to a log
//!     let ctx = Context::background();
//!     let idx = store.append(&ctx, "channel/x/msgs", Bytes::from_static(b"hi")).await.unwrap();
//!     assert_eq!(idx, 1);
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Indices are never reused**: each path keeps a high-water mark that
//!   survives `replace_all` and `delete`
//! - **Atomic replay check**: `set_if_absent` is a single operation in every backend
//! - **Cancellation**: a call whose context is done fails with `Canceled` or
//!   `DeadlineExceeded` and leaves the store untouched

pub mod context;
pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use context::Context;
pub use error::{Result, StoreError};
pub use memory::{MemoryLogStore, MemoryReplayCache};
pub use sqlite::SqliteStore;
pub use traits::{LogStore, RangeQuery, ReplayCache};
