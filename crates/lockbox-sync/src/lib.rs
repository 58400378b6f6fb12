//! # Lockbox Sync
//!
//! Cursor-based incremental sync over ordered logs.
//!
//! ## Overview
//!
//! Every resource is an append-only log in a [`LogStore`](lockbox_store::LogStore).
//! Clients remember the index of the last entry they saw and ask for what
//! came after it. The engines here add the resource rules on top of the
//! raw log: page caps, first-read `NotFound`, channel membership.
//!
//! ## Key Types
//!
//! - [`VaultSync`] - Per-owner box log: append, replace, delete, pull
//! - [`ChannelSync`] - Channel messages and the per-user channel index
//! - [`EventSync`] - Paged reads over any log path
//! - [`PageParams`] - `idx`/`limit`/`dir` query parsing
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use bytes::Bytes;
//! use lockbox_core::Keypair;
//! use lockbox_store::{Context, MemoryLogStore};
//! use lockbox_sync::{SyncConfig, VaultSync};
//!
//! async fn example() {
//!     let vault = VaultSync::new(Arc::new(MemoryLogStore::new()), SyncConfig::default());
//!     let owner = Keypair::generate().key_id();
//!     let ctx = Context::background();
//!
//!     vault.append(&ctx, &owner, Bytes::from_static(b"box")).await.unwrap();
//!     let pull = vault.pull(&ctx, &owner, None).await.unwrap();
//!     let next = vault.pull(&ctx, &owner, Some(pull.version)).await.unwrap();
//!     assert!(next.boxes.is_empty());
//! }
//! ```

pub mod channel;
pub mod config;
pub mod error;
pub mod events;
pub mod vault;

pub use channel::{ChannelMembership, ChannelSummary, ChannelSync};
pub use config::SyncConfig;
pub use error::{Result, SyncError};
pub use events::{EventSync, Page, PageParams};
pub use vault::{Pull, VaultSync};
