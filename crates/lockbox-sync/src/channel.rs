//! Channels: message logs plus a per-user index of joined channels.
//!
//! A channel's messages live at `channel/{cid}/msgs`. Joining records a
//! [`ChannelMembership`] in `user/{kid}/channels`; listing a user's channels
//! reads that index and decorates each entry with the channel's newest
//! message position.

use std::collections::HashSet;
use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use lockbox_core::{
    channel_messages_path, user_channels_path, Clock, Cursor, Entry, Index, KeyId, SystemClock,
};
use lockbox_store::{Context, LogStore, RangeQuery};

use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::events::{EventSync, Page};

/// A user's membership record, stored CBOR-encoded in the user index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMembership {
    pub channel: KeyId,
    pub joined_at: i64,
}

impl ChannelMembership {
    /// CBOR form stored in the user channel log.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)
            .map_err(|e| SyncError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Decode the record stored in `entry`.
    pub fn from_entry(entry: &Entry) -> Result<Self> {
        ciborium::from_reader(entry.data.as_ref()).map_err(|e| SyncError::Corrupt {
            path: entry.path.clone(),
            index: entry.index,
            reason: e.to_string(),
        })
    }
}

/// One row of a user's channel listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSummary {
    pub id: KeyId,
    /// Index of the newest message, if any.
    pub idx: Option<Index>,
    /// Timestamp of the newest message, or the join time.
    pub ts: i64,
}

/// Channel sync engine.
///
/// Clones share one join lock, so joins through this engine never record
/// the same membership twice. Separate processes writing the same database
/// can still race; the listing de-duplicates for that case.
#[derive(Clone)]
pub struct ChannelSync {
    store: Arc<dyn LogStore>,
    events: EventSync,
    config: SyncConfig,
    clock: Arc<dyn Clock>,
    joins: Arc<Mutex<()>>,
}

impl ChannelSync {
    pub fn new(store: Arc<dyn LogStore>, config: SyncConfig) -> Self {
        Self {
            events: EventSync::new(store.clone()),
            store,
            config,
            clock: Arc::new(SystemClock),
            joins: Arc::new(Mutex::new(())),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Record that `user` joined `channel`. Joining twice is a no-op.
    pub async fn join(&self, ctx: &Context, user: &KeyId, channel: &KeyId) -> Result<()> {
        let path = user_channels_path(user);
        let _guard = self.joins.lock().await;
        if self.memberships(ctx, &path).await?.iter().any(|m| &m.channel == channel) {
            tracing::debug!(kid = %user, cid = %channel, "already joined");
            return Ok(());
        }

        let membership = ChannelMembership {
            channel: *channel,
            joined_at: self.clock.now_millis(),
        };
        self.store
            .append(ctx, &path, Bytes::from(membership.to_bytes()?))
            .await?;
        tracing::info!(kid = %user, cid = %channel, "channel joined");
        Ok(())
    }

    /// Append an opaque message to `channel`.
    pub async fn post(&self, ctx: &Context, channel: &KeyId, data: Bytes) -> Result<Index> {
        let index = self
            .events
            .append(ctx, &channel_messages_path(channel), data)
            .await?;
        tracing::debug!(cid = %channel, index, "channel message");
        Ok(index)
    }

    /// Read one page of `channel`'s messages.
    pub async fn messages(&self, ctx: &Context, channel: &KeyId, cursor: &Cursor) -> Result<Page> {
        self.events
            .page(
                ctx,
                &channel_messages_path(channel),
                cursor,
                self.config.channel_max_page,
            )
            .await
    }

    /// List the channels `user` has joined, in join order.
    pub async fn user_channels(&self, ctx: &Context, user: &KeyId) -> Result<Vec<ChannelSummary>> {
        let path = user_channels_path(user);
        let entries = self
            .store
            .range(ctx, &path, RangeQuery::all(self.config.user_channels_max_page))
            .await?;

        let mut seen = HashSet::new();
        let mut out = Vec::with_capacity(entries.len());
        for entry in &entries {
            let membership = ChannelMembership::from_entry(entry)?;
            if !seen.insert(membership.channel) {
                continue;
            }

            let newest = self
                .store
                .range(ctx, &channel_messages_path(&membership.channel), RangeQuery::last())
                .await?;
            let summary = match newest.first() {
                Some(msg) => ChannelSummary {
                    id: membership.channel,
                    idx: Some(msg.index),
                    ts: msg.timestamp,
                },
                None => ChannelSummary {
                    id: membership.channel,
                    idx: None,
                    ts: membership.joined_at,
                },
            };
            out.push(summary);
        }
        Ok(out)
    }

    async fn memberships(&self, ctx: &Context, path: &str) -> Result<Vec<ChannelMembership>> {
        let mut out = Vec::new();
        let mut from = None;
        loop {
            let page = self
                .store
                .range(
                    ctx,
                    path,
                    RangeQuery {
                        from,
                        ..RangeQuery::all(self.config.user_channels_max_page.max(1))
                    },
                )
                .await?;
            let Some(last) = page.last() else {
                return Ok(out);
            };
            from = Some(last.index);
            for entry in &page {
                out.push(ChannelMembership::from_entry(entry)?);
            }
        }
    }
}
