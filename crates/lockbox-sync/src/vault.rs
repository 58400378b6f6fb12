//! Vault sync: one ordered log of opaque boxes per owner key.

use std::sync::Arc;

use bytes::Bytes;

use lockbox_core::{vault_path, Direction, Entry, Index, KeyId};
use lockbox_store::{Context, LogStore, RangeQuery};

use crate::config::SyncConfig;
use crate::error::{Result, SyncError};

/// Result of a vault pull.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pull {
    pub boxes: Vec<Entry>,
    /// Index of the last box returned, or the cursor if nothing was newer.
    pub version: Index,
}

/// Vault sync engine.
#[derive(Clone)]
pub struct VaultSync {
    store: Arc<dyn LogStore>,
    config: SyncConfig,
}

impl VaultSync {
    pub fn new(store: Arc<dyn LogStore>, config: SyncConfig) -> Self {
        Self { store, config }
    }

    /// Append one box to `owner`'s vault.
    pub async fn append(&self, ctx: &Context, owner: &KeyId, data: Bytes) -> Result<Index> {
        let index = self.store.append(ctx, &vault_path(owner), data).await?;
        tracing::debug!(kid = %owner, index, "vault append");
        Ok(index)
    }

    /// Overwrite `owner`'s vault with `boxes`, in order.
    pub async fn replace(&self, ctx: &Context, owner: &KeyId, boxes: Vec<Bytes>) -> Result<()> {
        let count = boxes.len();
        self.store.replace_all(ctx, &vault_path(owner), boxes).await?;
        tracing::debug!(kid = %owner, count, "vault replace");
        Ok(())
    }

    /// Remove every box from `owner`'s vault.
    pub async fn delete(&self, ctx: &Context, owner: &KeyId) -> Result<()> {
        self.store.delete(ctx, &vault_path(owner)).await?;
        tracing::debug!(kid = %owner, "vault delete");
        Ok(())
    }

    /// True iff the vault has at least one live box.
    pub async fn exists(&self, ctx: &Context, owner: &KeyId) -> Result<bool> {
        Ok(self.store.exists(ctx, &vault_path(owner)).await?)
    }

    /// Pull boxes after `cursor`, ascending.
    ///
    /// Without a cursor an empty vault is [`SyncError::NotFound`]. With a
    /// cursor an empty result is a normal, up-to-date pull.
    pub async fn pull(&self, ctx: &Context, owner: &KeyId, cursor: Option<Index>) -> Result<Pull> {
        let query = RangeQuery {
            from: cursor.filter(|i| *i > 0),
            limit: self.config.vault_max_page,
            direction: Direction::Ascending,
        };
        let boxes = self.store.range(ctx, &vault_path(owner), query).await?;

        if boxes.is_empty() && cursor.is_none() {
            return Err(SyncError::NotFound("vault"));
        }

        let version = boxes
            .last()
            .map(|e| e.index)
            .unwrap_or_else(|| cursor.unwrap_or(0));

        tracing::debug!(kid = %owner, from = ?cursor, got = boxes.len(), version, "vault pull");
        Ok(Pull { boxes, version })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lockbox_core::Keypair;
    use lockbox_store::MemoryLogStore;

    fn engine() -> VaultSync {
        VaultSync::new(Arc::new(MemoryLogStore::new()), SyncConfig::default())
    }

    fn owner() -> KeyId {
        Keypair::from_seed(&[1u8; 32]).key_id()
    }

    fn datas(pull: &Pull) -> Vec<&[u8]> {
        pull.boxes.iter().map(|e| e.data.as_ref()).collect()
    }

    #[tokio::test]
    async fn test_lifecycle() {
        let vault = engine();
        let ctx = Context::background();
        let kid = owner();

        assert!(matches!(
            vault.pull(&ctx, &kid, None).await,
            Err(SyncError::NotFound("vault"))
        ));
        assert!(!vault.exists(&ctx, &kid).await.unwrap());

        vault.append(&ctx, &kid, Bytes::from_static(b"test1")).await.unwrap();
        let first = vault.pull(&ctx, &kid, None).await.unwrap();
        assert_eq!(datas(&first), vec![b"test1".as_ref()]);
        let v1 = first.version;

        let none = vault.pull(&ctx, &kid, Some(v1)).await.unwrap();
        assert!(none.boxes.is_empty());
        assert_eq!(none.version, v1);

        vault.append(&ctx, &kid, Bytes::from_static(b"test2")).await.unwrap();
        vault.append(&ctx, &kid, Bytes::from_static(b"test3")).await.unwrap();
        let more = vault.pull(&ctx, &kid, Some(v1)).await.unwrap();
        assert_eq!(datas(&more), vec![b"test2".as_ref(), b"test3".as_ref()]);
        assert!(vault.exists(&ctx, &kid).await.unwrap());
    }

    #[tokio::test]
    async fn test_replace_from_old_cursor() {
        let vault = engine();
        let ctx = Context::background();
        let kid = owner();

        for b in ["a", "b", "c"] {
            vault.append(&ctx, &kid, Bytes::from(b)).await.unwrap();
        }
        let before = vault.pull(&ctx, &kid, None).await.unwrap().version;

        let six: Vec<Bytes> = (1..=6).map(|i| Bytes::from(format!("box{}", i))).collect();
        vault.replace(&ctx, &kid, six.clone()).await.unwrap();

        let after = vault.pull(&ctx, &kid, Some(before)).await.unwrap();
        assert_eq!(after.boxes.iter().map(|e| e.data.clone()).collect::<Vec<_>>(), six);

        let full = vault.pull(&ctx, &kid, None).await.unwrap();
        assert_eq!(full.boxes.len(), 6);
        assert_eq!(full.version, after.version);
    }

    #[tokio::test]
    async fn test_delete_then_first_read_is_not_found() {
        let vault = engine();
        let ctx = Context::background();
        let kid = owner();

        vault.append(&ctx, &kid, Bytes::from_static(b"x")).await.unwrap();
        let v = vault.pull(&ctx, &kid, None).await.unwrap().version;
        vault.delete(&ctx, &kid).await.unwrap();

        assert!(matches!(vault.pull(&ctx, &kid, None).await, Err(SyncError::NotFound(_))));
        let cursor = vault.pull(&ctx, &kid, Some(v)).await.unwrap();
        assert!(cursor.boxes.is_empty());
        assert_eq!(cursor.version, v);
        assert!(!vault.exists(&ctx, &kid).await.unwrap());
    }

    #[tokio::test]
    async fn test_page_capped() {
        let vault = VaultSync::new(
            Arc::new(MemoryLogStore::new()),
            SyncConfig {
                vault_max_page: 2,
                ..SyncConfig::default()
            },
        );
        let ctx = Context::background();
        let kid = owner();
        for i in 0..5 {
            vault.append(&ctx, &kid, Bytes::from(vec![i])).await.unwrap();
        }

        let first = vault.pull(&ctx, &kid, None).await.unwrap();
        assert_eq!(first.boxes.len(), 2);
        let second = vault.pull(&ctx, &kid, Some(first.version)).await.unwrap();
        assert_eq!(second.boxes.iter().map(|e| e.index).collect::<Vec<_>>(), vec![3, 4]);
    }

    #[tokio::test]
    async fn test_cancelled_append_is_canceled() {
        let vault = engine();
        let ctx = Context::background();
        ctx.cancel();
        let err = vault
            .append(&ctx, &owner(), Bytes::from_static(b"x"))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Canceled));
        assert_eq!(err.status(), 503);
    }
}
