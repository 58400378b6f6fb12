//! API Server setup

use std::sync::Arc;

use anyhow::Context as _;
use lockbox_store::{Context, MemoryLogStore, MemoryReplayCache, SqliteStore};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;
use crate::routes::create_router;
use crate::state::AppState;

/// Build the shared state over the configured backend.
///
/// Also returns the SQLite store, if any, so the caller can run maintenance
/// on it.
pub fn create_state(config: &ServerConfig) -> anyhow::Result<(AppState, Option<SqliteStore>)> {
    match &config.database {
        Some(path) => {
            let store = SqliteStore::open(path)
                .with_context(|| format!("opening database {}", path.display()))?;
            tracing::info!(path = %path.display(), "using sqlite store");
            let state = AppState::new(config, Arc::new(store.clone()), Arc::new(store.clone()));
            Ok((state, Some(store)))
        }
        None => {
            tracing::info!("using in-memory store");
            let state = AppState::new(
                config,
                Arc::new(MemoryLogStore::new()),
                Arc::new(MemoryReplayCache::default()),
            );
            Ok((state, None))
        }
    }
}

/// Run the API server until `shutdown` is cancelled.
pub async fn run_server(config: ServerConfig, shutdown: CancellationToken) -> anyhow::Result<()> {
    let (state, sqlite) = create_state(&config)?;
    let router = create_router(state);

    if let Some(store) = sqlite {
        tokio::spawn(purge_expired_nonces(
            store,
            config.purge_interval,
            shutdown.clone(),
        ));
    }

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    tracing::info!(addr = %listener.local_addr()?, public_url = %config.public_url, "lockbox listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    tracing::info!("lockbox stopped");
    Ok(())
}

/// Periodically drop replay keys whose TTL has passed.
async fn purge_expired_nonces(
    store: SqliteStore,
    every: std::time::Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval(every);
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => return,
            _ = ticker.tick() => {}
        }
        let ctx = Context::background().with_token(shutdown.child_token());
        match store.purge_expired(&ctx).await {
            Ok(0) => {}
            Ok(purged) => tracing::debug!(purged, "purged expired nonces"),
            Err(e) if e.is_cancellation() => return,
            Err(e) => tracing::warn!(error = %e, "nonce purge failed"),
        }
    }
}
