//! Application state shared by every handler.

use std::sync::Arc;
use std::time::Duration;

use lockbox_auth::Verifier;
use lockbox_core::{Clock, SystemClock};
use lockbox_store::{Context, LogStore, ReplayCache};
use lockbox_sync::{ChannelSync, VaultSync};

use crate::config::ServerConfig;

/// API server state
#[derive(Clone)]
pub struct AppState {
    pub verifier: Arc<Verifier>,
    pub vault: VaultSync,
    pub channels: ChannelSync,
    /// Prefix of every signed URL, without a trailing slash.
    pub public_url: Arc<str>,
    pub request_timeout: Duration,
}

impl AppState {
    /// Wire the engines over the given stores, on the system clock.
    pub fn new(config: &ServerConfig, log: Arc<dyn LogStore>, replay: Arc<dyn ReplayCache>) -> Self {
        Self::with_clock(config, log, replay, Arc::new(SystemClock))
    }

    /// Wire the engines with an explicit clock for freshness and join times.
    pub fn with_clock(
        config: &ServerConfig,
        log: Arc<dyn LogStore>,
        replay: Arc<dyn ReplayCache>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let verifier = Verifier::new(replay, config.verifier()).with_clock(clock.clone());
        Self {
            verifier: Arc::new(verifier),
            vault: VaultSync::new(log.clone(), config.sync.clone()),
            channels: ChannelSync::new(log, config.sync.clone()).with_clock(clock),
            public_url: Arc::from(config.public_url.trim_end_matches('/')),
            request_timeout: config.request_timeout,
        }
    }

    /// Fresh per-request context bounded by the request timeout.
    pub fn context(&self) -> Context {
        Context::with_timeout(self.request_timeout)
    }
}
