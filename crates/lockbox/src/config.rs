//! Server configuration.

use std::path::PathBuf;
use std::time::Duration;

use lockbox_auth::{VerifierConfig, MAX_CLOCK_SKEW, NONCE_TTL};
use lockbox_sync::SyncConfig;
use serde::{Deserialize, Serialize};

/// Configuration for a Lockbox server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind.
    pub host: String,
    pub port: u16,

    /// Scheme and authority clients sign against, e.g. `https://lockbox.example`.
    ///
    /// The signed URL of a request is this plus the request's path and query.
    pub public_url: String,

    /// SQLite file. `None` keeps everything in memory.
    pub database: Option<PathBuf>,

    /// Deadline for each request's store and cache calls.
    pub request_timeout: Duration,

    /// How long a consumed nonce is remembered.
    pub nonce_ttl: Duration,

    /// Largest accepted distance between a request's `ts` and server time.
    pub max_clock_skew: Duration,

    /// How often expired replay keys are purged from SQLite.
    pub purge_interval: Duration,

    pub sync: SyncConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            public_url: "http://localhost:8080".to_string(),
            database: None,
            request_timeout: Duration::from_secs(10),
            nonce_ttl: NONCE_TTL,
            max_clock_skew: MAX_CLOCK_SKEW,
            purge_interval: Duration::from_secs(60),
            sync: SyncConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Verifier policy derived from this config.
    pub fn verifier(&self) -> VerifierConfig {
        VerifierConfig {
            nonce_ttl: self.nonce_ttl,
            max_clock_skew: self.max_clock_skew,
        }
    }

    /// `host:port`.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
