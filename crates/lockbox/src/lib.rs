//! # Lockbox
//!
//! HTTP server for end-to-end-encrypted vaults and channels, authenticated
//! by signed requests.
//!
//! ## Overview
//!
//! Clients hold Ed25519 keys. Each request carries
//! `Authorization: <kid>:<base64 signature>` over `method,url,content_hash`,
//! with a fresh `nonce` and `ts` in the URL. The server never sees plaintext;
//! it stores and serves opaque, ordered records.
//!
//! ## Endpoints
//!
//! | Route                        | Methods                     |
//! |------------------------------|-----------------------------|
//! | `/vault/:kid`                | GET HEAD POST PUT DELETE    |
//! | `/channel/:cid`              | PUT                         |
//! | `/channel/:cid/msgs`         | GET POST                    |
//! | `/user/:kid/channels`        | GET                         |
//!
//! Errors are always `{"error":{"code":<status>,"message":<msg>}}`.
//!
//! ## Re-exports
//!
//! - `lockbox::core` - Key ids, signatures, canonical request bytes
//! - `lockbox::store` - Log store and replay cache backends
//! - `lockbox::auth` - Signer and verifier
//! - `lockbox::sync` - Vault and channel engines
//!
//! ## Usage
//!
//! ```rust,no_run
//! use lockbox::{run_server, ServerConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     run_server(ServerConfig::default(), CancellationToken::new()).await
//! }
//! ```

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use server::{create_state, run_server};
pub use state::AppState;

// Re-export component crates
pub use lockbox_auth as auth;
pub use lockbox_core as core;
pub use lockbox_store as store;
pub use lockbox_sync as sync;
