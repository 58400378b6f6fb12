//! # Lockbox Auth
//!
//! Stateless signed-request authentication.
//!
//! ## Overview
//!
//! A client proves control of a key for one specific HTTP request by signing
//! `method,url,content_hash`, where the URL carries a random `nonce` and a
//! millisecond `ts`. The server re-derives those bytes, checks the
//! signature, consumes the nonce in a [`ReplayCache`](lockbox_store::ReplayCache),
//! and enforces a freshness window on `ts`. There is no session state.
//!
//! ## Key Types
//!
//! - [`Signer`] - Client side: stamps and signs a request
//! - [`Verifier`] - Server side: ordered checks, replay and freshness policy
//! - [`IdentityResolver`] - Key id to verification key
//! - [`AuthError`] - Closed taxonomy of verification failures
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use lockbox_auth::{AuthRequest, CredentialSlot, Signer, Verifier, VerifierConfig};
//! use lockbox_core::{now_millis, Keypair};
//! use lockbox_store::{Context, MemoryReplayCache};
//!
//! async fn example() {
//!     let signer = Signer::new(Keypair::generate());
//!     let signed = signer.sign("GET", "https://lockbox.example/vault/kex_00", "", now_millis()).unwrap();
//!     let header = signed.header();
//!
//!     let verifier = Verifier::new(Arc::new(MemoryReplayCache::default()), VerifierConfig::default());
//!     let auth = verifier
//!         .verify(&Context::background(), &AuthRequest {
//!             method: "GET",
//!             url: signed.url.as_str(),
//!             expected: None,
//!             credential: &header,
//!             content_hash: "",
//!             slot: CredentialSlot::User,
//!         })
//!         .await
//!         .unwrap();
//!     assert_eq!(auth.key_id, signer.key_id());
//! }
//! ```

pub mod error;
pub mod resolver;
pub mod signer;
pub mod verifier;

pub use error::{AuthError, Result};
pub use resolver::{IdentityResolver, KeyIdResolver};
pub use signer::{SignedRequest, Signer};
pub use verifier::{
    AuthRequest, CredentialSlot, VerifiedAuth, Verifier, VerifierConfig, MAX_CLOCK_SKEW,
    NONCE_TTL,
};
