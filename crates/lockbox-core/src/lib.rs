//! # Lockbox Core
//!
//! Pure primitives for Lockbox: key identifiers, signatures, canonical
//! request bytes, and the types of the append-only logs.
//!
//! This crate contains no I/O, no storage, no networking. It is pure computation
//! over the data that clients sign and servers verify.
//!
//! ## Key Types
//!
//! - [`KeyId`] - Textual identity derived from a public key (`kex_<hex>`)
//! - [`Keypair`] - Ed25519 signing key held by a client
//! - [`Nonce`] - 32 random bytes, base62 on the wire
//! - [`Entry`] - One record in an ordered log
//! - [`Cursor`] - Client-supplied pagination position
//!
//! ## Canonicalization
//!
//! Signed requests are bound to `method + "," + url + "," + content_hash`.
//! See the [`canonical`] module.

pub mod canonical;
pub mod clock;
pub mod crypto;
pub mod encoding;
pub mod error;
pub mod log;
pub mod types;

pub use canonical::{
    bytes_to_sign, canonical_url, canonicalize_url, parse_url, query_param, stamp_url, NONCE_PARAM,
    TIMESTAMP_PARAM,
};
pub use clock::{now_millis, Clock, SystemClock};
pub use crypto::{content_hash, Ed25519PublicKey, Ed25519Signature, Keypair, Nonce, NONCE_LEN};
pub use error::{CoreError, Result};
pub use log::{
    channel_messages_path, user_channels_path, vault_path, Cursor, Direction, Entry, Index,
};
pub use types::{KeyId, KeyType};
