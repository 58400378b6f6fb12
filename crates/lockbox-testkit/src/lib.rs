//! # Lockbox Testkit
//!
//! Testing utilities for Lockbox.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Fixed key, nonce, URL and time with the exact
//!   bytes-to-sign and signature any client must produce
//! - **Generators**: Proptest strategies for signed-request parameters
//! - **Fixtures**: Seeded keys, a stepping clock, and an in-process server
//!
//! ## Golden Vectors
//!
//! ```rust
//! use lockbox_testkit::vectors::verify_all_vectors;
//!
//! for (name, matches, bytes) in verify_all_vectors() {
//!     assert!(matches, "{}: {}", name, bytes);
//! }
//! ```
//!
//! ## Test Server
//!
//! ```rust,no_run
//! use axum::http::StatusCode;
//! use lockbox_testkit::fixtures::{alice, TestServer};
//!
//! # async fn example() {
//! let server = TestServer::new();
//! let kid = alice().key_id();
//! let req = server.signed(&alice(), "GET", &format!("/vault/{}", kid), b"");
//! let res = server.send(req).await;
//! assert_eq!(res.status, StatusCode::NOT_FOUND);
//! # }
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{alice, bob, channel_key, keypair, TestClock, TestResponse, TestServer};
pub use generators::SignParams;
pub use vectors::{all_vectors, sign_vector, verify_all_vectors, GoldenVector};
