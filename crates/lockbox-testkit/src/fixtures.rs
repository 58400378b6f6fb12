//! Test fixtures and helpers.
//!
//! [`TestServer`] runs the full router in-process over memory stores and a
//! [`TestClock`], and builds correctly signed requests for it.

use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use lockbox::{create_router, AppState, ServerConfig};
use lockbox_auth::{SignedRequest, Signer};
use lockbox_core::{content_hash, Clock, Keypair};
use lockbox_store::{MemoryLogStore, MemoryReplayCache, SqliteStore};
use tower::ServiceExt;

/// Start time of every [`TestClock`].
pub const TEST_EPOCH_MS: i64 = 1_234_567_890_000;

/// Public URL the test server signs against.
pub const TEST_PUBLIC_URL: &str = "http://lockbox.test";

/// A clock that advances by a fixed step each time it is read.
#[derive(Debug)]
pub struct TestClock {
    now: AtomicI64,
    step: i64,
}

impl TestClock {
    pub fn new(start: i64, step: i64) -> Self {
        Self {
            now: AtomicI64::new(start),
            step,
        }
    }

    /// Current value without advancing.
    pub fn peek(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }

    pub fn set(&self, ms: i64) {
        self.now.store(ms, Ordering::SeqCst);
    }

    pub fn advance(&self, ms: i64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Default for TestClock {
    fn default() -> Self {
        Self::new(TEST_EPOCH_MS, 1)
    }
}

impl Clock for TestClock {
    fn now_millis(&self) -> i64 {
        self.now.fetch_add(self.step, Ordering::SeqCst)
    }
}

/// Deterministic keypair for a one-byte seed.
pub fn keypair(seed: u8) -> Keypair {
    Keypair::from_seed(&[seed; 32])
}

pub fn alice() -> Keypair {
    keypair(0x01)
}

pub fn bob() -> Keypair {
    keypair(0x02)
}

/// A key used as a channel identity.
pub fn channel_key() -> Keypair {
    keypair(0x0c)
}

/// A buffered HTTP response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("response body is JSON")
    }

    /// The `error.message` of an error envelope.
    pub fn error_message(&self) -> String {
        self.json()["error"]["message"]
            .as_str()
            .unwrap_or_default()
            .to_string()
    }
}

/// The router over fresh stores, driven in-process.
pub struct TestServer {
    pub router: Router,
    pub state: AppState,
    pub clock: Arc<TestClock>,
    pub config: ServerConfig,
}

impl TestServer {
    /// In-memory stores.
    pub fn new() -> Self {
        let clock = Arc::new(TestClock::default());
        let log = Arc::new(MemoryLogStore::with_clock(clock.clone()));
        Self::build(log, Arc::new(MemoryReplayCache::default()), clock)
    }

    /// SQLite at `path`.
    pub fn with_sqlite(path: impl AsRef<Path>) -> Self {
        let clock = Arc::new(TestClock::default());
        let store = SqliteStore::open(path)
            .expect("open sqlite")
            .with_clock(clock.clone());
        Self::build(Arc::new(store.clone()), Arc::new(store), clock)
    }

    fn build(
        log: Arc<dyn lockbox_store::LogStore>,
        replay: Arc<dyn lockbox_store::ReplayCache>,
        clock: Arc<TestClock>,
    ) -> Self {
        let config = ServerConfig {
            public_url: TEST_PUBLIC_URL.to_string(),
            ..ServerConfig::default()
        };
        let state = AppState::with_clock(&config, log, replay, clock.clone());
        Self {
            router: create_router(state.clone()),
            state,
            clock,
            config,
        }
    }

    /// Sign `method path` with `key` at the current test time.
    pub fn sign(&self, key: &Keypair, method: &str, path: &str, body: &[u8]) -> SignedRequest {
        Signer::new(key.clone())
            .sign(
                method,
                &format!("{}{}", TEST_PUBLIC_URL, path),
                &content_hash(body),
                self.clock.now_millis(),
            )
            .expect("test path signs")
    }

    /// A request carrying `Authorization` from `key`.
    pub fn signed(&self, key: &Keypair, method: &str, path: &str, body: &[u8]) -> Request<Body> {
        let signed = self.sign(key, method, path, body);
        self.to_request(&signed, body)
    }

    /// A request carrying only `Authorization-Channel` from `channel`.
    pub fn signed_channel(
        &self,
        channel: &Keypair,
        method: &str,
        path: &str,
        body: &[u8],
    ) -> Request<Body> {
        let signed = self.sign(channel, method, path, body);
        request(method, &signed)
            .header("Authorization-Channel", signed.header())
            .body(Body::from(body.to_vec()))
            .expect("valid request")
    }

    /// Rebuild the HTTP request for an already signed one, e.g. to replay it.
    pub fn to_request(&self, signed: &SignedRequest, body: &[u8]) -> Request<Body> {
        request(&signed.method, signed)
            .header("Authorization", signed.header())
            .body(Body::from(body.to_vec()))
            .expect("valid request")
    }

    /// A request carrying `Authorization` from `user` and
    /// `Authorization-Channel` from `channel`, sharing one nonce.
    pub fn signed_dual(
        &self,
        user: &Keypair,
        channel: &Keypair,
        method: &str,
        path: &str,
        body: &[u8],
    ) -> Request<Body> {
        let signed = Signer::sign_many(
            &[user, channel],
            method,
            &format!("{}{}", TEST_PUBLIC_URL, path),
            &content_hash(body),
            self.clock.now_millis(),
        )
        .expect("test path signs");
        request(method, &signed[0])
            .header("Authorization", signed[0].header())
            .header("Authorization-Channel", signed[1].header())
            .body(Body::from(body.to_vec()))
            .expect("valid request")
    }

    /// A request with no credentials.
    pub fn unsigned(&self, method: &str, path: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(path)
            .body(Body::empty())
            .expect("valid request")
    }

    /// Send one request through the router.
    pub async fn send(&self, req: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("router is infallible");
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        TestResponse {
            status,
            body: body.to_vec(),
        }
    }
}

impl Default for TestServer {
    fn default() -> Self {
        Self::new()
    }
}

fn request(method: &str, signed: &SignedRequest) -> axum::http::request::Builder {
    let uri = match signed.url.query() {
        Some(q) => format!("{}?{}", signed.url.path(), q),
        None => signed.url.path().to_string(),
    };
    Request::builder().method(method).uri(uri)
}
