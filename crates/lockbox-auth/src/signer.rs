//! Client-side request signing.
//!
//! A signed request carries its proof in two places: `nonce` and `ts` are
//! stamped into the URL, and `Authorization: <kid>:<base64 sig>` is sent as
//! a header. The signature covers `method,url,content_hash`.
//!
//! ```rust
//! use lockbox_auth::Signer;
//! use lockbox_core::{content_hash, Keypair};
//!
//! let signer = Signer::new(Keypair::generate());
//! let body = b"box";
//! let signed = signer
//!     .sign("POST", "https://lockbox.example/vault/kex_00", &content_hash(body), 1_700_000_000_000)
//!     .unwrap();
//! assert!(signed.url.as_str().contains("nonce="));
//! ```

use url::Url;

use lockbox_core::{
    bytes_to_sign, stamp_url, CoreError, Ed25519Signature, KeyId, Keypair, Nonce,
};

use crate::error::{AuthError, Result};

/// The output of signing one request with one key.
#[derive(Debug, Clone)]
pub struct SignedRequest {
    pub key_id: KeyId,
    pub method: String,
    /// Canonical URL including `nonce` and `ts`; send the request here.
    pub url: Url,
    pub nonce: Nonce,
    pub timestamp: i64,
    pub signature: Ed25519Signature,
    /// The exact string that was signed.
    pub bytes_to_sign: String,
}

impl SignedRequest {
    /// Header value: `<kid>:<base64 signature>`.
    pub fn header(&self) -> String {
        format!("{}:{}", self.key_id, self.signature.to_base64())
    }
}

/// Signs requests with one client key.
#[derive(Debug, Clone)]
pub struct Signer {
    keypair: Keypair,
}

impl Signer {
    pub fn new(keypair: Keypair) -> Self {
        Self { keypair }
    }

    pub fn key_id(&self) -> KeyId {
        self.keypair.key_id()
    }

    /// Sign with a fresh random nonce.
    pub fn sign(
        &self,
        method: &str,
        raw_url: &str,
        content_hash: &str,
        now_ms: i64,
    ) -> Result<SignedRequest> {
        self.sign_with_nonce(method, raw_url, content_hash, now_ms, Nonce::random())
    }

    /// Sign with a caller-chosen nonce.
    pub fn sign_with_nonce(
        &self,
        method: &str,
        raw_url: &str,
        content_hash: &str,
        now_ms: i64,
        nonce: Nonce,
    ) -> Result<SignedRequest> {
        let url = stamp_url(raw_url, &nonce, now_ms).map_err(malformed)?;
        Ok(sign_stamped(&self.keypair, method, url, content_hash, now_ms, nonce))
    }

    /// Sign one URL with several keys, sharing a single nonce and timestamp.
    ///
    /// Used when a request carries both `Authorization` and
    /// `Authorization-Channel`. Results come back in key order.
    pub fn sign_many(
        keypairs: &[&Keypair],
        method: &str,
        raw_url: &str,
        content_hash: &str,
        now_ms: i64,
    ) -> Result<Vec<SignedRequest>> {
        let nonce = Nonce::random();
        let url = stamp_url(raw_url, &nonce, now_ms).map_err(malformed)?;
        Ok(keypairs
            .iter()
            .map(|kp| sign_stamped(kp, method, url.clone(), content_hash, now_ms, nonce))
            .collect())
    }
}

fn sign_stamped(
    keypair: &Keypair,
    method: &str,
    url: Url,
    content_hash: &str,
    timestamp: i64,
    nonce: Nonce,
) -> SignedRequest {
    let message = bytes_to_sign(method, &url, content_hash);
    let signature = keypair.sign(&message);
    SignedRequest {
        key_id: keypair.key_id(),
        method: method.to_string(),
        url,
        nonce,
        timestamp,
        signature,
        bytes_to_sign: String::from_utf8_lossy(&message).into_owned(),
    }
}

fn malformed(err: CoreError) -> AuthError {
    match err {
        CoreError::MalformedUrl(msg) => AuthError::MalformedUrl(msg),
        other => AuthError::MalformedUrl(other.to_string()),
    }
}
