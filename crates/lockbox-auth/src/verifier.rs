//! Server-side verification of signed requests.
//!
//! [`Verifier::verify`] runs a fixed sequence of checks. The order decides
//! which error a caller sees when several things are wrong at once:
//!
//! 1. Credential shape (`<kid>:<sig>`)
//! 2. Key id parse
//! 3. Expected key id match
//! 4. Verification key lookup
//! 5. Signature decode
//! 6. URL parse
//! 7. Canonical bytes
//! 8. Signature check
//! 9. Nonce presence and length
//! 10. Nonce consumption in the replay cache
//! 11. Timestamp freshness
//! 12. Return [`VerifiedAuth`]
//!
//! Nothing is written to the replay cache until the signature has been
//! proven valid, so a forged request cannot burn someone else's nonce.

use std::sync::Arc;
use std::time::Duration;

use url::Url;

use lockbox_core::{
    bytes_to_sign, canonical_url, query_param, Clock, CoreError, Ed25519Signature, KeyId, Nonce,
    SystemClock, NONCE_PARAM, TIMESTAMP_PARAM,
};
use lockbox_store::{Context, ReplayCache};

use crate::error::{AuthError, Result};
use crate::resolver::{IdentityResolver, KeyIdResolver};

/// How long a consumed nonce is remembered.
pub const NONCE_TTL: Duration = Duration::from_secs(60 * 60);

/// Largest accepted distance between `ts` and server time.
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(30 * 60);

/// Value stored under a consumed nonce key.
const NONCE_SENTINEL: &str = "1";

/// Configuration for the verifier.
#[derive(Debug, Clone)]
pub struct VerifierConfig {
    pub nonce_ttl: Duration,
    pub max_clock_skew: Duration,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            nonce_ttl: NONCE_TTL,
            max_clock_skew: MAX_CLOCK_SKEW,
        }
    }
}

/// Which header a credential arrived in.
///
/// Each slot has its own replay namespace, so one request may present the
/// same nonce once per slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSlot {
    /// `Authorization`
    User,
    /// `Authorization-Channel`
    Channel,
}

impl CredentialSlot {
    pub const fn header_name(&self) -> &'static str {
        match self {
            CredentialSlot::User => "Authorization",
            CredentialSlot::Channel => "Authorization-Channel",
        }
    }

    pub const fn replay_namespace(&self) -> &'static str {
        match self {
            CredentialSlot::User => "auth",
            CredentialSlot::Channel => "auth-channel",
        }
    }
}

/// One request to authenticate.
#[derive(Debug, Clone)]
pub struct AuthRequest<'a> {
    pub method: &'a str,
    /// Absolute URL the client signed, including `nonce` and `ts`.
    pub url: &'a str,
    /// Owner the path is bound to, if any.
    pub expected: Option<&'a KeyId>,
    /// Raw header value.
    pub credential: &'a str,
    pub content_hash: &'a str,
    pub slot: CredentialSlot,
}

/// The authenticated caller and the exact request they signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedAuth {
    pub key_id: KeyId,
    pub method: String,
    pub url: Url,
    pub nonce: Nonce,
    pub timestamp: i64,
}

/// Verifies signed requests against a replay cache.
pub struct Verifier {
    resolver: Arc<dyn IdentityResolver>,
    replay: Arc<dyn ReplayCache>,
    clock: Arc<dyn Clock>,
    config: VerifierConfig,
}

impl Verifier {
    /// Verifier with key-derived identities and the system clock.
    pub fn new(replay: Arc<dyn ReplayCache>, config: VerifierConfig) -> Self {
        Self {
            resolver: Arc::new(KeyIdResolver),
            replay,
            clock: Arc::new(SystemClock),
            config,
        }
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn IdentityResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Verify against the verifier's clock.
    pub async fn verify(&self, ctx: &Context, req: &AuthRequest<'_>) -> Result<VerifiedAuth> {
        let now = self.clock.now_millis();
        self.verify_at(ctx, req, now).await
    }

    /// Verify with an explicit server time in milliseconds.
    pub async fn verify_at(
        &self,
        ctx: &Context,
        req: &AuthRequest<'_>,
        now_ms: i64,
    ) -> Result<VerifiedAuth> {
        match self.check(ctx, req, now_ms).await {
            Ok(auth) => {
                tracing::info!(kid = %auth.key_id, header = req.slot.header_name(), "auth ok");
                Ok(auth)
            }
            Err(err) => {
                tracing::debug!(
                    kind = err.kind(),
                    error = %err,
                    header = req.slot.header_name(),
                    "auth failed"
                );
                Err(err)
            }
        }
    }

    async fn check(&self, ctx: &Context, req: &AuthRequest<'_>, now_ms: i64) -> Result<VerifiedAuth> {
        let fields: Vec<&str> = req.credential.split(':').collect();
        let &[kid_text, sig_text] = fields.as_slice() else {
            return Err(AuthError::MalformedCredential);
        };

        let key_id =
            KeyId::parse(kid_text).map_err(|e| AuthError::InvalidKeyId(core_detail(e)))?;

        if let Some(expected) = req.expected {
            if *expected != key_id {
                return Err(AuthError::KeyIdMismatch);
            }
        }

        let public_key = self
            .resolver
            .public_key_for(&key_id)
            .map_err(|e| AuthError::UnsupportedKeyType(core_detail(e)))?;

        let signature = Ed25519Signature::from_base64(sig_text)
            .map_err(|e| AuthError::InvalidSignatureEncoding(core_detail(e)))?;

        let url = canonical_url(req.url).map_err(|e| AuthError::MalformedUrl(core_detail(e)))?;

        let message = bytes_to_sign(req.method, &url, req.content_hash);

        public_key
            .verify(&message, &signature)
            .map_err(|_| AuthError::SignatureInvalid)?;

        let nonce_text = query_param(&url, NONCE_PARAM)
            .filter(|n| !n.is_empty())
            .ok_or(AuthError::MissingNonce)?;
        let nonce =
            Nonce::from_base62(&nonce_text).map_err(|e| AuthError::InvalidNonce(core_detail(e)))?;

        let replay_key = format!("{}-{}", req.slot.replay_namespace(), nonce_text);
        let fresh = self
            .replay
            .set_if_absent(ctx, &replay_key, NONCE_SENTINEL, self.config.nonce_ttl)
            .await?;
        if !fresh {
            return Err(AuthError::NonceCollision);
        }

        let ts_text = query_param(&url, TIMESTAMP_PARAM)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingTimestamp)?;
        let timestamp: i64 = ts_text
            .parse()
            .map_err(|e| AuthError::InvalidTimestamp(format!("{}: {:?}", e, ts_text)))?;

        let skew_ms = now_ms.saturating_sub(timestamp).saturating_abs();
        let max_skew_ms = i64::try_from(self.config.max_clock_skew.as_millis()).unwrap_or(i64::MAX);
        if skew_ms > max_skew_ms {
            return Err(AuthError::TimestampOutOfWindow { skew_ms });
        }

        Ok(VerifiedAuth {
            key_id,
            method: req.method.to_string(),
            url,
            nonce,
            timestamp,
        })
    }
}

/// Strip the core error's own prefix; the auth variant names the kind.
fn core_detail(err: CoreError) -> String {
    match err {
        CoreError::InvalidKeyId(s)
        | CoreError::UnsupportedKeyType(s)
        | CoreError::InvalidSignatureEncoding(s)
        | CoreError::MalformedUrl(s)
        | CoreError::InvalidNonce(s)
        | CoreError::InvalidDirection(s) => s,
        CoreError::InvalidSignature => "invalid signature".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signer::{SignedRequest, Signer};
    use lockbox_core::{content_hash, KeyType, Keypair};
    use lockbox_store::{MemoryReplayCache, StoreError};

    const NOW: i64 = 1_234_567_890_000;
    const URL: &str = "https://lockbox.test/vault/owner";

    fn verifier() -> Verifier {
        Verifier::new(Arc::new(MemoryReplayCache::default()), VerifierConfig::default())
    }

    fn signed(keypair: &Keypair, method: &str, hash: &str, ts: i64) -> SignedRequest {
        Signer::new(keypair.clone())
            .sign(method, URL, hash, ts)
            .unwrap()
    }

    fn request<'a>(signed: &'a SignedRequest, header: &'a str) -> AuthRequest<'a> {
        AuthRequest {
            method: &signed.method,
            url: signed.url.as_str(),
            expected: None,
            credential: header,
            content_hash: "",
            slot: CredentialSlot::User,
        }
    }

    #[tokio::test]
    async fn test_round_trip() {
        let keypair = Keypair::from_seed(&[0x01; 32]);
        let s = signed(&keypair, "GET", "", NOW);
        let header = s.header();

        let auth = verifier()
            .verify_at(&Context::background(), &request(&s, &header), NOW)
            .await
            .unwrap();
        assert_eq!(auth.key_id, keypair.key_id());
        assert_eq!(auth.method, "GET");
        assert_eq!(auth.nonce, s.nonce);
        assert_eq!(auth.timestamp, NOW);
        assert_eq!(auth.url, s.url);
    }

    #[tokio::test]
    async fn test_replay_rejected() {
        let keypair = Keypair::generate();
        let s = signed(&keypair, "GET", "", NOW);
        let header = s.header();
        let v = verifier();
        let ctx = Context::background();

        v.verify_at(&ctx, &request(&s, &header), NOW).await.unwrap();
        let err = v.verify_at(&ctx, &request(&s, &header), NOW).await.unwrap_err();
        assert!(matches!(err, AuthError::NonceCollision));
    }

    #[tokio::test]
    async fn test_slots_have_separate_namespaces() {
        let keypair = Keypair::generate();
        let s = signed(&keypair, "GET", "", NOW);
        let header = s.header();
        let v = verifier();
        let ctx = Context::background();

        v.verify_at(&ctx, &request(&s, &header), NOW).await.unwrap();
        let mut channel = request(&s, &header);
        channel.slot = CredentialSlot::Channel;
        v.verify_at(&ctx, &channel, NOW).await.unwrap();
    }

    #[tokio::test]
    async fn test_malformed_credential() {
        let keypair = Keypair::generate();
        let s = signed(&keypair, "GET", "", NOW);
        let v = verifier();
        let ctx = Context::background();

        for header in ["", "justone", "a:b:c"] {
            let err = v.verify_at(&ctx, &request(&s, header), NOW).await.unwrap_err();
            assert!(matches!(err, AuthError::MalformedCredential), "{:?}", header);
        }
    }

    #[tokio::test]
    async fn test_invalid_key_id() {
        let keypair = Keypair::generate();
        let s = signed(&keypair, "GET", "", NOW);
        let header = format!("kex_zz:{}", s.signature.to_base64());

        let err = verifier()
            .verify_at(&Context::background(), &request(&s, &header), NOW)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidKeyId(_)));
    }

    #[tokio::test]
    async fn test_expected_key_checked_before_signature() {
        let owner = Keypair::from_seed(&[0x01; 32]);
        let other = Keypair::from_seed(&[0x02; 32]);
        let s = signed(&other, "GET", "", NOW);
        // Garbage signature: mismatch must still win.
        let header = format!("{}:!!!", other.key_id());

        let mut req = request(&s, &header);
        let owner_kid = owner.key_id();
        req.expected = Some(&owner_kid);

        let err = verifier()
            .verify_at(&Context::background(), &req, NOW)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::KeyIdMismatch));
    }

    #[tokio::test]
    async fn test_box_key_unsupported() {
        let keypair = Keypair::generate();
        let s = signed(&keypair, "GET", "", NOW);
        let box_kid = KeyId::new(KeyType::X25519, *keypair.public_key().as_bytes());
        let header = format!("{}:{}", box_kid, s.signature.to_base64());

        let err = verifier()
            .verify_at(&Context::background(), &request(&s, &header), NOW)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::UnsupportedKeyType(_)));
    }

    #[tokio::test]
    async fn test_bad_signature_encoding() {
        let keypair = Keypair::generate();
        let s = signed(&keypair, "GET", "", NOW);
        let header = format!("{}:not-base64!", keypair.key_id());

        let err = verifier()
            .verify_at(&Context::background(), &request(&s, &header), NOW)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidSignatureEncoding(_)));
    }

    #[tokio::test]
    async fn test_relative_url_malformed() {
        let keypair = Keypair::generate();
        let s = signed(&keypair, "GET", "", NOW);
        let header = s.header();
        let mut req = request(&s, &header);
        req.url = "/vault/owner";

        let err = verifier()
            .verify_at(&Context::background(), &req, NOW)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::MalformedUrl(_)));
    }

    #[tokio::test]
    async fn test_tampering_fails_without_consuming_nonce() {
        let keypair = Keypair::generate();
        let hash = content_hash(b"body");
        let s = signed(&keypair, "POST", &hash, NOW);
        let header = s.header();
        let v = verifier();
        let ctx = Context::background();

        let mut req = request(&s, &header);
        req.content_hash = &hash;

        let mut wrong_method = req.clone();
        wrong_method.method = "PUT";
        let err = v.verify_at(&ctx, &wrong_method, NOW).await.unwrap_err();
        assert!(matches!(err, AuthError::SignatureInvalid));

        let mut wrong_body = req.clone();
        wrong_body.content_hash = "";
        let err = v.verify_at(&ctx, &wrong_body, NOW).await.unwrap_err();
        assert!(matches!(err, AuthError::SignatureInvalid));

        let tampered_url = s.url.as_str().replace("/vault/owner", "/vault/other");
        let mut wrong_url = req.clone();
        wrong_url.url = &tampered_url;
        let err = v.verify_at(&ctx, &wrong_url, NOW).await.unwrap_err();
        assert!(matches!(err, AuthError::SignatureInvalid));

        // The genuine request still goes through.
        v.verify_at(&ctx, &req, NOW).await.unwrap();
    }

    #[tokio::test]
    async fn test_swapped_signature_fails() {
        let a = Keypair::generate();
        let b = Keypair::generate();
        let sa = signed(&a, "GET", "", NOW);
        let sb = signed(&b, "GET", "", NOW);
        let header = format!("{}:{}", a.key_id(), sb.signature.to_base64());

        let err = verifier()
            .verify_at(&Context::background(), &request(&sa, &header), NOW)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::SignatureInvalid));
    }

    fn sign_raw(keypair: &Keypair, url: &str) -> (String, String) {
        let url = canonical_url(url).unwrap();
        let sig = keypair.sign(&bytes_to_sign("GET", &url, ""));
        (url.to_string(), format!("{}:{}", keypair.key_id(), sig.to_base64()))
    }

    fn raw_request<'a>(url: &'a str, header: &'a str) -> AuthRequest<'a> {
        AuthRequest {
            method: "GET",
            url,
            expected: None,
            credential: header,
            content_hash: "",
            slot: CredentialSlot::User,
        }
    }

    #[tokio::test]
    async fn test_nonce_checks() {
        let keypair = Keypair::generate();
        let v = verifier();
        let ctx = Context::background();

        let (url, header) = sign_raw(&keypair, &format!("{}?ts={}", URL, NOW));
        let err = v.verify_at(&ctx, &raw_request(&url, &header), NOW).await.unwrap_err();
        assert!(matches!(err, AuthError::MissingNonce));

        let (url, header) = sign_raw(&keypair, &format!("{}?nonce=abc&ts={}", URL, NOW));
        let err = v.verify_at(&ctx, &raw_request(&url, &header), NOW).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidNonce(_)));
    }

    #[tokio::test]
    async fn test_timestamp_checks() {
        let keypair = Keypair::generate();
        let v = verifier();
        let ctx = Context::background();

        let nonce = Nonce::random().to_base62();
        let (url, header) = sign_raw(&keypair, &format!("{}?nonce={}", URL, nonce));
        let err = v.verify_at(&ctx, &raw_request(&url, &header), NOW).await.unwrap_err();
        assert!(matches!(err, AuthError::MissingTimestamp));

        let nonce = Nonce::random().to_base62();
        let (url, header) = sign_raw(&keypair, &format!("{}?nonce={}&ts=soon", URL, nonce));
        let err = v.verify_at(&ctx, &raw_request(&url, &header), NOW).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidTimestamp(_)));
    }

    #[tokio::test]
    async fn test_timestamp_window_both_directions() {
        let keypair = Keypair::generate();
        let v = verifier();
        let ctx = Context::background();
        let window = 30 * 60 * 1000;

        for ts in [NOW - window - 1, NOW + window + 1] {
            let s = signed(&keypair, "GET", "", ts);
            let header = s.header();
            let err = v.verify_at(&ctx, &request(&s, &header), NOW).await.unwrap_err();
            assert!(
                matches!(err, AuthError::TimestampOutOfWindow { skew_ms } if skew_ms == window + 1)
            );
        }

        for ts in [NOW - window, NOW + window] {
            let s = signed(&keypair, "GET", "", ts);
            let header = s.header();
            v.verify_at(&ctx, &request(&s, &header), NOW).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_cancelled_context_leaves_nonce_unconsumed() {
        let keypair = Keypair::generate();
        let s = signed(&keypair, "GET", "", NOW);
        let header = s.header();
        let v = verifier();

        let cancelled = Context::background();
        cancelled.cancel();
        let err = v.verify_at(&cancelled, &request(&s, &header), NOW).await.unwrap_err();
        assert!(matches!(err, AuthError::Canceled));

        v.verify_at(&Context::background(), &request(&s, &header), NOW)
            .await
            .unwrap();
    }

    struct BrokenCache;

    #[async_trait::async_trait]
    impl ReplayCache for BrokenCache {
        async fn get(&self, _: &Context, _: &str) -> lockbox_store::Result<Option<String>> {
            Err(StoreError::InvalidData("down".into()))
        }
        async fn set(&self, _: &Context, _: &str, _: &str) -> lockbox_store::Result<()> {
            Err(StoreError::InvalidData("down".into()))
        }
        async fn expire(&self, _: &Context, _: &str, _: Duration) -> lockbox_store::Result<()> {
            Err(StoreError::InvalidData("down".into()))
        }
        async fn set_if_absent(
            &self,
            _: &Context,
            _: &str,
            _: &str,
            _: Duration,
        ) -> lockbox_store::Result<bool> {
            Err(StoreError::InvalidData("down".into()))
        }
    }

    #[tokio::test]
    async fn test_cache_failure_is_internal() {
        let keypair = Keypair::generate();
        let s = signed(&keypair, "GET", "", NOW);
        let header = s.header();
        let v = Verifier::new(Arc::new(BrokenCache), VerifierConfig::default());

        let err = v
            .verify_at(&Context::background(), &request(&s, &header), NOW)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Store(_)));
        assert_eq!(err.status(), 500);
    }
}
