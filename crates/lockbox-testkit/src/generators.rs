//! Proptest strategies for signed requests.

use proptest::prelude::*;

use lockbox_core::{Keypair, Nonce};

use crate::fixtures::TEST_EPOCH_MS;

pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

pub fn nonce() -> impl Strategy<Value = Nonce> {
    any::<[u8; 32]>().prop_map(Nonce::from_bytes)
}

/// Generate an HTTP method.
pub fn method() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("GET"),
        Just("HEAD"),
        Just("POST"),
        Just("PUT"),
        Just("DELETE"),
    ]
}

/// Generate an absolute path of one to four segments.
pub fn url_path() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z0-9_]{1,12}", 1..=4).prop_map(|segs| format!("/{}", segs.join("/")))
}

/// Generate query pairs that never use the reserved `nonce`/`ts` names.
pub fn query() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::vec(("[a-m]{1,6}", "[A-Za-z0-9]{0,8}"), 0..4)
}

/// Generate body bytes of specified max length.
pub fn body(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// Parameters for one signed request.
#[derive(Debug, Clone)]
pub struct SignParams {
    pub keypair: Keypair,
    pub method: &'static str,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub timestamp: i64,
}

impl SignParams {
    /// Full URL on `base`, query in generated order.
    pub fn url(&self, base: &str) -> String {
        if self.query.is_empty() {
            return format!("{}{}", base, self.path);
        }
        let query: Vec<String> = self.query.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        format!("{}{}?{}", base, self.path, query.join("&"))
    }
}

impl Arbitrary for SignParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            any::<[u8; 32]>(), // seed
            method(),
            url_path(),
            query(),
            body(256),
            TEST_EPOCH_MS - 1_000_000..=TEST_EPOCH_MS + 1_000_000,
        )
            .prop_map(|(seed, method, path, query, body, timestamp)| SignParams {
                keypair: Keypair::from_seed(&seed),
                method,
                path,
                query,
                body,
                timestamp,
            })
            .boxed()
    }
}
