//! Canonical request bytes.
//!
//! A signed request is bound to the literal string
//!
//! ```text
//! method "," canonical_url "," content_hash
//! ```
//!
//! where `canonical_url` is the absolute URL with:
//! - Query pairs stable-sorted by key
//! - Pairs re-encoded with `application/x-www-form-urlencoded` rules
//! - Fragment removed
//!
//! Signer and verifier both go through [`canonicalize_url`], so the order in
//! which a client happened to write its query string never matters.

use url::Url;

use crate::crypto::Nonce;
use crate::error::CoreError;

/// Query parameter carrying the base62 nonce.
pub const NONCE_PARAM: &str = "nonce";

/// Query parameter carrying the millisecond timestamp.
pub const TIMESTAMP_PARAM: &str = "ts";

/// Parse an absolute URL.
///
/// Relative references and URLs without a hierarchical path are rejected.
pub fn parse_url(raw: &str) -> Result<Url, CoreError> {
    let url = Url::parse(raw).map_err(|e| CoreError::MalformedUrl(format!("{}: {:?}", e, raw)))?;
    if url.cannot_be_a_base() {
        return Err(CoreError::MalformedUrl(format!("not a hierarchical url: {:?}", raw)));
    }
    Ok(url)
}

/// Rewrite a URL into its canonical form in place.
pub fn canonicalize_url(url: &mut Url) {
    let mut pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    url.set_fragment(None);
    if pairs.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(pairs);
    }
}

/// Parse and canonicalize in one step.
pub fn canonical_url(raw: &str) -> Result<Url, CoreError> {
    let mut url = parse_url(raw)?;
    canonicalize_url(&mut url);
    Ok(url)
}

/// Embed `nonce` and `ts` into a raw URL and canonicalize it.
///
/// The raw URL must not already carry either parameter.
pub fn stamp_url(raw: &str, nonce: &Nonce, timestamp: i64) -> Result<Url, CoreError> {
    let mut url = parse_url(raw)?;

    if let Some((key, _)) = url
        .query_pairs()
        .find(|(k, _)| k == NONCE_PARAM || k == TIMESTAMP_PARAM)
    {
        return Err(CoreError::MalformedUrl(format!(
            "reserved query parameter {:?} already present",
            key
        )));
    }

    url.query_pairs_mut()
        .append_pair(NONCE_PARAM, &nonce.to_base62())
        .append_pair(TIMESTAMP_PARAM, &timestamp.to_string());
    canonicalize_url(&mut url);
    Ok(url)
}

/// The exact bytes that get signed for a request.
///
/// `url` is expected to be canonical already.
pub fn bytes_to_sign(method: &str, url: &Url, content_hash: &str) -> Vec<u8> {
    let url = url.as_str();
    let mut buf = Vec::with_capacity(method.len() + url.len() + content_hash.len() + 2);
    buf.extend_from_slice(method.as_bytes());
    buf.push(b',');
    buf.extend_from_slice(url.as_bytes());
    buf.push(b',');
    buf.extend_from_slice(content_hash.as_bytes());
    buf
}

/// First value of a query parameter, if present.
pub fn query_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}
