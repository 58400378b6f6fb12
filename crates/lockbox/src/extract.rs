//! Request authentication for handlers.
//!
//! Handlers collect the parts a signature covers into [`SignedParts`] and
//! ask it to verify one credential header. The signed URL is rebuilt from
//! the configured public URL plus the request's path and query, and the
//! content hash is taken over the raw body bytes.

use axum::extract::rejection::PathRejection;
use axum::extract::{Path, Query};
use axum::http::{HeaderMap, Method, Uri};
use lockbox_auth::{AuthError, AuthRequest, CredentialSlot, VerifiedAuth};
use lockbox_core::{content_hash, KeyId};
use lockbox_store::Context;
use serde::de::DeserializeOwned;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// The signature-covered parts of one HTTP request.
#[derive(Debug, Clone)]
pub struct SignedParts<'a> {
    method: &'a Method,
    url: String,
    headers: &'a HeaderMap,
    content_hash: String,
}

impl<'a> SignedParts<'a> {
    pub fn new(state: &AppState, method: &'a Method, uri: &Uri, headers: &'a HeaderMap, body: &[u8]) -> Self {
        let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
        Self {
            method,
            url: format!("{}{}", state.public_url, path_and_query),
            headers,
            content_hash: content_hash(body),
        }
    }

    /// Verify the credential in `slot`'s header, bound to `expected` if given.
    pub async fn verify(
        &self,
        state: &AppState,
        ctx: &Context,
        slot: CredentialSlot,
        expected: Option<&KeyId>,
    ) -> ApiResult<VerifiedAuth> {
        let credential = self.header(slot)?;
        let auth = state
            .verifier
            .verify(
                ctx,
                &AuthRequest {
                    method: self.method.as_str(),
                    url: &self.url,
                    expected,
                    credential,
                    content_hash: &self.content_hash,
                    slot,
                },
            )
            .await?;
        Ok(auth)
    }

    /// Fail with 401 unless `slot`'s header is present.
    pub fn require(&self, slot: CredentialSlot) -> ApiResult<()> {
        self.header(slot).map(|_| ())
    }

    fn header(&self, slot: CredentialSlot) -> ApiResult<&str> {
        let name = slot.header_name();
        match self.headers.get(name) {
            Some(value) if !value.is_empty() => value
                .to_str()
                .map_err(|_| ApiError::Auth(AuthError::MalformedCredential)),
            _ => Err(ApiError::MissingHeader(name)),
        }
    }
}

/// The single path parameter, with axum's rejection kept for the handler.
pub type RawPath = Result<Path<String>, PathRejection>;

/// Parse the key id taken from the request path.
pub fn path_key_id(raw: RawPath) -> ApiResult<KeyId> {
    let Path(raw) = raw.map_err(|_| ApiError::BadRequest("invalid path".to_string()))?;
    KeyId::parse(&raw).map_err(|e| ApiError::BadRequest(e.to_string()))
}

/// Deserialize the query string of `uri`.
pub fn query<T: DeserializeOwned>(uri: &Uri) -> ApiResult<T> {
    Query::<T>::try_from_uri(uri)
        .map(|Query(q)| q)
        .map_err(|_| ApiError::BadRequest("invalid query".to_string()))
}
