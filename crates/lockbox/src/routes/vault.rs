//! Vault endpoints

use axum::{
    body::Bytes,
    extract::{OriginalUri, State},
    http::{HeaderMap, Method, StatusCode},
    Json,
};
use lockbox_auth::CredentialSlot;
use lockbox_core::encoding::{base64_decode, base64_encode};
use lockbox_core::{Entry, Index};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::extract::{path_key_id, query, RawPath, SignedParts};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// One box as returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxResponse {
    /// Base64 of the opaque payload.
    pub data: String,
    pub idx: Index,
    pub ts: i64,
}

impl From<&Entry> for BoxResponse {
    fn from(entry: &Entry) -> Self {
        Self {
            data: base64_encode(&entry.data),
            idx: entry.index,
            ts: entry.timestamp,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultResponse {
    pub version: String,
    pub boxes: Vec<BoxResponse>,
}

/// One box in a `PUT` body.
#[derive(Debug, Clone, Deserialize)]
pub struct BoxRequest {
    pub data: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct VaultQuery {
    pub version: Option<String>,
}

/// `POST /vault/:kid`: append the raw body as one box.
pub async fn post_vault(
    State(state): State<AppState>,
    kid: RawPath,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let parts = SignedParts::new(&state, &method, &uri, &headers, &body);
    parts.require(CredentialSlot::User)?;
    let owner = path_key_id(kid)?;
    let ctx = state.context();
    parts.verify(&state, &ctx, CredentialSlot::User, Some(&owner)).await?;

    state.vault.append(&ctx, &owner, body).await?;
    Ok(Json(json!({})))
}

/// `PUT /vault/:kid`: replace the vault with `[{"data": <base64>}]`.
pub async fn put_vault(
    State(state): State<AppState>,
    kid: RawPath,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let parts = SignedParts::new(&state, &method, &uri, &headers, &body);
    parts.require(CredentialSlot::User)?;
    let owner = path_key_id(kid)?;
    let ctx = state.context();
    parts.verify(&state, &ctx, CredentialSlot::User, Some(&owner)).await?;

    let boxes: Vec<BoxRequest> = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("invalid body: {}", e)))?;
    let data = boxes
        .iter()
        .map(|b| base64_decode(&b.data).map(Bytes::from))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ApiError::BadRequest(format!("invalid box data: {}", e)))?;

    state.vault.replace(&ctx, &owner, data).await?;
    Ok(Json(json!({})))
}

/// `GET /vault/:kid[?version=N]`: pull boxes after `version`.
pub async fn get_vault(
    State(state): State<AppState>,
    kid: RawPath,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> ApiResult<Json<VaultResponse>> {
    let parts = SignedParts::new(&state, &method, &uri, &headers, &[]);
    parts.require(CredentialSlot::User)?;
    let owner = path_key_id(kid)?;
    let ctx = state.context();
    parts.verify(&state, &ctx, CredentialSlot::User, Some(&owner)).await?;

    let VaultQuery { version } = query(&uri)?;
    let cursor = parse_version(version.as_deref())?;
    let pull = state.vault.pull(&ctx, &owner, cursor).await?;
    Ok(Json(VaultResponse {
        version: pull.version.to_string(),
        boxes: pull.boxes.iter().map(BoxResponse::from).collect(),
    }))
}

/// `DELETE /vault/:kid`
pub async fn delete_vault(
    State(state): State<AppState>,
    kid: RawPath,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> ApiResult<Json<Value>> {
    let parts = SignedParts::new(&state, &method, &uri, &headers, &[]);
    parts.require(CredentialSlot::User)?;
    let owner = path_key_id(kid)?;
    let ctx = state.context();
    parts.verify(&state, &ctx, CredentialSlot::User, Some(&owner)).await?;

    state.vault.delete(&ctx, &owner).await?;
    Ok(Json(json!({})))
}

/// `HEAD /vault/:kid`: 200 if the vault has boxes, else 404.
pub async fn head_vault(
    State(state): State<AppState>,
    kid: RawPath,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> ApiResult<StatusCode> {
    let parts = SignedParts::new(&state, &method, &uri, &headers, &[]);
    parts.require(CredentialSlot::User)?;
    let owner = path_key_id(kid)?;
    let ctx = state.context();
    parts.verify(&state, &ctx, CredentialSlot::User, Some(&owner)).await?;

    if state.vault.exists(&ctx, &owner).await? {
        Ok(StatusCode::OK)
    } else {
        Ok(StatusCode::NOT_FOUND)
    }
}

fn parse_version(raw: Option<&str>) -> ApiResult<Option<Index>> {
    match raw.filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => s
            .parse::<Index>()
            .map(Some)
            .map_err(|_| ApiError::BadRequest("invalid version".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_version() {
        assert_eq!(parse_version(None).unwrap(), None);
        assert_eq!(parse_version(Some("")).unwrap(), None);
        assert_eq!(parse_version(Some("12")).unwrap(), Some(12));
        assert!(matches!(parse_version(Some("v1")), Err(ApiError::BadRequest(_))));
    }
}
