//! Channel and user channel endpoints

use axum::{
    body::Bytes,
    extract::{OriginalUri, State},
    http::{HeaderMap, Method},
    Json,
};
use lockbox_auth::CredentialSlot;
use lockbox_core::encoding::base64_encode;
use lockbox_core::Index;
use lockbox_sync::{ChannelSummary, PageParams};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::extract::{path_key_id, query, RawPath, SignedParts};
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub data: String,
    pub idx: Index,
    pub ts: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagesResponse {
    pub msgs: Vec<MessageResponse>,
    pub idx: Index,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelResponse {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idx: Option<Index>,
    pub ts: i64,
}

impl From<&ChannelSummary> for ChannelResponse {
    fn from(summary: &ChannelSummary) -> Self {
        Self {
            id: summary.id.to_string(),
            idx: summary.idx,
            ts: summary.ts,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelsResponse {
    pub channels: Vec<ChannelResponse>,
}

/// `PUT /channel/:cid`: join the channel.
///
/// Needs the user's `Authorization` and the channel key's
/// `Authorization-Channel`.
pub async fn put_channel(
    State(state): State<AppState>,
    cid: RawPath,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let parts = SignedParts::new(&state, &method, &uri, &headers, &body);
    parts.require(CredentialSlot::User)?;
    parts.require(CredentialSlot::Channel)?;
    let channel = path_key_id(cid)?;
    let ctx = state.context();

    let user = parts.verify(&state, &ctx, CredentialSlot::User, None).await?;
    parts
        .verify(&state, &ctx, CredentialSlot::Channel, Some(&channel))
        .await?;

    state.channels.join(&ctx, &user.key_id, &channel).await?;
    Ok(Json(json!({})))
}

/// `POST /channel/:cid/msgs`: append the raw body as one message.
pub async fn post_message(
    State(state): State<AppState>,
    cid: RawPath,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let parts = SignedParts::new(&state, &method, &uri, &headers, &body);
    parts.require(CredentialSlot::User)?;
    parts.require(CredentialSlot::Channel)?;
    let channel = path_key_id(cid)?;
    let ctx = state.context();

    parts.verify(&state, &ctx, CredentialSlot::User, None).await?;
    parts
        .verify(&state, &ctx, CredentialSlot::Channel, Some(&channel))
        .await?;

    state.channels.post(&ctx, &channel, body).await?;
    Ok(Json(json!({})))
}

/// `GET /channel/:cid/msgs?idx&limit&dir`
pub async fn get_messages(
    State(state): State<AppState>,
    cid: RawPath,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> ApiResult<Json<MessagesResponse>> {
    let parts = SignedParts::new(&state, &method, &uri, &headers, &[]);
    parts.require(CredentialSlot::Channel)?;
    let channel = path_key_id(cid)?;
    let ctx = state.context();
    parts
        .verify(&state, &ctx, CredentialSlot::Channel, Some(&channel))
        .await?;

    let params: PageParams = query(&uri)?;
    let cursor = params.to_cursor()?;
    let page = state.channels.messages(&ctx, &channel, &cursor).await?;
    Ok(Json(MessagesResponse {
        msgs: page
            .entries
            .iter()
            .map(|e| MessageResponse {
                data: base64_encode(&e.data),
                idx: e.index,
                ts: e.timestamp,
            })
            .collect(),
        idx: page.index,
    }))
}

/// `GET /user/:kid/channels`
pub async fn get_user_channels(
    State(state): State<AppState>,
    kid: RawPath,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> ApiResult<Json<ChannelsResponse>> {
    let parts = SignedParts::new(&state, &method, &uri, &headers, &[]);
    parts.require(CredentialSlot::User)?;
    let user = path_key_id(kid)?;
    let ctx = state.context();
    parts.verify(&state, &ctx, CredentialSlot::User, Some(&user)).await?;

    let channels = state.channels.user_channels(&ctx, &user).await?;
    Ok(Json(ChannelsResponse {
        channels: channels.iter().map(ChannelResponse::from).collect(),
    }))
}
