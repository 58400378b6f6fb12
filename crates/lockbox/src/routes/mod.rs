//! API route handlers

pub mod channel;
pub mod vault;

use axum::{
    routing::{get, put},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Vault endpoints
        .route(
            "/vault/:kid",
            get(vault::get_vault)
                .head(vault::head_vault)
                .post(vault::post_vault)
                .put(vault::put_vault)
                .delete(vault::delete_vault),
        )
        // Channel endpoints
        .route("/channel/:cid", put(channel::put_channel))
        .route(
            "/channel/:cid/msgs",
            get(channel::get_messages).post(channel::post_message),
        )
        .route("/user/:kid/channels", get(channel::get_user_channels))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
