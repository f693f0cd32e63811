pub mod auth;
pub mod avatar;
pub mod emoji;
pub mod error;
pub mod oauth;
pub mod posts;
pub mod profile;
pub mod session;

use std::sync::Arc;

use quill_avatar::AvatarStore;
use quill_db::Database;
use quill_db::models::UserRow;
use quill_types::api::UserResponse;

use crate::error::ApiError;
use crate::oauth::GoogleOAuth;

pub struct AppStateInner {
    pub db: Database,
    pub avatars: AvatarStore,
    /// Emoji catalog fetched once at startup; empty when no API key is set.
    pub emojis: serde_json::Value,
    pub oauth: Option<GoogleOAuth>,
    /// Username-only login, kept for running without Google credentials.
    pub local_login: bool,
}

pub type AppState = Arc<AppStateInner>;

/// Run a blocking database closure off the async runtime.
pub(crate) async fn blocking<T, F>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("blocking task join: {e}")))?
        .map_err(ApiError::Internal)
}

pub(crate) fn user_response(row: UserRow) -> UserResponse {
    UserResponse {
        id: row.id,
        username: row.username,
        avatar_url: row.avatar_url,
        member_since: row.member_since,
    }
}
