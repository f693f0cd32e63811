use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};

use crate::error::ApiError;
use crate::{AppState, blocking};

/// GET /avatar/{username} — letter avatar for the name's first character.
/// Known users get a persisted file keyed by their numeric id, generated
/// lazily on first request; unknown names render on the fly and are not
/// stored.
pub async fn get_avatar(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Response, ApiError> {
    let letter = username.chars().next().unwrap_or('?');

    let user = blocking(&state, move |db| db.get_user_by_username(&username)).await?;

    let bytes = match user {
        Some(user) => state
            .avatars
            .load_or_generate(user.id, letter)
            .await
            .map_err(ApiError::Internal)?,
        None => quill_avatar::generate(letter, quill_avatar::DEFAULT_SIZE, quill_avatar::DEFAULT_SIZE)
            .map_err(ApiError::Internal)?,
    };

    Ok(([(header::CONTENT_TYPE, "image/png")], bytes).into_response())
}
