use axum::{
    Form, Json,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{info, warn};

use quill_db::DELETED_USER;
use quill_types::api::{ProfileResponse, ProfileUpdateForm};

use crate::error::ApiError;
use crate::posts::post_response;
use crate::{AppState, blocking, session, user_response};

/// GET /profile
pub async fn profile(State(state): State<AppState>, jar: CookieJar) -> Result<Response, ApiError> {
    let Some(user) = session::current_user(&state, &jar).await? else {
        return Ok(Redirect::to("/login").into_response());
    };

    let author = user.username.clone();
    let posts = blocking(&state, move |db| db.posts_by_user(&author)).await?;

    Ok(Json(ProfileResponse {
        user: user_response(user),
        posts: posts.into_iter().map(post_response).collect(),
    })
    .into_response())
}

/// POST /profile — username edit. The user row and every attributed post
/// change together in one transaction.
pub async fn update_profile(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<ProfileUpdateForm>,
) -> Result<Response, ApiError> {
    let Some(user) = session::current_user(&state, &jar).await? else {
        return Ok(Redirect::to("/login").into_response());
    };

    let new_name = form.username.trim().to_string();
    if new_name.is_empty() {
        return Ok(Redirect::to("/profile?error=missing-username").into_response());
    }
    if new_name == user.username {
        return Ok(Redirect::to("/profile").into_response());
    }

    let check = new_name.clone();
    let taken = blocking(&state, move |db| {
        Ok(check == DELETED_USER || db.get_user_by_username(&check)?.is_some())
    })
    .await?;
    if taken {
        return Ok(Redirect::to("/profile?error=username-taken").into_response());
    }

    let old_name = user.username.clone();
    let renamed = new_name.clone();
    blocking(&state, move |db| db.rename_user(&old_name, &renamed)).await?;

    // The stored avatar shows the old initial; drop it so the next request
    // regenerates it with the new letter.
    if let Err(e) = state.avatars.delete(user.id).await {
        warn!("Failed to remove stale avatar for user {}: {e:#}", user.id);
    }

    info!("User {} renamed '{}' -> '{}'", user.id, user.username, new_name);
    Ok(Redirect::to("/profile").into_response())
}

/// POST /uploadAvatar — (re)generate the letter avatar and record its URL.
pub async fn upload_avatar(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Response, ApiError> {
    let Some(user) = session::current_user(&state, &jar).await? else {
        return Ok(Redirect::to("/login").into_response());
    };

    let letter = user.username.chars().next().unwrap_or('?');
    state
        .avatars
        .regenerate(user.id, letter)
        .await
        .map_err(ApiError::Internal)?;

    let url = format!("/avatar/{}", user.username);
    let user_id = user.id;
    blocking(&state, move |db| db.set_avatar_url(user_id, &url)).await?;

    info!("User '{}' refreshed their avatar", user.username);
    Ok(Redirect::to("/profile").into_response())
}

/// POST /deleteAccount — posts are re-attributed to the sentinel username
/// and the user row removed, atomically; the avatar file removal afterwards
/// is logged and ignored on failure.
pub async fn delete_account(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Response, ApiError> {
    let Some(user) = session::current_user(&state, &jar).await? else {
        return Ok(Redirect::to("/login").into_response());
    };

    let user_id = user.id;
    blocking(&state, move |db| db.delete_user(user_id)).await?;

    if let Err(e) = state.avatars.delete(user.id).await {
        warn!("Failed to remove avatar for deleted user {}: {e:#}", user.id);
    }

    info!("Deleted account '{}' ({})", user.username, user.id);
    let jar = jar.remove(session::removal_cookie());
    Ok((jar, Redirect::to("/")).into_response())
}
