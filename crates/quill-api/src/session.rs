//! Server-side sessions. The cookie carries only an opaque session id; the
//! logged-in user is looked up fresh on every request, so a renamed or
//! deleted account is never served from a stale snapshot.

use axum_extra::extract::cookie::{Cookie, CookieJar};
use quill_db::models::{SessionRow, UserRow};
use quill_types::api::SortKey;
use uuid::Uuid;

use crate::error::ApiError;
use crate::{AppState, blocking};

pub const SESSION_COOKIE: &str = "quill_session";

fn session_cookie(id: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, id))
        .path("/")
        .http_only(true)
        .build()
}

pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, "")).path("/").build()
}

/// The session row named by the request cookie, if it is still live.
pub async fn current_session(
    state: &AppState,
    jar: &CookieJar,
) -> Result<Option<SessionRow>, ApiError> {
    let Some(cookie) = jar.get(SESSION_COOKIE) else {
        return Ok(None);
    };
    let id = cookie.value().to_string();
    blocking(state, move |db| db.get_session(&id)).await
}

/// The logged-in user, resolved per request through the session's user id.
pub async fn current_user(
    state: &AppState,
    jar: &CookieJar,
) -> Result<Option<UserRow>, ApiError> {
    let Some(session) = current_session(state, jar).await? else {
        return Ok(None);
    };
    let Some(user_id) = session.user_id else {
        return Ok(None);
    };
    blocking(state, move |db| db.get_user_by_id(user_id)).await
}

/// The request's session, creating an anonymous one if needed. Sessions are
/// only created once there is something to store on them.
pub async fn ensure_session(
    state: &AppState,
    jar: CookieJar,
) -> Result<(SessionRow, CookieJar), ApiError> {
    if let Some(session) = current_session(state, &jar).await? {
        return Ok((session, jar));
    }
    let id = Uuid::new_v4().to_string();
    let row_id = id.clone();
    let session = blocking(state, move |db| {
        db.create_session(&row_id, None, SortKey::Id.as_str())?;
        db.get_session(&row_id)
    })
    .await?
    .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("session missing after insert")))?;

    Ok((session, jar.add(session_cookie(id))))
}

/// Replace the caller's session with a fresh id, guarding against session
/// fixation. Used on both login and logout. The sort preference carries
/// over; OAuth scratch state does not.
pub async fn regenerate(
    state: &AppState,
    jar: CookieJar,
    user_id: Option<i64>,
) -> Result<(SessionRow, CookieJar), ApiError> {
    let old = current_session(state, &jar).await?;
    let sort_key = old
        .as_ref()
        .map(|s| s.sort_key.clone())
        .unwrap_or_else(|| SortKey::Id.as_str().to_string());
    let old_id = old.map(|s| s.id);

    let new_id = Uuid::new_v4().to_string();
    let row_id = new_id.clone();
    let session = blocking(state, move |db| {
        if let Some(old_id) = &old_id {
            db.delete_session(old_id)?;
        }
        db.create_session(&row_id, user_id, &sort_key)?;
        db.get_session(&row_id)
    })
    .await?
    .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("session missing after insert")))?;

    Ok((session, jar.add(session_cookie(new_id))))
}
