//! Username-only registration and login, kept from before the Google OAuth
//! migration and still used when no OAuth credentials are configured.

use axum::{
    Form, Json,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use tracing::{info, warn};

use quill_db::{DELETED_USER, now_stamp};
use quill_types::api::{LoginForm, RegisterForm};

use crate::error::ApiError;
use crate::{AppState, blocking, oauth, session};

#[derive(Debug, Deserialize)]
pub struct ErrorQuery {
    pub error: Option<String>,
}

/// The GET form routes only echo the error code carried on the redirect.
pub async fn register_page(Query(q): Query<ErrorQuery>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "error": q.error }))
}

pub async fn login_page(Query(q): Query<ErrorQuery>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "error": q.error }))
}

/// Identity hash stored for local accounts; the schema requires one for
/// every user, OAuth-backed or not.
fn local_identity(username: &str) -> String {
    oauth::identity_hash(&format!("local:{username}"))
}

/// Create an account unless the name is the sentinel or already taken.
/// Shared with the OAuth username-selection step.
pub(crate) async fn create_account(
    state: &AppState,
    username: String,
    identity: String,
) -> Result<Option<i64>, ApiError> {
    blocking(state, move |db| {
        if username == DELETED_USER || db.get_user_by_username(&username)?.is_some() {
            return Ok(None);
        }
        let id = db.create_user(&username, &identity, &now_stamp())?;
        Ok(Some(id))
    })
    .await
}

/// POST /register
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<RegisterForm>,
) -> Result<Response, ApiError> {
    if !state.local_login {
        warn!("Local registration attempted while disabled");
        return Ok(Redirect::to("/login?error=local-login-disabled").into_response());
    }

    let username = form.register_username.trim().to_string();
    if username.is_empty() {
        return Ok(Redirect::to("/register?error=missing-username").into_response());
    }

    match create_account(&state, username.clone(), local_identity(&username)).await? {
        Some(user_id) => {
            let (_, jar) = session::regenerate(&state, jar, Some(user_id)).await?;
            info!("Registered user '{}'", username);
            Ok((jar, Redirect::to("/")).into_response())
        }
        None => Ok(Redirect::to("/register?error=username-taken").into_response()),
    }
}

/// POST /login
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, ApiError> {
    if !state.local_login {
        warn!("Local login attempted while disabled");
        return Ok(Redirect::to("/login?error=local-login-disabled").into_response());
    }

    let username = form.login_username.trim().to_string();
    let lookup = username.clone();
    let user = blocking(&state, move |db| db.get_user_by_username(&lookup)).await?;

    match user {
        Some(user) => {
            let (_, jar) = session::regenerate(&state, jar, Some(user.id)).await?;
            info!("User '{}' logged in", user.username);
            Ok((jar, Redirect::to("/")).into_response())
        }
        None => Ok(Redirect::to("/login?error=no-such-user").into_response()),
    }
}

/// GET /logout — drop the session row and hand out a fresh anonymous id.
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> Result<Response, ApiError> {
    let (_, jar) = session::regenerate(&state, jar, None).await?;
    Ok((jar, Redirect::to("/")).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_avatar::AvatarStore;
    use quill_db::Database;
    use std::sync::Arc;

    async fn test_state() -> (crate::AppState, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("test.db")).unwrap();
        let avatars = AvatarStore::new(dir.path().join("avatars")).await.unwrap();
        let state = Arc::new(crate::AppStateInner {
            db,
            avatars,
            emojis: serde_json::Value::Array(Vec::new()),
            oauth: None,
            local_login: true,
        });
        (state, dir)
    }

    #[tokio::test]
    async fn create_account_rejects_duplicates_and_the_sentinel() {
        let (state, _dir) = test_state().await;

        let id = create_account(&state, "alice".into(), local_identity("alice"))
            .await
            .unwrap();
        assert!(id.is_some());

        // Same name again: rejected, no row inserted.
        let dup = create_account(&state, "alice".into(), local_identity("other"))
            .await
            .unwrap();
        assert!(dup.is_none());

        // The sentinel is reserved even though no such user exists.
        let sentinel = create_account(&state, DELETED_USER.into(), local_identity("x"))
            .await
            .unwrap();
        assert!(sentinel.is_none());
        assert!(state.db.get_user_by_username(DELETED_USER).unwrap().is_none());
    }
}
