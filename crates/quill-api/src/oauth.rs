//! Google OAuth login. The provider's user id is hashed before storage, so
//! the database never holds a raw external identifier.

use axum::{
    Form, Json,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use quill_types::api::ChooseUsernameForm;

use crate::auth::{self, ErrorQuery};
use crate::error::ApiError;
use crate::{AppState, blocking, session};

const AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const USERINFO_ENDPOINT: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

pub struct GoogleOAuth {
    client_id: String,
    client_secret: String,
    redirect_url: String,
    http: reqwest::Client,
}

impl GoogleOAuth {
    pub fn new(client_id: String, client_secret: String, redirect_url: String) -> Self {
        Self {
            client_id,
            client_secret,
            redirect_url,
            http: reqwest::Client::new(),
        }
    }

    fn auth_url(&self, state_nonce: &str) -> anyhow::Result<String> {
        let url = reqwest::Url::parse_with_params(
            AUTH_ENDPOINT,
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_url.as_str()),
                ("response_type", "code"),
                ("scope", "openid profile"),
                ("state", state_nonce),
            ],
        )?;
        Ok(url.into())
    }

    /// Exchange the callback code for an access token. Providers report
    /// failures in the body, often alongside HTTP 200; the raw body is never
    /// logged because it can carry tokens.
    async fn exchange_code(&self, code: &str) -> anyhow::Result<String> {
        let body: serde_json::Value = self
            .http
            .post(TOKEN_ENDPOINT)
            .form(&[
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", self.redirect_url.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?
            .json()
            .await?;

        match body.get("access_token").and_then(|v| v.as_str()) {
            Some(token) => Ok(token.to_string()),
            None => {
                let code = body.get("error").and_then(|v| v.as_str()).unwrap_or("unknown");
                anyhow::bail!("token exchange failed: {code}")
            }
        }
    }

    async fn fetch_external_id(&self, access_token: &str) -> anyhow::Result<String> {
        let body: serde_json::Value = self
            .http
            .get(USERINFO_ENDPOINT)
            .bearer_auth(access_token)
            .send()
            .await?
            .json()
            .await?;

        body.get("id")
            .or_else(|| body.get("sub"))
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("userinfo response missing user id"))
    }
}

/// One-way hash of an external identity, used as the stored lookup key.
pub fn identity_hash(external_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(external_id.as_bytes());
    hex::encode(hasher.finalize())
}

fn state_nonce() -> String {
    URL_SAFE_NO_PAD.encode(rand::random::<[u8; 16]>())
}

/// GET /auth/google
pub async fn google_login(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Response, ApiError> {
    let Some(oauth) = &state.oauth else {
        warn!("OAuth login attempted without Google credentials configured");
        return Ok(Redirect::to("/login?error=oauth-unconfigured").into_response());
    };

    let (sess, jar) = session::ensure_session(&state, jar).await?;
    let nonce = state_nonce();
    let sess_id = sess.id;
    let stored = nonce.clone();
    blocking(&state, move |db| {
        db.set_session_oauth_state(&sess_id, Some(&stored))
    })
    .await?;

    let url = oauth.auth_url(&nonce).map_err(ApiError::Internal)?;
    Ok((jar, Redirect::to(&url)).into_response())
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// GET /auth/google/callback
pub async fn google_callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(q): Query<CallbackQuery>,
) -> Result<Response, ApiError> {
    let Some(oauth) = &state.oauth else {
        return Ok(Redirect::to("/login?error=oauth-unconfigured").into_response());
    };

    let Some(sess) = session::current_session(&state, &jar).await? else {
        return Ok(Redirect::to("/login?error=oauth-state-mismatch").into_response());
    };

    // The nonce is one-shot; clear it before anything else can fail.
    let sid = sess.id.clone();
    blocking(&state, move |db| db.set_session_oauth_state(&sid, None)).await?;

    if let Some(err) = q.error {
        info!("Google login declined: {}", err);
        return Ok(Redirect::to("/login?error=oauth-denied").into_response());
    }
    let (Some(code), Some(cb_state)) = (q.code, q.state) else {
        return Ok(Redirect::to("/login?error=oauth-failed").into_response());
    };
    if sess.oauth_state.as_deref() != Some(cb_state.as_str()) {
        warn!("OAuth state mismatch for session {}", sess.id);
        return Ok(Redirect::to("/login?error=oauth-state-mismatch").into_response());
    }

    let access_token = match oauth.exchange_code(&code).await {
        Ok(token) => token,
        Err(e) => {
            warn!("OAuth token exchange failed: {e:#}");
            return Ok(Redirect::to("/login?error=oauth-failed").into_response());
        }
    };
    let external_id = match oauth.fetch_external_id(&access_token).await {
        Ok(id) => id,
        Err(e) => {
            warn!("OAuth userinfo fetch failed: {e:#}");
            return Ok(Redirect::to("/login?error=oauth-failed").into_response());
        }
    };
    let hash = identity_hash(&external_id);

    let lookup = hash.clone();
    let existing = blocking(&state, move |db| db.get_user_by_identity(&lookup)).await?;
    match existing {
        Some(user) => {
            let (_, jar) = session::regenerate(&state, jar, Some(user.id)).await?;
            info!("User '{}' logged in via Google", user.username);
            Ok((jar, Redirect::to("/")).into_response())
        }
        None => {
            // First login with this identity: remember the hash and let the
            // user pick a username.
            let sid = sess.id;
            blocking(&state, move |db| {
                db.set_session_pending_identity(&sid, Some(&hash))
            })
            .await?;
            Ok((jar, Redirect::to("/registerUsername")).into_response())
        }
    }
}

/// GET /registerUsername
pub async fn register_username_page(Query(q): Query<ErrorQuery>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "error": q.error }))
}

/// POST /registerUsername — finish registration for a pending external
/// identity stashed on the session by the callback.
pub async fn register_username(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<ChooseUsernameForm>,
) -> Result<Response, ApiError> {
    let Some(sess) = session::current_session(&state, &jar).await? else {
        return Ok(Redirect::to("/login?error=no-pending-login").into_response());
    };
    let Some(identity) = sess.pending_identity else {
        return Ok(Redirect::to("/login?error=no-pending-login").into_response());
    };

    let username = form.username.trim().to_string();
    if username.is_empty() {
        return Ok(Redirect::to("/registerUsername?error=missing-username").into_response());
    }

    match auth::create_account(&state, username.clone(), identity).await? {
        Some(user_id) => {
            // Regeneration drops the old row along with its pending hash.
            let (_, jar) = session::regenerate(&state, jar, Some(user_id)).await?;
            info!("Registered user '{}' via Google", username);
            Ok((jar, Redirect::to("/")).into_response())
        }
        None => Ok(Redirect::to("/registerUsername?error=username-taken").into_response()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_hash_is_stable_hex_sha256() {
        // sha256 of the empty string
        assert_eq!(
            identity_hash(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(identity_hash("108234"), identity_hash("108234"));
        assert_ne!(identity_hash("108234"), identity_hash("108235"));
        assert_eq!(identity_hash("anything").len(), 64);
    }

    #[test]
    fn auth_url_carries_client_and_state() {
        let oauth = GoogleOAuth::new(
            "client-123".into(),
            "secret".into(),
            "http://localhost:3000/auth/google/callback".into(),
        );
        let url = oauth.auth_url("nonce-abc").unwrap();
        assert!(url.starts_with(AUTH_ENDPOINT));
        assert!(url.contains("client_id=client-123"));
        assert!(url.contains("state=nonce-abc"));
        assert!(url.contains("response_type=code"));
        // The secret never appears in the browser redirect.
        assert!(!url.contains("secret"));
    }
}
