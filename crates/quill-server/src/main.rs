use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use quill_api::oauth::GoogleOAuth;
use quill_api::{AppStateInner, auth, avatar, emoji, oauth, posts, profile};
use quill_avatar::AvatarStore;
use quill_db::Database;
use quill_server::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quill=debug,tower_http=debug".into()),
        )
        .init();

    let cfg = Config::from_env()?;

    // Init database and avatar storage
    let db = Database::open(&cfg.db_path)?;
    let avatars = AvatarStore::new(cfg.avatar_dir.clone()).await?;

    // One-time emoji catalog fetch
    let http = reqwest::Client::new();
    let emojis = emoji::fetch_catalog(&http, cfg.emoji_api_key.as_deref()).await;

    let google = cfg.google.as_ref().map(|g| {
        GoogleOAuth::new(
            g.client_id.clone(),
            g.client_secret.clone(),
            g.redirect_url.clone(),
        )
    });
    let local_login = google.is_none();
    if local_login {
        info!("Google OAuth not configured; username-only login enabled");
    }

    let state: quill_api::AppState = Arc::new(AppStateInner {
        db,
        avatars,
        emojis,
        oauth: google,
        local_login,
    });

    let app = Router::new()
        .route("/", get(posts::home))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", get(auth::logout))
        .route("/post/{id}", get(posts::get_post))
        .route("/posts", post(posts::create_post))
        .route("/like/{id}", post(posts::like_post))
        .route("/deletePost/{id}", post(posts::delete_post))
        .route("/profile", get(profile::profile).post(profile::update_profile))
        .route("/uploadAvatar", post(profile::upload_avatar))
        .route("/deleteAccount", post(profile::delete_account))
        .route("/avatar/{username}", get(avatar::get_avatar))
        .route("/auth/google", get(oauth::google_login))
        .route("/auth/google/callback", get(oauth::google_callback))
        .route(
            "/registerUsername",
            get(oauth::register_username_page).post(oauth::register_username),
        )
        .route("/emojis", get(emoji::list_emojis))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port).parse()?;
    info!("Quill listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
