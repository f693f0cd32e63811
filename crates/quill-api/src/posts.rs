use axum::{
    Form, Json,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use tracing::{info, warn};

use quill_db::models::PostRow;
use quill_db::now_stamp;
use quill_types::api::{CreatePostForm, HomeResponse, LikeResponse, PostResponse, SortKey};

use crate::error::ApiError;
use crate::{AppState, blocking, session, user_response};

pub(crate) fn post_response(row: PostRow) -> PostResponse {
    PostResponse {
        id: row.id,
        title: row.title,
        content: row.content,
        username: row.username,
        timestamp: row.timestamp,
        likes: row.likes,
    }
}

#[derive(Debug, Deserialize)]
pub struct HomeQuery {
    pub sort: Option<SortKey>,
}

/// GET / — every post plus the viewer, ordered by the session preference.
/// An explicit `?sort=` selection is remembered on the session, creating an
/// anonymous one if needed.
pub async fn home(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(q): Query<HomeQuery>,
) -> Result<Response, ApiError> {
    let (sort, jar) = match q.sort {
        Some(sort) => {
            let (sess, jar) = session::ensure_session(&state, jar).await?;
            blocking(&state, move |db| db.set_session_sort(&sess.id, sort.as_str())).await?;
            (sort, jar)
        }
        None => {
            let sort = session::current_session(&state, &jar)
                .await?
                .map(|s| SortKey::from_stored(&s.sort_key))
                .unwrap_or_default();
            (sort, jar)
        }
    };

    let posts = blocking(&state, move |db| db.list_posts(sort)).await?;
    let user = session::current_user(&state, &jar).await?;

    let body = HomeResponse {
        posts: posts.into_iter().map(post_response).collect(),
        user: user.map(user_response),
        sort,
    };
    Ok((jar, Json(body)).into_response())
}

/// GET /post/{id}
pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PostResponse>, ApiError> {
    let post = blocking(&state, move |db| db.get_post(id))
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(post_response(post)))
}

/// POST /posts
pub async fn create_post(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<CreatePostForm>,
) -> Result<Response, ApiError> {
    let Some(user) = session::current_user(&state, &jar).await? else {
        return Ok(Redirect::to("/login").into_response());
    };

    let title = form.title.trim().to_string();
    let content = form.content.trim().to_string();
    if title.is_empty() || content.is_empty() {
        return Ok(Redirect::to("/?error=missing-fields").into_response());
    }

    let author = user.username.clone();
    let id = blocking(&state, move |db| {
        db.create_post(&title, &content, &author, &now_stamp())
    })
    .await?;
    info!("User '{}' created post {}", user.username, id);
    Ok(Redirect::to("/").into_response())
}

/// POST /like/{id} — one increment per request, never on your own post.
pub async fn like_post(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let Some(user) = session::current_user(&state, &jar).await? else {
        return Ok(Redirect::to("/login").into_response());
    };

    let liker_id = user.id;
    let (changed, likes) = blocking(&state, move |db| db.like_post_by(id, liker_id))
        .await?
        .ok_or(ApiError::NotFound)?;
    if !changed {
        info!("Like blocked for own post by user {}", liker_id);
    }
    Ok(Json(LikeResponse { likes }).into_response())
}

/// POST /deletePost/{id}
pub async fn delete_post(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let Some(user) = session::current_user(&state, &jar).await? else {
        return Ok(Redirect::to("/login").into_response());
    };
    let post = blocking(&state, move |db| db.get_post(id))
        .await?
        .ok_or(ApiError::NotFound)?;

    if post.username != user.username {
        warn!("Delete of post {} blocked for user {}", id, user.id);
        return Ok(Redirect::to("/").into_response());
    }

    blocking(&state, move |db| db.delete_post(id)).await?;
    info!("User '{}' deleted post {}", user.username, id);
    Ok(Redirect::to("/").into_response())
}
