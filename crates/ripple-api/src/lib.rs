pub mod auth;
pub mod error;
pub mod messages;
pub mod middleware;
pub mod notifications;
pub mod posts;
pub mod uploads;
pub mod users;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, patch, post};
use chrono::{DateTime, Utc};
use tower_http::services::ServeDir;
use tracing::warn;
use uuid::Uuid;

use crate::auth::AppState;

/// Build the full application router. Everything except register, login,
/// and the static upload directory sits behind the bearer middleware.
pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .with_state(state.clone());

    let protected = Router::new()
        .route("/users/me", get(users::me).patch(users::update_me))
        .route("/users/search", get(users::search))
        .route("/users/{user_id}", get(users::get_user))
        .route("/users/{user_id}/posts", get(users::user_posts))
        .route("/users/{user_id}/followers", get(users::followers))
        .route("/users/{user_id}/following", get(users::following))
        .route("/users/{user_id}/follow", post(users::follow))
        .route("/users/{user_id}/unfollow", post(users::unfollow))
        .route("/posts", get(posts::feed).post(posts::create_post))
        .route("/posts/{post_id}", delete(posts::delete_post))
        .route("/posts/{post_id}/like", post(posts::toggle_like))
        .route("/posts/{post_id}/comments", post(posts::create_comment))
        .route("/messages/conversations", get(messages::list_conversations))
        .route(
            "/messages/{id}",
            get(messages::fetch_messages)
                .post(messages::send_message)
                .delete(messages::delete_message),
        )
        .route("/notifications", get(notifications::list))
        .route("/notifications/{id}/read", patch(notifications::mark_read))
        .route(
            "/upload",
            post(uploads::upload).layer(DefaultBodyLimit::max(10 * 1024 * 1024)),
        )
        .layer(from_fn_with_state(state.clone(), middleware::require_auth))
        .with_state(state.clone());

    Router::new()
        .merge(public)
        .merge(protected)
        .nest_service("/uploads", ServeDir::new(state.uploads.dir()))
}

/// Stored ids are written by this application and should always parse;
/// a corrupt row is logged and degraded rather than failing the request.
pub(crate) fn parse_id(value: &str) -> Uuid {
    value.parse().unwrap_or_else(|e| {
        warn!("Corrupt id '{}': {}", value, e);
        Uuid::default()
    })
}

pub(crate) fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}': {}", value, e);
            DateTime::default()
        })
}
