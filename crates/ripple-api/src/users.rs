use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use ripple_types::api::{
    AccountInfo, MeResponse, SearchResult, SuccessResponse, UpdateProfileRequest, UserResponse,
};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::posts::build_post_responses;

pub async fn me(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let (followers, following) = state.db.follower_counts(&user.id.to_string())?;

    Ok(Json(MeResponse {
        uid: user.id,
        email: user.email,
        display_name: user.display_name,
        photo_url: user.photo_url,
        bio: user.bio,
        followers_count: followers,
        following_count: following,
    }))
}

pub async fn update_me(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.display_name.is_none() && req.bio.is_none() && req.photo_url.is_none() {
        return Err(ApiError::BadRequest("no fields to update".into()));
    }

    if let Some(name) = req.display_name.as_deref() {
        if name.trim().is_empty() {
            return Err(ApiError::BadRequest("display name cannot be empty".into()));
        }
    }

    let id = user.id.to_string();
    state.db.update_profile(
        &id,
        req.display_name.as_deref(),
        req.bio.as_deref(),
        req.photo_url.as_deref(),
    )?;

    let updated = state
        .db
        .get_user_by_id(&id)?
        .ok_or_else(|| ApiError::NotFound("user not found".into()))?;
    let (followers, following) = state.db.follower_counts(&id)?;

    Ok(Json(MeResponse {
        uid: user.id,
        email: updated.email,
        display_name: updated.display_name,
        photo_url: updated.photo_url,
        bio: updated.bio,
        followers_count: followers,
        following_count: following,
    }))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: String,
}

pub async fn search(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(params): Query<SearchQuery>,
) -> Result<impl IntoResponse, ApiError> {
    if params.query.len() < 2 {
        return Err(ApiError::BadRequest(
            "search query must be at least 2 characters".into(),
        ));
    }

    let me = user.id.to_string();
    let hits = state.db.search_users(&params.query, &me)?;
    if hits.is_empty() {
        return Err(ApiError::NotFound("no users found".into()));
    }

    let mut results = Vec::with_capacity(hits.len());
    for hit in hits {
        let is_following = state.db.is_following(&me, &hit.id)?;
        results.push(SearchResult {
            uid: crate::parse_id(&hit.id),
            email: hit.email,
            display_name: hit.display_name,
            photo_url: hit.photo_url,
            bio: hit.bio,
            is_following,
        });
    }

    Ok(Json(results))
}

pub async fn get_user(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let target = state
        .db
        .get_user_by_id(&user_id.to_string())?
        .ok_or_else(|| ApiError::NotFound("user not found".into()))?;

    let (followers, following) = state.db.follower_counts(&target.id)?;
    let is_following = state.db.is_following(&user.id.to_string(), &target.id)?;

    Ok(Json(UserResponse {
        uid: user_id,
        display_name: target.display_name,
        photo_url: target.photo_url,
        bio: target.bio,
        followers_count: followers,
        following_count: following,
        is_following,
    }))
}

pub async fn user_posts(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = state.db.posts_by_user(&user_id.to_string(), 10)?;
    Ok(Json(build_post_responses(&state.db, rows)?))
}

pub async fn followers(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = state.db.followers_of(&user_id.to_string())?;
    Ok(Json(account_list(rows)))
}

pub async fn following(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = state.db.following_of(&user_id.to_string())?;
    Ok(Json(account_list(rows)))
}

pub async fn follow(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    if user_id == user.id {
        return Err(ApiError::BadRequest("you cannot follow yourself".into()));
    }

    let target = user_id.to_string();
    if state.db.get_user_by_id(&target)?.is_none() {
        return Err(ApiError::NotFound("user not found".into()));
    }

    let me = user.id.to_string();
    let now = ripple_db::timestamp(chrono::Utc::now());
    if !state.db.insert_follow(&me, &target, &now)? {
        return Err(ApiError::BadRequest(
            "already following this user".into(),
        ));
    }

    state.db.insert_notification(
        &Uuid::new_v4().to_string(),
        &target,
        &me,
        "follow",
        None,
        &now,
    )?;

    Ok(Json(SuccessResponse { success: true }))
}

pub async fn unfollow(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.db.delete_follow(&user.id.to_string(), &user_id.to_string())? {
        return Err(ApiError::BadRequest("not following this user".into()));
    }

    Ok(Json(SuccessResponse { success: true }))
}

fn account_list(rows: Vec<ripple_db::models::UserRow>) -> Vec<AccountInfo> {
    rows.into_iter()
        .map(|row| AccountInfo {
            uid: crate::parse_id(&row.id),
            email: row.email,
            display_name: row.display_name,
            photo_url: row.photo_url,
            bio: row.bio,
        })
        .collect()
}
