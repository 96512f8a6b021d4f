use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use ripple_db::Database;
use ripple_db::models::PostRow;
use ripple_types::api::{
    CommentRequest, CommentResponse, CreatePostRequest, LikeResponse, PostResponse,
    SuccessResponse, UserSummary,
};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::CurrentUser;

pub async fn feed(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let rows = state.db.list_posts(50)?;
    Ok(Json(build_post_responses(&state.db, rows)?))
}

pub async fn create_post(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let has_text = req.content.as_deref().is_some_and(|s| !s.trim().is_empty());
    let has_image = req.image_url.as_deref().is_some_and(|s| !s.is_empty());
    if !has_text && !has_image {
        return Err(ApiError::BadRequest(
            "post must have text or an image".into(),
        ));
    }

    let post_id = Uuid::new_v4();
    let now = chrono::Utc::now();

    state.db.insert_post(
        &post_id.to_string(),
        &user.id.to_string(),
        req.content.as_deref(),
        req.image_url.as_deref(),
        &ripple_db::timestamp(now),
    )?;

    Ok((
        StatusCode::CREATED,
        Json(PostResponse {
            id: post_id,
            text: req.content,
            image_url: req.image_url,
            created_at: now,
            author: UserSummary {
                uid: user.id,
                display_name: user.display_name,
                photo_url: user.photo_url,
            },
            likes: vec![],
            comments: vec![],
        }),
    ))
}

pub async fn delete_post(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(post_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    if !state
        .db
        .delete_post_owned(&post_id.to_string(), &user.id.to_string())?
    {
        return Err(ApiError::NotFound(
            "post not found or not yours to delete".into(),
        ));
    }

    Ok(Json(SuccessResponse { success: true }))
}

pub async fn toggle_like(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(post_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let pid = post_id.to_string();
    let author = state
        .db
        .get_post_author(&pid)?
        .ok_or_else(|| ApiError::NotFound("post not found".into()))?;

    let me = user.id.to_string();
    let now = ripple_db::timestamp(chrono::Utc::now());
    let liked = state.db.toggle_like(&pid, &me, &now)?;

    // Only a fresh like on someone else's post notifies.
    if liked && author != me {
        state.db.insert_notification(
            &Uuid::new_v4().to_string(),
            &author,
            &me,
            "like",
            Some(&pid),
            &now,
        )?;
    }

    Ok(Json(LikeResponse { liked }))
}

pub async fn create_comment(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(post_id): Path<Uuid>,
    Json(req): Json<CommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.text.trim().is_empty() {
        return Err(ApiError::BadRequest("comment cannot be empty".into()));
    }

    let pid = post_id.to_string();
    let author = state
        .db
        .get_post_author(&pid)?
        .ok_or_else(|| ApiError::NotFound("post not found".into()))?;

    let comment_id = Uuid::new_v4();
    let me = user.id.to_string();
    let now = chrono::Utc::now();
    let now_str = ripple_db::timestamp(now);

    state
        .db
        .insert_comment(&comment_id.to_string(), &pid, &me, &req.text, &now_str)?;

    if author != me {
        state.db.insert_notification(
            &Uuid::new_v4().to_string(),
            &author,
            &me,
            "comment",
            Some(&pid),
            &now_str,
        )?;
    }

    Ok((
        StatusCode::CREATED,
        Json(CommentResponse {
            id: comment_id,
            text: req.text,
            created_at: now,
            author: UserSummary {
                uid: user.id,
                display_name: user.display_name,
                photo_url: user.photo_url,
            },
        }),
    ))
}

/// Attach liker lists and comment threads to a page of posts. Likes and
/// comments are batch-fetched to keep this at three queries per page.
pub(crate) fn build_post_responses(
    db: &Database,
    rows: Vec<PostRow>,
) -> Result<Vec<PostResponse>, ApiError> {
    let post_ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
    let like_rows = db.likes_for_posts(&post_ids)?;
    let comment_rows = db.comments_for_posts(&post_ids)?;

    let mut like_map: HashMap<String, Vec<Uuid>> = HashMap::new();
    for like in &like_rows {
        like_map
            .entry(like.post_id.clone())
            .or_default()
            .push(crate::parse_id(&like.user_id));
    }

    let mut comment_map: HashMap<String, Vec<CommentResponse>> = HashMap::new();
    for comment in comment_rows {
        let author = UserSummary {
            uid: crate::parse_id(&comment.user_id),
            display_name: comment.author_display_name,
            photo_url: comment.author_photo_url,
        };
        comment_map
            .entry(comment.post_id)
            .or_default()
            .push(CommentResponse {
                id: crate::parse_id(&comment.id),
                text: comment.content,
                created_at: crate::parse_timestamp(&comment.created_at),
                author,
            });
    }

    Ok(rows
        .into_iter()
        .map(|row| PostResponse {
            id: crate::parse_id(&row.id),
            text: row.content,
            image_url: row.image_url,
            created_at: crate::parse_timestamp(&row.created_at),
            author: UserSummary {
                uid: crate::parse_id(&row.user_id),
                display_name: row.author_display_name,
                photo_url: row.author_photo_url,
            },
            likes: like_map.remove(&row.id).unwrap_or_default(),
            comments: comment_map.remove(&row.id).unwrap_or_default(),
        })
        .collect())
}
