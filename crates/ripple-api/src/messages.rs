use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::error;
use uuid::Uuid;

use ripple_db::models::MessageRow;
use ripple_types::api::{
    ConversationResponse, LastMessage, MessageResponse, SendMessageRequest, SuccessResponse,
    UserSummary,
};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::CurrentUser;

/// One row per conversation the requesting user participates in, newest
/// activity first. Read-only: listing never touches read flags.
pub async fn list_conversations(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    // Run the blocking aggregation off the async runtime
    let db = state.clone();
    let me = user.id.to_string();
    let rows = tokio::task::spawn_blocking(move || db.db.conversation_summaries(&me))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow::anyhow!("task join failed"))
        })??;

    let conversations: Vec<ConversationResponse> = rows
        .into_iter()
        .map(|row| {
            let last_message = row.last_message.map(|text| LastMessage {
                text,
                sender_id: row.last_sender_id.as_deref().map(crate::parse_id),
                timestamp: row.last_message_at.as_deref().map(crate::parse_timestamp),
            });

            ConversationResponse {
                id: crate::parse_id(&row.id),
                other_user: UserSummary {
                    uid: crate::parse_id(&row.other_user_id),
                    display_name: row.other_display_name,
                    photo_url: row.other_photo_url,
                },
                last_message,
                unread_count: row.unread_count,
            }
        })
        .collect();

    Ok(Json(conversations))
}

/// Fetch the message history with another user. No conversation yet is an
/// empty list, never an error — only sending creates conversations.
///
/// Fetching is also the read receipt: every unread message authored by
/// the counterpart is flipped before the select, so this response already
/// shows the final state for the fetching user's own view. The sender
/// discovers the flip on their next poll.
pub async fn fetch_messages(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(other_user_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let me = user.id.to_string();
    let other = other_user_id.to_string();

    let rows = tokio::task::spawn_blocking(move || -> anyhow::Result<Vec<MessageRow>> {
        let Some(conversation) = db.db.find_conversation(&me, &other)? else {
            return Ok(Vec::new());
        };

        db.db.mark_messages_read(&conversation, &me)?;
        db.db.messages_in_conversation(&conversation)
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal(anyhow::anyhow!("task join failed"))
    })??;

    let messages: Vec<MessageResponse> = rows.into_iter().map(message_response).collect();

    Ok(Json(messages))
}

/// Append a message, lazily resolving the conversation for the pair and
/// bumping its last-activity stamp.
pub async fn send_message(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(other_user_id): Path<Uuid>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.content.trim().is_empty() {
        return Err(ApiError::BadRequest("message cannot be empty".into()));
    }

    let message_id = Uuid::new_v4();
    let conversation_id = Uuid::new_v4();
    let now = chrono::Utc::now();

    let db = state.clone();
    let me = user.id.to_string();
    let recipient = other_user_id.to_string();
    let mid = message_id.to_string();
    let cid = conversation_id.to_string();
    let body = req.content.clone();
    let now_str = ripple_db::timestamp(now);

    tokio::task::spawn_blocking(move || -> Result<(), ApiError> {
        if db.db.get_user_by_id(&recipient)?.is_none() {
            return Err(ApiError::NotFound("recipient not found".into()));
        }

        let conversation = db.db.resolve_conversation(&cid, &me, &recipient, &now_str)?;
        db.db.insert_message(&mid, &conversation, &me, &body, &now_str)?;
        Ok(())
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal(anyhow::anyhow!("task join failed"))
    })??;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            id: message_id,
            text: req.content,
            sender_id: user.id,
            read: false,
            created_at: now,
            author: UserSummary {
                uid: user.id,
                display_name: user.display_name,
                photo_url: user.photo_url,
            },
        }),
    ))
}

/// Hard delete, sender only. The ownership check distinguishes a missing
/// message (404) from someone else's (403) before the row is removed.
pub async fn delete_message(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(message_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mid = message_id.to_string();

    let sender = state
        .db
        .get_message_sender(&mid)?
        .ok_or_else(|| ApiError::NotFound("message not found".into()))?;

    if sender != user.id.to_string() {
        return Err(ApiError::Forbidden(
            "you cannot delete this message".into(),
        ));
    }

    state.db.delete_message(&mid)?;

    Ok(Json(SuccessResponse { success: true }))
}

fn message_response(row: MessageRow) -> MessageResponse {
    MessageResponse {
        id: crate::parse_id(&row.id),
        sender_id: crate::parse_id(&row.sender_id),
        read: row.is_read,
        created_at: crate::parse_timestamp(&row.created_at),
        author: UserSummary {
            uid: crate::parse_id(&row.sender_id),
            display_name: row.sender_display_name,
            photo_url: row.sender_photo_url,
        },
        text: row.content,
    }
}
