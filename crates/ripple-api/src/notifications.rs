use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use uuid::Uuid;

use ripple_types::api::{NotificationResponse, SuccessResponse, UserSummary};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::CurrentUser;

pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = state.db.notifications_for(&user.id.to_string(), 100)?;

    let notifications: Vec<NotificationResponse> = rows
        .into_iter()
        .map(|row| NotificationResponse {
            id: crate::parse_id(&row.id),
            kind: row.kind,
            reference_id: row.reference_id,
            is_read: row.is_read,
            created_at: crate::parse_timestamp(&row.created_at),
            sender: UserSummary {
                uid: crate::parse_id(&row.sender_id),
                display_name: row.sender_display_name,
                photo_url: row.sender_photo_url,
            },
        })
        .collect();

    Ok(Json(notifications))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(notification_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    // Only the owner's rows match; anyone else's id is just not found.
    if !state
        .db
        .mark_notification_read(&notification_id.to_string(), &user.id.to_string())?
    {
        return Err(ApiError::NotFound("notification not found".into()));
    }

    Ok(Json(SuccessResponse { success: true }))
}
