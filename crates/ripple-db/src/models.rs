/// Database row types — these map directly to SQLite rows.
/// Distinct from the ripple-types API models to keep the DB layer
/// independent of the wire format.

pub struct UserRow {
    pub id: String,
    pub email: String,
    pub password: String,
    pub display_name: String,
    pub photo_url: Option<String>,
    pub bio: Option<String>,
    pub created_at: String,
}

pub struct PostRow {
    pub id: String,
    pub user_id: String,
    pub content: Option<String>,
    pub image_url: Option<String>,
    pub created_at: String,
    pub author_display_name: String,
    pub author_photo_url: Option<String>,
}

pub struct LikeRow {
    pub post_id: String,
    pub user_id: String,
}

pub struct CommentRow {
    pub id: String,
    pub post_id: String,
    pub user_id: String,
    pub content: String,
    pub created_at: String,
    pub author_display_name: String,
    pub author_photo_url: Option<String>,
}

pub struct MessageRow {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub content: String,
    pub is_read: bool,
    pub created_at: String,
    pub sender_display_name: String,
    pub sender_photo_url: Option<String>,
}

/// One row per conversation the user participates in, as produced by
/// `conversation_summaries`. The last_* columns are NULL when the
/// conversation has no messages yet.
pub struct ConversationSummaryRow {
    pub id: String,
    pub other_user_id: String,
    pub other_display_name: String,
    pub other_photo_url: Option<String>,
    pub last_message: Option<String>,
    pub last_sender_id: Option<String>,
    pub last_message_at: Option<String>,
    pub unread_count: i64,
}

pub struct NotificationRow {
    pub id: String,
    pub kind: String,
    pub reference_id: Option<String>,
    pub is_read: bool,
    pub created_at: String,
    pub sender_id: String,
    pub sender_display_name: String,
    pub sender_photo_url: Option<String>,
}
