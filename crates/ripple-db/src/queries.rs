use crate::Database;
use crate::models::{
    CommentRow, ConversationSummaryRow, LikeRow, MessageRow, NotificationRow, PostRow, UserRow,
};
use anyhow::Result;
use rusqlite::Connection;

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        id: &str,
        email: &str,
        password_hash: &str,
        display_name: &str,
        now: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, email, password, display_name, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                (id, email, password_hash, display_name, now),
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{USER_COLUMNS} WHERE email = ?1"))?;
            let row = stmt.query_row([email], map_user_row).optional()?;
            Ok(row)
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{USER_COLUMNS} WHERE id = ?1"))?;
            let row = stmt.query_row([id], map_user_row).optional()?;
            Ok(row)
        })
    }

    /// Substring search over display name and email, excluding the
    /// requesting user.
    pub fn search_users(&self, query: &str, exclude_id: &str) -> Result<Vec<UserRow>> {
        let pattern = format!("%{}%", query);
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{USER_COLUMNS}
                 WHERE (display_name LIKE ?1 OR email LIKE ?1) AND id != ?2
                 LIMIT 20"
            ))?;
            let rows = stmt
                .query_map(rusqlite::params![pattern, exclude_id], map_user_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Partial profile update. Only the provided fields are written;
    /// callers reject requests where every field is absent.
    pub fn update_profile(
        &self,
        id: &str,
        display_name: Option<&str>,
        bio: Option<&str>,
        photo_url: Option<&str>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            let mut sets: Vec<&str> = Vec::new();
            let mut params: Vec<&dyn rusqlite::types::ToSql> = Vec::new();

            if let Some(v) = display_name.as_ref() {
                sets.push("display_name = ?");
                params.push(v);
            }
            if let Some(v) = bio.as_ref() {
                sets.push("bio = ?");
                params.push(v);
            }
            if let Some(v) = photo_url.as_ref() {
                sets.push("photo_url = ?");
                params.push(v);
            }

            if sets.is_empty() {
                return Ok(());
            }

            params.push(&id);
            let sql = format!("UPDATE users SET {} WHERE id = ?", sets.join(", "));
            conn.execute(&sql, params.as_slice())?;
            Ok(())
        })
    }

    // -- Follow graph --

    pub fn follower_counts(&self, user_id: &str) -> Result<(i64, i64)> {
        self.with_conn(|conn| {
            let followers: i64 = conn.query_row(
                "SELECT COUNT(*) FROM followers WHERE followed_id = ?1",
                [user_id],
                |row| row.get(0),
            )?;
            let following: i64 = conn.query_row(
                "SELECT COUNT(*) FROM followers WHERE follower_id = ?1",
                [user_id],
                |row| row.get(0),
            )?;
            Ok((followers, following))
        })
    }

    pub fn is_following(&self, follower_id: &str, followed_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let row: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM followers WHERE follower_id = ?1 AND followed_id = ?2",
                    (follower_id, followed_id),
                    |row| row.get(0),
                )
                .optional()?;
            Ok(row.is_some())
        })
    }

    /// Returns false when the follow edge already exists.
    pub fn insert_follow(&self, follower_id: &str, followed_id: &str, now: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let existing: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM followers WHERE follower_id = ?1 AND followed_id = ?2",
                    (follower_id, followed_id),
                    |row| row.get(0),
                )
                .optional()?;
            if existing.is_some() {
                return Ok(false);
            }
            conn.execute(
                "INSERT INTO followers (follower_id, followed_id, created_at) VALUES (?1, ?2, ?3)",
                (follower_id, followed_id, now),
            )?;
            Ok(true)
        })
    }

    /// Returns false when there was no follow edge to remove.
    pub fn delete_follow(&self, follower_id: &str, followed_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let affected = conn.execute(
                "DELETE FROM followers WHERE follower_id = ?1 AND followed_id = ?2",
                (follower_id, followed_id),
            )?;
            Ok(affected > 0)
        })
    }

    pub fn followers_of(&self, user_id: &str) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.id, u.email, u.password, u.display_name, u.photo_url, u.bio, u.created_at
                 FROM users u
                 JOIN followers f ON u.id = f.follower_id
                 WHERE f.followed_id = ?1
                 ORDER BY f.created_at DESC",
            )?;
            let rows = stmt
                .query_map([user_id], map_user_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn following_of(&self, user_id: &str) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.id, u.email, u.password, u.display_name, u.photo_url, u.bio, u.created_at
                 FROM users u
                 JOIN followers f ON u.id = f.followed_id
                 WHERE f.follower_id = ?1
                 ORDER BY f.created_at DESC",
            )?;
            let rows = stmt
                .query_map([user_id], map_user_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Posts --

    pub fn insert_post(
        &self,
        id: &str,
        user_id: &str,
        content: Option<&str>,
        image_url: Option<&str>,
        now: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO posts (id, user_id, content, image_url, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                (id, user_id, content, image_url, now),
            )?;
            Ok(())
        })
    }

    pub fn list_posts(&self, limit: u32) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{POST_COLUMNS} ORDER BY p.created_at DESC LIMIT ?1"))?;
            let rows = stmt
                .query_map([limit], map_post_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn posts_by_user(&self, user_id: &str, limit: u32) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{POST_COLUMNS} WHERE p.user_id = ?1 ORDER BY p.created_at DESC LIMIT ?2"
            ))?;
            let rows = stmt
                .query_map(rusqlite::params![user_id, limit], map_post_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_post_author(&self, post_id: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row("SELECT user_id FROM posts WHERE id = ?1", [post_id], |row| {
                    row.get(0)
                })
                .optional()?;
            Ok(row)
        })
    }

    /// Deletes a post only when it belongs to the given user. Likes and
    /// comments go with it via cascade. Returns false when no row matched.
    pub fn delete_post_owned(&self, post_id: &str, user_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let affected = conn.execute(
                "DELETE FROM posts WHERE id = ?1 AND user_id = ?2",
                (post_id, user_id),
            )?;
            Ok(affected > 0)
        })
    }

    /// Toggle a like: removes if present, inserts if not.
    /// Returns true when the post is now liked by the user.
    pub fn toggle_like(&self, post_id: &str, user_id: &str, now: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let existing: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM likes WHERE post_id = ?1 AND user_id = ?2",
                    (post_id, user_id),
                    |row| row.get(0),
                )
                .optional()?;

            if existing.is_some() {
                conn.execute(
                    "DELETE FROM likes WHERE post_id = ?1 AND user_id = ?2",
                    (post_id, user_id),
                )?;
                Ok(false)
            } else {
                conn.execute(
                    "INSERT INTO likes (post_id, user_id, created_at) VALUES (?1, ?2, ?3)",
                    (post_id, user_id, now),
                )?;
                Ok(true)
            }
        })
    }

    /// Batch-fetch likes for a set of post IDs.
    pub fn likes_for_posts(&self, post_ids: &[String]) -> Result<Vec<LikeRow>> {
        if post_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> = (1..=post_ids.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT post_id, user_id FROM likes WHERE post_id IN ({})",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn rusqlite::types::ToSql> = post_ids
                .iter()
                .map(|id| id as &dyn rusqlite::types::ToSql)
                .collect();

            let rows = stmt
                .query_map(params.as_slice(), |row| {
                    Ok(LikeRow {
                        post_id: row.get(0)?,
                        user_id: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Batch-fetch comments for a set of post IDs, oldest first.
    pub fn comments_for_posts(&self, post_ids: &[String]) -> Result<Vec<CommentRow>> {
        if post_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> = (1..=post_ids.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT c.id, c.post_id, c.user_id, c.content, c.created_at,
                        u.display_name, u.photo_url
                 FROM comments c
                 JOIN users u ON c.user_id = u.id
                 WHERE c.post_id IN ({})
                 ORDER BY c.created_at ASC",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn rusqlite::types::ToSql> = post_ids
                .iter()
                .map(|id| id as &dyn rusqlite::types::ToSql)
                .collect();

            let rows = stmt
                .query_map(params.as_slice(), |row| {
                    Ok(CommentRow {
                        id: row.get(0)?,
                        post_id: row.get(1)?,
                        user_id: row.get(2)?,
                        content: row.get(3)?,
                        created_at: row.get(4)?,
                        author_display_name: row.get(5)?,
                        author_photo_url: row.get(6)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    pub fn insert_comment(
        &self,
        id: &str,
        post_id: &str,
        user_id: &str,
        content: &str,
        now: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO comments (id, post_id, user_id, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                (id, post_id, user_id, content, now),
            )?;
            Ok(())
        })
    }

    // -- Conversations & messages --

    /// Lookup only, used by the fetch path: no conversation is created
    /// and last-activity is not touched.
    pub fn find_conversation(&self, user_a: &str, user_b: &str) -> Result<Option<String>> {
        self.with_conn(|conn| query_conversation_id(conn, user_a, user_b))
    }

    /// Resolve the conversation for an unordered user pair on the send
    /// path: reuse the existing row (bumping last-activity) or insert a
    /// new one under `new_id` with both timestamps set to now.
    pub fn resolve_conversation(
        &self,
        new_id: &str,
        user_a: &str,
        user_b: &str,
        now: &str,
    ) -> Result<String> {
        self.with_conn(|conn| {
            if let Some(id) = query_conversation_id(conn, user_a, user_b)? {
                conn.execute("UPDATE conversations SET updated_at = ?1 WHERE id = ?2", (now, &id))?;
                return Ok(id);
            }

            conn.execute(
                "INSERT INTO conversations (id, user1_id, user2_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                (new_id, user_a, user_b, now),
            )?;
            Ok(new_id.to_string())
        })
    }

    pub fn insert_message(
        &self,
        id: &str,
        conversation_id: &str,
        sender_id: &str,
        content: &str,
        now: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (id, conversation_id, sender_id, content, is_read, created_at)
                 VALUES (?1, ?2, ?3, ?4, 0, ?5)",
                (id, conversation_id, sender_id, content, now),
            )?;
            Ok(())
        })
    }

    /// Flip every unread message in the conversation that was authored by
    /// the counterpart. The reader's own messages are never touched; the
    /// transition is one-directional. Returns the number of rows flipped.
    pub fn mark_messages_read(&self, conversation_id: &str, reader_id: &str) -> Result<usize> {
        self.with_conn(|conn| {
            let affected = conn.execute(
                "UPDATE messages SET is_read = 1
                 WHERE conversation_id = ?1 AND sender_id != ?2 AND is_read = 0",
                (conversation_id, reader_id),
            )?;
            Ok(affected)
        })
    }

    pub fn messages_in_conversation(&self, conversation_id: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT m.id, m.conversation_id, m.sender_id, m.content, m.is_read, m.created_at,
                        u.display_name, u.photo_url
                 FROM messages m
                 JOIN users u ON m.sender_id = u.id
                 WHERE m.conversation_id = ?1
                 ORDER BY m.created_at ASC",
            )?;
            let rows = stmt
                .query_map([conversation_id], |row| {
                    Ok(MessageRow {
                        id: row.get(0)?,
                        conversation_id: row.get(1)?,
                        sender_id: row.get(2)?,
                        content: row.get(3)?,
                        is_read: row.get(4)?,
                        created_at: row.get(5)?,
                        sender_display_name: row.get(6)?,
                        sender_photo_url: row.get(7)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_message_sender(&self, message_id: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT sender_id FROM messages WHERE id = ?1",
                    [message_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(row)
        })
    }

    /// Hard delete, no tombstone. Ownership is checked by the caller.
    pub fn delete_message(&self, message_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM messages WHERE id = ?1", [message_id])?;
            Ok(())
        })
    }

    /// One row per conversation the user participates in, newest activity
    /// first. The counterpart is whichever participant column is not the
    /// requesting user.
    pub fn conversation_summaries(&self, user_id: &str) -> Result<Vec<ConversationSummaryRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.id, u.id, u.display_name, u.photo_url,
                        (SELECT content FROM messages
                          WHERE conversation_id = c.id
                          ORDER BY created_at DESC LIMIT 1) AS last_message,
                        (SELECT sender_id FROM messages
                          WHERE conversation_id = c.id
                          ORDER BY created_at DESC LIMIT 1) AS last_sender_id,
                        (SELECT created_at FROM messages
                          WHERE conversation_id = c.id
                          ORDER BY created_at DESC LIMIT 1) AS last_message_at,
                        (SELECT COUNT(*) FROM messages
                          WHERE conversation_id = c.id AND is_read = 0 AND sender_id != ?1)
                            AS unread_count
                 FROM conversations c
                 JOIN users u ON (c.user1_id = ?1 AND c.user2_id = u.id)
                              OR (c.user2_id = ?1 AND c.user1_id = u.id)
                 ORDER BY c.updated_at DESC",
            )?;
            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(ConversationSummaryRow {
                        id: row.get(0)?,
                        other_user_id: row.get(1)?,
                        other_display_name: row.get(2)?,
                        other_photo_url: row.get(3)?,
                        last_message: row.get(4)?,
                        last_sender_id: row.get(5)?,
                        last_message_at: row.get(6)?,
                        unread_count: row.get(7)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Notifications --

    pub fn insert_notification(
        &self,
        id: &str,
        user_id: &str,
        sender_id: &str,
        kind: &str,
        reference_id: Option<&str>,
        now: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO notifications (id, user_id, sender_id, kind, reference_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                (id, user_id, sender_id, kind, reference_id, now),
            )?;
            Ok(())
        })
    }

    pub fn notifications_for(&self, user_id: &str, limit: u32) -> Result<Vec<NotificationRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT n.id, n.kind, n.reference_id, n.is_read, n.created_at,
                        u.id, u.display_name, u.photo_url
                 FROM notifications n
                 JOIN users u ON n.sender_id = u.id
                 WHERE n.user_id = ?1
                 ORDER BY n.created_at DESC
                 LIMIT ?2",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![user_id, limit], |row| {
                    Ok(NotificationRow {
                        id: row.get(0)?,
                        kind: row.get(1)?,
                        reference_id: row.get(2)?,
                        is_read: row.get(3)?,
                        created_at: row.get(4)?,
                        sender_id: row.get(5)?,
                        sender_display_name: row.get(6)?,
                        sender_photo_url: row.get(7)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Marks a notification read only when it belongs to the given user.
    /// Returns false when no row matched.
    pub fn mark_notification_read(&self, notification_id: &str, user_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let affected = conn.execute(
                "UPDATE notifications SET is_read = 1 WHERE id = ?1 AND user_id = ?2",
                (notification_id, user_id),
            )?;
            Ok(affected > 0)
        })
    }
}

const USER_COLUMNS: &str =
    "SELECT id, email, password, display_name, photo_url, bio, created_at FROM users";

const POST_COLUMNS: &str = "SELECT p.id, p.user_id, p.content, p.image_url, p.created_at,
            u.display_name, u.photo_url
     FROM posts p
     JOIN users u ON p.user_id = u.id";

fn map_user_row(row: &rusqlite::Row) -> std::result::Result<UserRow, rusqlite::Error> {
    Ok(UserRow {
        id: row.get(0)?,
        email: row.get(1)?,
        password: row.get(2)?,
        display_name: row.get(3)?,
        photo_url: row.get(4)?,
        bio: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn map_post_row(row: &rusqlite::Row) -> std::result::Result<PostRow, rusqlite::Error> {
    Ok(PostRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        content: row.get(2)?,
        image_url: row.get(3)?,
        created_at: row.get(4)?,
        author_display_name: row.get(5)?,
        author_photo_url: row.get(6)?,
    })
}

/// The pair is unordered at the application level, so the lookup checks
/// both participant orderings. Nothing canonicalizes the columns at
/// write time.
fn query_conversation_id(conn: &Connection, user_a: &str, user_b: &str) -> Result<Option<String>> {
    let row = conn
        .query_row(
            "SELECT id FROM conversations
             WHERE (user1_id = ?1 AND user2_id = ?2) OR (user1_id = ?2 AND user2_id = ?1)",
            (user_a, user_b),
            |row| row.get(0),
        )
        .optional()?;
    Ok(row)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::Database;

    fn ts(n: u32) -> String {
        format!("2026-01-01T00:{:02}:{:02}.000000Z", n / 60, n % 60)
    }

    fn db_with_users(names: &[&str]) -> Database {
        let db = Database::open_in_memory().unwrap();
        for (i, name) in names.iter().enumerate() {
            db.create_user(
                name,
                &format!("{}@example.com", name),
                "hash",
                name,
                &ts(i as u32),
            )
            .unwrap();
        }
        db
    }

    #[test]
    fn conversation_is_reused_for_both_orderings() {
        let db = db_with_users(&["alice", "bob"]);

        let id = db.resolve_conversation("c1", "alice", "bob", &ts(10)).unwrap();
        assert_eq!(id, "c1");

        // Reversed pair must hit the same row, not insert a second one.
        let id2 = db.resolve_conversation("c2", "bob", "alice", &ts(11)).unwrap();
        assert_eq!(id2, "c1");

        let count: i64 = db
            .with_conn(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM conversations", [], |r| r.get(0))?)
            })
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn fetch_path_never_creates_a_conversation() {
        let db = db_with_users(&["alice", "bob"]);

        assert!(db.find_conversation("alice", "bob").unwrap().is_none());

        let count: i64 = db
            .with_conn(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM conversations", [], |r| r.get(0))?)
            })
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn unread_count_drains_on_mark_read() {
        let db = db_with_users(&["alice", "bob"]);
        let conv = db.resolve_conversation("c1", "alice", "bob", &ts(10)).unwrap();
        db.insert_message("m1", &conv, "alice", "hi", &ts(11)).unwrap();
        db.insert_message("m2", &conv, "alice", "you there?", &ts(12)).unwrap();

        let summaries = db.conversation_summaries("bob").unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].unread_count, 2);
        assert_eq!(summaries[0].other_user_id, "alice");
        assert_eq!(summaries[0].last_message.as_deref(), Some("you there?"));

        let flipped = db.mark_messages_read(&conv, "bob").unwrap();
        assert_eq!(flipped, 2);

        let summaries = db.conversation_summaries("bob").unwrap();
        assert_eq!(summaries[0].unread_count, 0);

        // Second pass is a no-op: the transition is one-directional.
        assert_eq!(db.mark_messages_read(&conv, "bob").unwrap(), 0);
    }

    #[test]
    fn mark_read_leaves_readers_own_messages_unread() {
        let db = db_with_users(&["alice", "bob"]);
        let conv = db.resolve_conversation("c1", "alice", "bob", &ts(10)).unwrap();
        db.insert_message("m1", &conv, "alice", "hi", &ts(11)).unwrap();
        db.insert_message("m2", &conv, "bob", "hello", &ts(12)).unwrap();

        // Alice fetches: only bob's message flips.
        db.mark_messages_read(&conv, "alice").unwrap();

        let messages = db.messages_in_conversation(&conv).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].id, "m1");
        assert!(!messages[0].is_read, "alice's own message must stay unread");
        assert!(messages[1].is_read);
    }

    #[test]
    fn summaries_follow_last_activity() {
        let db = db_with_users(&["alice", "bob", "carol"]);
        db.resolve_conversation("c-ab", "alice", "bob", &ts(10)).unwrap();
        db.resolve_conversation("c-ac", "alice", "carol", &ts(20)).unwrap();

        let summaries = db.conversation_summaries("alice").unwrap();
        assert_eq!(summaries[0].id, "c-ac");
        assert_eq!(summaries[1].id, "c-ab");
        // No messages yet: the last-message block is absent, not empty.
        assert!(summaries[0].last_message.is_none());
        assert!(summaries[0].last_message_at.is_none());

        // A new message in the older conversation moves it to the top.
        db.resolve_conversation("ignored", "bob", "alice", &ts(30)).unwrap();
        db.insert_message("m1", "c-ab", "bob", "ping", &ts(30)).unwrap();

        let summaries = db.conversation_summaries("alice").unwrap();
        assert_eq!(summaries[0].id, "c-ab");
        assert_eq!(summaries[0].last_sender_id.as_deref(), Some("bob"));
        assert_eq!(summaries[0].unread_count, 1);
    }

    #[test]
    fn deleted_message_is_gone() {
        let db = db_with_users(&["alice", "bob"]);
        let conv = db.resolve_conversation("c1", "alice", "bob", &ts(10)).unwrap();
        db.insert_message("m1", &conv, "alice", "oops", &ts(11)).unwrap();

        assert_eq!(db.get_message_sender("m1").unwrap().as_deref(), Some("alice"));
        db.delete_message("m1").unwrap();
        assert!(db.get_message_sender("m1").unwrap().is_none());
        assert!(db.messages_in_conversation(&conv).unwrap().is_empty());
    }

    #[test]
    fn removing_a_user_cascades_into_conversations() {
        let db = db_with_users(&["alice", "bob"]);
        let conv = db.resolve_conversation("c1", "alice", "bob", &ts(10)).unwrap();
        db.insert_message("m1", &conv, "alice", "hi", &ts(11)).unwrap();

        db.with_conn(|conn| {
            conn.execute("DELETE FROM users WHERE id = ?1", ["alice"])?;
            Ok(())
        })
        .unwrap();

        let conversations: i64 = db
            .with_conn(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM conversations", [], |r| r.get(0))?)
            })
            .unwrap();
        let messages: i64 = db
            .with_conn(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM messages", [], |r| r.get(0))?)
            })
            .unwrap();
        assert_eq!(conversations, 0);
        assert_eq!(messages, 0);
    }

    #[test]
    fn toggle_like_inserts_then_removes() {
        let db = db_with_users(&["alice"]);
        db.insert_post("p1", "alice", Some("first"), None, &ts(10)).unwrap();

        assert!(db.toggle_like("p1", "alice", &ts(11)).unwrap());
        assert!(!db.toggle_like("p1", "alice", &ts(12)).unwrap());
        assert!(db.likes_for_posts(&["p1".to_string()]).unwrap().is_empty());
    }

    #[test]
    fn follow_edges_are_unique() {
        let db = db_with_users(&["alice", "bob"]);

        assert!(db.insert_follow("alice", "bob", &ts(10)).unwrap());
        assert!(!db.insert_follow("alice", "bob", &ts(11)).unwrap());
        assert_eq!(db.follower_counts("bob").unwrap(), (1, 0));
        assert!(db.is_following("alice", "bob").unwrap());

        assert!(db.delete_follow("alice", "bob").unwrap());
        assert!(!db.delete_follow("alice", "bob").unwrap());
    }

    #[test]
    fn search_skips_the_requester() {
        let db = db_with_users(&["alice", "alina", "bob"]);

        let hits = db.search_users("ali", "alice").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "alina");
    }

    #[test]
    fn profile_update_is_partial() {
        let db = db_with_users(&["alice"]);

        db.update_profile("alice", None, Some("hello"), None).unwrap();
        let user = db.get_user_by_id("alice").unwrap().unwrap();
        assert_eq!(user.display_name, "alice");
        assert_eq!(user.bio.as_deref(), Some("hello"));
    }
}
