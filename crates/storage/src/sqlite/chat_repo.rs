use havamath_core::model::{ChatMessage, MessageId, UserId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, map_message_row, message_id_from_i64, ser, to_i64};
use crate::repository::{ChatRepository, ConversationSummary, NewMessageRecord, StorageError};

#[async_trait::async_trait]
impl ChatRepository for SqliteRepository {
    async fn insert_message(&self, message: NewMessageRecord) -> Result<MessageId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO chat_messages (user_id, sender, body, sent_at)
            VALUES (?1, ?2, ?3, ?4)
            ",
        )
        .bind(message.user_id.as_str())
        .bind(message.sender.as_str())
        .bind(&message.body)
        .bind(message.sent_at)
        .execute(self.pool())
        .await
        .map_err(conn)?;

        message_id_from_i64(res.last_insert_rowid())
    }

    async fn messages_after(
        &self,
        user: &UserId,
        after: Option<MessageId>,
        limit: u32,
    ) -> Result<Vec<ChatMessage>, StorageError> {
        let cursor = match after {
            Some(id) => to_i64("message_id", id.value())?,
            None => 0,
        };
        let rows = sqlx::query(
            r"
            SELECT id, user_id, sender, body, sent_at
            FROM chat_messages
            WHERE user_id = ?1 AND id > ?2
            ORDER BY id ASC
            LIMIT ?3
            ",
        )
        .bind(user.as_str())
        .bind(cursor)
        .bind(i64::from(limit))
        .fetch_all(self.pool())
        .await
        .map_err(conn)?;

        rows.iter().map(map_message_row).collect()
    }

    async fn conversations(&self, limit: u32) -> Result<Vec<ConversationSummary>, StorageError> {
        // Latest message per conversation, newest conversations first.
        let rows = sqlx::query(
            r"
            SELECT m.user_id, m.body, m.sent_at
            FROM chat_messages m
            JOIN (
                SELECT user_id, MAX(id) AS last_id
                FROM chat_messages
                GROUP BY user_id
            ) last ON last.last_id = m.id
            ORDER BY m.id DESC
            LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(self.pool())
        .await
        .map_err(conn)?;

        rows.iter()
            .map(|row| {
                Ok(ConversationSummary {
                    user_id: UserId::new(row.try_get::<String, _>("user_id").map_err(ser)?),
                    last_message_at: row.try_get("sent_at").map_err(ser)?,
                    last_body: row.try_get("body").map_err(ser)?,
                })
            })
            .collect()
    }
}
