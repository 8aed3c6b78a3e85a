//! MessageRepository - Repository per la gestione dei messaggi

use crate::entities::Message;
use chrono::{DateTime, SubsecRound, Utc};
use sqlx::{Error, MySqlPool};
use tracing::{debug, instrument};

// MESSAGE REPO
pub struct MessageRepository {
    connection_pool: MySqlPool,
}

impl MessageRepository {
    pub fn new(connection_pool: MySqlPool) -> Self {
        Self { connection_pool }
    }

    /// Get the most recent message of a conversation
    #[instrument(skip(self), fields(conversation_id = %conversation_id))]
    pub async fn find_last_by_conversation_id(
        &self,
        conversation_id: &i32,
    ) -> Result<Option<Message>, Error> {
        let message = sqlx::query_as::<_, Message>(
            r#"
            SELECT
                id AS message_id,
                conversation_id,
                sender_id,
                body,
                created_at,
                is_read
            FROM messages
            WHERE conversation_id = ?
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(conversation_id)
        .fetch_optional(&self.connection_pool)
        .await?;

        Ok(message)
    }

    /// Count unread messages of a conversation sent by anyone but `excluding_sender_id`
    #[instrument(skip(self), fields(conversation_id = %conversation_id))]
    pub async fn count_unread(
        &self,
        conversation_id: &i32,
        excluding_sender_id: &i32,
    ) -> Result<i64, Error> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM messages
            WHERE conversation_id = ? AND is_read = FALSE AND sender_id <> ?
            "#,
        )
        .bind(conversation_id)
        .bind(excluding_sender_id)
        .fetch_one(&self.connection_pool)
        .await?;

        Ok(count)
    }

    /// Insert a new unread message
    #[instrument(skip(self, body), fields(conversation_id = %conversation_id))]
    pub async fn create(
        &self,
        conversation_id: &i32,
        sender_id: &i32,
        body: &str,
    ) -> Result<Message, Error> {
        // la colonna DATETIME tronca ai secondi, teniamo lo stesso valore anche in memoria
        let created_at: DateTime<Utc> = Utc::now().trunc_subsecs(0);
        let result = sqlx::query(
            r#"
            INSERT INTO messages (conversation_id, sender_id, body, created_at, is_read)
            VALUES (?, ?, ?, ?, FALSE)
            "#,
        )
        .bind(conversation_id)
        .bind(sender_id)
        .bind(body)
        .bind(created_at)
        .execute(&self.connection_pool)
        .await?;

        // Get the last inserted ID
        let new_id = result.last_insert_id() as i32;
        debug!("Message created with id {}", new_id);

        Ok(Message {
            message_id: new_id,
            conversation_id: *conversation_id,
            sender_id: *sender_id,
            body: body.to_string(),
            created_at,
            is_read: false,
        })
    }

    /// Mark as read all messages of a conversation not sent by `reader_id`
    #[instrument(skip(self), fields(conversation_id = %conversation_id))]
    pub async fn mark_read(&self, conversation_id: &i32, reader_id: &i32) -> Result<u64, Error> {
        let result = sqlx::query(
            r#"
            UPDATE messages
            SET is_read = TRUE
            WHERE conversation_id = ? AND sender_id <> ? AND is_read = FALSE
            "#,
        )
        .bind(conversation_id)
        .bind(reader_id)
        .execute(&self.connection_pool)
        .await?;

        Ok(result.rows_affected())
    }
}
