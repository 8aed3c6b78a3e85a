//! MembershipRepository - Repository per la tabella `chat_participants`

use super::NewConversation;
use crate::entities::Membership;
use sqlx::{Error, MySqlPool};
use tracing::{debug, info, instrument};

/// Conversazioni con esattamente due partecipanti, entrambi tra quelli indicati
const TWO_PARTY_QUERY: &str = r#"
    SELECT cp.conversation_id
    FROM chat_participants cp
    GROUP BY cp.conversation_id
    HAVING COUNT(*) = 2
       AND SUM(cp.user_id IN (?, ?)) = 2
    ORDER BY cp.conversation_id
    LIMIT 1
"#;

// MEMBERSHIP REPO
pub struct MembershipRepository {
    connection_pool: MySqlPool,
}

impl MembershipRepository {
    pub fn new(connection_pool: MySqlPool) -> Self {
        Self { connection_pool }
    }

    /// Get all conversations a user participates in
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn find_many_by_user_id(&self, user_id: &i32) -> Result<Vec<Membership>, Error> {
        let memberships = sqlx::query_as::<_, Membership>(
            r#"
            SELECT user_id, conversation_id
            FROM chat_participants
            WHERE user_id = ?
            ORDER BY conversation_id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.connection_pool)
        .await?;

        debug!("User has {} memberships", memberships.len());
        Ok(memberships)
    }

    /// Get the other participant of a conversation
    ///
    /// Two-party conversations are expected; extra rows are ignored.
    #[instrument(skip(self), fields(conversation_id = %conversation_id))]
    pub async fn find_counterpart(
        &self,
        conversation_id: &i32,
        excluding_user_id: &i32,
    ) -> Result<Option<i32>, Error> {
        let counterpart = sqlx::query_scalar::<_, i32>(
            r#"
            SELECT user_id
            FROM chat_participants
            WHERE conversation_id = ? AND user_id <> ?
            ORDER BY user_id ASC
            LIMIT 1
            "#,
        )
        .bind(conversation_id)
        .bind(excluding_user_id)
        .fetch_optional(&self.connection_pool)
        .await?;

        Ok(counterpart)
    }

    /// Check if user is participant of conversation
    pub async fn is_user_member(&self, user_id: &i32, conversation_id: &i32) -> Result<bool, Error> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM chat_participants WHERE user_id = ? AND conversation_id = ?",
        )
        .bind(user_id)
        .bind(conversation_id)
        .fetch_one(&self.connection_pool)
        .await?;

        Ok(count > 0)
    }

    /// Find a conversation whose only participants are the two given users
    #[instrument(skip(self))]
    pub async fn find_two_party_conversation(
        &self,
        user1_id: &i32,
        user2_id: &i32,
    ) -> Result<Option<i32>, Error> {
        debug!("Finding two-party conversation between users");
        let conversation_id = sqlx::query_scalar::<_, i32>(TWO_PARTY_QUERY)
            .bind(user1_id)
            .bind(user2_id)
            .fetch_optional(&self.connection_pool)
            .await?;

        if conversation_id.is_some() {
            info!("Two-party conversation found");
        }
        Ok(conversation_id)
    }

    /// Create a conversation and both participant rows in a single transaction,
    /// unless the two users already share one.
    ///
    /// The profile rows of both users are locked (in id order) before the check, so
    /// concurrent requests for the same pair are serialized.
    #[instrument(skip(self))]
    pub async fn create_two_party(
        &self,
        user1_id: &i32,
        user2_id: &i32,
    ) -> Result<NewConversation, Error> {
        // Start a transaction for atomicity
        let mut tx = self.connection_pool.begin().await?;

        sqlx::query("SELECT id FROM profiles WHERE id IN (?, ?) ORDER BY id FOR UPDATE")
            .bind(user1_id)
            .bind(user2_id)
            .fetch_all(&mut *tx)
            .await?;

        if let Some(existing) = sqlx::query_scalar::<_, i32>(TWO_PARTY_QUERY)
            .bind(user1_id)
            .bind(user2_id)
            .fetch_optional(&mut *tx)
            .await?
        {
            tx.rollback().await?;
            info!("Two-party conversation already exists with id {}", existing);
            return Ok(NewConversation::Existing(existing));
        }

        let result = sqlx::query("INSERT INTO conversations (created_at) VALUES (UTC_TIMESTAMP())")
            .execute(&mut *tx)
            .await?;
        let conversation_id = result.last_insert_id() as i32;

        sqlx::query(
            "INSERT INTO chat_participants (conversation_id, user_id) VALUES (?, ?), (?, ?)",
        )
        .bind(conversation_id)
        .bind(user1_id)
        .bind(conversation_id)
        .bind(user2_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!("Conversation created with id {}", conversation_id);
        Ok(NewConversation::Created(conversation_id))
    }
}
