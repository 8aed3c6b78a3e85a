//! SqlStore - Implementazione MySQL dei confini di accesso ai dati
//!
//! Compone i repository per tabella e li espone tramite `PreviewStore` e
//! `ConversationWriter`, convertendo gli errori di sqlx in `StoreError`.

use super::{
    ConversationWriter, MembershipRepository, MessageRepository, NewConversation, PreviewStore,
    ProfileRepository, StoreError,
};
use crate::entities::{Membership, Message, Profile};
use sqlx::MySqlPool;

pub struct SqlStore {
    /// Repository per la tabella `chat_participants`
    pub membership: MembershipRepository,

    /// Repository per la tabella `profiles`
    pub profile: ProfileRepository,

    /// Repository per la tabella `messages`
    pub msg: MessageRepository,
}

impl SqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self {
            membership: MembershipRepository::new(pool.clone()),
            profile: ProfileRepository::new(pool.clone()),
            msg: MessageRepository::new(pool),
        }
    }
}

impl PreviewStore for SqlStore {
    async fn list_memberships(&self, user_id: i32) -> Result<Vec<Membership>, StoreError> {
        Ok(self.membership.find_many_by_user_id(&user_id).await?)
    }

    async fn find_counterpart(
        &self,
        conversation_id: i32,
        excluding_user_id: i32,
    ) -> Result<Option<i32>, StoreError> {
        Ok(self
            .membership
            .find_counterpart(&conversation_id, &excluding_user_id)
            .await?)
    }

    async fn get_profile(&self, user_id: i32) -> Result<Option<Profile>, StoreError> {
        Ok(self.profile.read(&user_id).await?)
    }

    async fn get_last_message(&self, conversation_id: i32) -> Result<Option<Message>, StoreError> {
        Ok(self.msg.find_last_by_conversation_id(&conversation_id).await?)
    }

    async fn count_unread(
        &self,
        conversation_id: i32,
        excluding_sender_id: i32,
    ) -> Result<i64, StoreError> {
        Ok(self
            .msg
            .count_unread(&conversation_id, &excluding_sender_id)
            .await?)
    }
}

impl ConversationWriter for SqlStore {
    async fn is_member(&self, user_id: i32, conversation_id: i32) -> Result<bool, StoreError> {
        Ok(self
            .membership
            .is_user_member(&user_id, &conversation_id)
            .await?)
    }

    async fn find_two_party_conversation(
        &self,
        first_user_id: i32,
        second_user_id: i32,
    ) -> Result<Option<i32>, StoreError> {
        Ok(self
            .membership
            .find_two_party_conversation(&first_user_id, &second_user_id)
            .await?)
    }

    async fn start_conversation(
        &self,
        first_user_id: i32,
        second_user_id: i32,
    ) -> Result<NewConversation, StoreError> {
        Ok(self
            .membership
            .create_two_party(&first_user_id, &second_user_id)
            .await?)
    }

    async fn send_message(
        &self,
        conversation_id: i32,
        sender_id: i32,
        body: &str,
    ) -> Result<Message, StoreError> {
        Ok(self.msg.create(&conversation_id, &sender_id, body).await?)
    }

    async fn mark_read(&self, conversation_id: i32, reader_id: i32) -> Result<u64, StoreError> {
        Ok(self.msg.mark_read(&conversation_id, &reader_id).await?)
    }
}
