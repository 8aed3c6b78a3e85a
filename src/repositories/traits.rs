//! Common repository traits
//!
//! This module defines the data-access boundary used by the preview assembler
//! and the write operations that feed the live preview channel.

use crate::entities::{Membership, Message, Profile};
use std::future::Future;
use std::time::Duration;

/// Error returned by any store operation
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("store query timed out after {0:?}")]
    Timeout(Duration),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Read-only queries needed to assemble conversation previews
///
/// Every method is a single round trip to the backing store. Futures are `Send`
/// so that an assembler generic over the store can be driven from axum handlers
/// and spawned tasks.
pub trait PreviewStore: Send + Sync {
    /// Lists the conversations the user belongs to
    ///
    /// # Arguments
    /// * `user_id` - Member whose conversations are requested
    ///
    /// # Returns
    /// * `Ok(Vec<Membership>)` - Memberships in store order (can be empty)
    /// * `Err(StoreError)` - Error during reading
    fn list_memberships(
        &self,
        user_id: i32,
    ) -> impl Future<Output = Result<Vec<Membership>, StoreError>> + Send;

    /// Finds the other participant of a two-party conversation
    ///
    /// # Arguments
    /// * `conversation_id` - Conversation to inspect
    /// * `excluding_user_id` - Participant to exclude (the current user)
    ///
    /// # Returns
    /// * `Ok(Some(user_id))` - Counterpart found. Extra rows are ignored.
    /// * `Ok(None)` - No other participant
    /// * `Err(StoreError)` - Error during reading
    fn find_counterpart(
        &self,
        conversation_id: i32,
        excluding_user_id: i32,
    ) -> impl Future<Output = Result<Option<i32>, StoreError>> + Send;

    /// Reads the profile of a user
    fn get_profile(
        &self,
        user_id: i32,
    ) -> impl Future<Output = Result<Option<Profile>, StoreError>> + Send;

    /// Reads the most recent message of a conversation (created_at DESC, limit 1)
    fn get_last_message(
        &self,
        conversation_id: i32,
    ) -> impl Future<Output = Result<Option<Message>, StoreError>> + Send;

    /// Counts unread messages in a conversation not sent by `excluding_sender_id`
    fn count_unread(
        &self,
        conversation_id: i32,
        excluding_sender_id: i32,
    ) -> impl Future<Output = Result<i64, StoreError>> + Send;
}

/// Outcome of `ConversationWriter::start_conversation`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewConversation {
    Created(i32),
    /// A two-party conversation between the same users already existed, nothing was written
    Existing(i32),
}

/// Write operations behind the conversation endpoints
pub trait ConversationWriter: Send + Sync {
    /// Checks if the user is a participant of the conversation
    fn is_member(
        &self,
        user_id: i32,
        conversation_id: i32,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Finds an existing two-party conversation between two users
    fn find_two_party_conversation(
        &self,
        first_user_id: i32,
        second_user_id: i32,
    ) -> impl Future<Output = Result<Option<i32>, StoreError>> + Send;

    /// Creates a conversation with exactly the two given participants, unless one
    /// already exists. Check and insertion are atomic with respect to concurrent calls.
    ///
    /// # Returns
    /// * `Ok(NewConversation::Created(id))` - Id assigned to the new conversation
    /// * `Ok(NewConversation::Existing(id))` - The pair already had a conversation
    /// * `Err(StoreError)` - Error during insertion, nothing is persisted
    fn start_conversation(
        &self,
        first_user_id: i32,
        second_user_id: i32,
    ) -> impl Future<Output = Result<NewConversation, StoreError>> + Send;

    /// Stores a new unread message
    fn send_message(
        &self,
        conversation_id: i32,
        sender_id: i32,
        body: &str,
    ) -> impl Future<Output = Result<Message, StoreError>> + Send;

    /// Marks as read every message of the conversation not sent by `reader_id`
    ///
    /// # Returns
    /// * `Ok(u64)` - Number of messages that changed state
    fn mark_read(
        &self,
        conversation_id: i32,
        reader_id: i32,
    ) -> impl Future<Output = Result<u64, StoreError>> + Send;
}

/// Everything the server needs from a backing store
pub trait ConversationStore: PreviewStore + ConversationWriter + 'static {}

impl<T> ConversationStore for T where T: PreviewStore + ConversationWriter + 'static {}
