//! Message DTOs - Data Transfer Objects per messaggi

use crate::entities::Message;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Struct per gestire io col client
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MessageDTO {
    pub message_id: i32,
    pub conversation_id: i32,
    pub sender_id: i32,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub is_read: bool,
}

impl From<Message> for MessageDTO {
    fn from(value: Message) -> Self {
        Self {
            message_id: value.message_id,
            conversation_id: value.conversation_id,
            sender_id: value.sender_id,
            body: value.body,
            created_at: value.created_at,
            is_read: value.is_read,
        }
    }
}

/// DTO per inviare un nuovo messaggio (conversazione e mittente arrivano da path e sessione)
#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
pub struct SendMessageDTO {
    #[validate(length(min = 1, max = 5000, message = "Message body must be between 1 and 5000 characters"))]
    pub body: String,
}
