//! Message entity - Entità messaggio

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Message {
    pub message_id: i32,
    pub conversation_id: i32,
    pub sender_id: i32,
    pub body: String,
    pub created_at: DateTime<Utc>,
    // colonna `is_read` perchè `read` è una parola riservata in MySQL
    pub is_read: bool,
}
