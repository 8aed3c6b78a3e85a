//! ConversationPreview - Anteprima derivata di una conversazione (mai persistita)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Etichetta usata quando il profilo della controparte non ha un nome visualizzato
pub const UNKNOWN_DISPLAY_NAME: &str = "Unknown user";

/// Anteprima di una conversazione così come viene mostrata nella lista chat.
///
/// `unread_count` conta solo i messaggi non letti inviati dalla controparte,
/// mai quelli dell'utente corrente.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ConversationPreview {
    pub conversation_id: i32,
    pub counterpart_id: i32,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub last_message: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub unread_count: i64,
}
