//! Preview DTOs - Forma esposta ai client delle anteprime

use crate::entities::ConversationPreview;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Anteprima pronta per la lista chat: `last_message` vale "" se la conversazione
/// non ha messaggi, `last_message_time` è già formattato per la visualizzazione.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ConversationPreviewDTO {
    pub conversation_id: i32,
    pub counterpart_id: i32,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub last_message: String,
    pub last_message_at: Option<DateTime<Utc>>,
    pub last_message_time: Option<String>,
    pub unread_count: i64,
}

impl ConversationPreviewDTO {
    pub fn from_preview(value: ConversationPreview, now: DateTime<Utc>) -> Self {
        Self {
            conversation_id: value.conversation_id,
            counterpart_id: value.counterpart_id,
            display_name: value.display_name,
            avatar_url: value.avatar_url,
            last_message: value.last_message.unwrap_or_default(),
            last_message_time: value.last_message_at.map(|at| format_message_time(at, now)),
            last_message_at: value.last_message_at,
            unread_count: value.unread_count,
        }
    }

    /// Converte una lista mantenendone l'ordine
    pub fn from_previews(values: Vec<ConversationPreview>) -> Vec<Self> {
        let now = Utc::now();
        values
            .into_iter()
            .map(|p| Self::from_preview(p, now))
            .collect()
    }
}

impl From<ConversationPreview> for ConversationPreviewDTO {
    fn from(value: ConversationPreview) -> Self {
        Self::from_preview(value, Utc::now())
    }
}

/// `HH:MM` per i messaggi del giorno corrente (UTC), `DD/MM/YYYY` altrimenti
pub fn format_message_time(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    if at.date_naive() == now.date_naive() {
        at.format("%H:%M").to_string()
    } else {
        at.format("%d/%m/%Y").to_string()
    }
}
