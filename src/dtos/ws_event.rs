//! WebSocket Event DTOs - Eventi inviati dal feed live delle anteprime

use crate::dtos::ConversationPreviewDTO;
use serde::{Deserialize, Serialize};

/// Tagged union per eventi WebSocket
/// Serde serializza questo come:
/// { "type": "Previews", "data": { "loading": false, "previews": [ ... ] } }
/// oppure
/// { "type": "Error", "data": { "code": 503, "message": "..." } }
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", content = "data")]
pub enum WsEventDTO {
    Previews {
        loading: bool,
        previews: Vec<ConversationPreviewDTO>,
    },
    Error {
        code: u16,
        message: String,
    },
}
