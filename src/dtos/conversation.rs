//! Conversation DTOs - Data Transfer Objects per conversazioni

use serde::{Deserialize, Serialize};

/// DTO per avviare una conversazione a due con un altro utente
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct StartConversationDTO {
    pub peer_id: i32,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ConversationDTO {
    pub conversation_id: i32,
    pub participants: Vec<i32>,
}

/// Esito di una marcatura come letti
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MarkReadDTO {
    pub conversation_id: i32,
    pub updated: u64,
}
