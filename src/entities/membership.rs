//! Membership entity - Appartenenza di un utente a una conversazione

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Membership {
    pub user_id: i32,
    pub conversation_id: i32,
}
