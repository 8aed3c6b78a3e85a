//! Profile entity - Attributi di visualizzazione di un utente

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Profile {
    pub user_id: i32,
    // nullable a db, in assenza si usa un'etichetta generica
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}
