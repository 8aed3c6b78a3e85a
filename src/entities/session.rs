//! Session entity - Identità dell'utente corrente

use serde::{Deserialize, Serialize};

/// Sessione autenticata, ricavata dai claims del token JWT.
/// Il componente la legge soltanto: viene stabilita dal provider di identità esterno.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Session {
    pub user_id: i32,
    pub username: String,
}
