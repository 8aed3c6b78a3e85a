//! Errori dell'assemblaggio delle anteprime

use crate::repositories::StoreError;

/// Unico errore fatale di un caricamento: la lista delle membership non è
/// disponibile. I guasti sulla singola conversazione non arrivano mai qui.
#[derive(Debug, thiserror::Error)]
pub enum DataFetchError {
    #[error("failed to fetch memberships of user {user_id}: {source}")]
    Memberships {
        user_id: i32,
        #[source]
        source: StoreError,
    },
}
