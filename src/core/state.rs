//! Application State - Stato globale dell'applicazione
//!
//! Contiene l'assembler (e tramite lui lo store), la configurazione JWT e le
//! strutture condivise del feed live.

use crate::assembler::{AssemblerOptions, ConversationListAssembler};
use crate::core::Config;
use crate::live::{ChangeFeed, UserSignals};
use crate::repositories::ConversationStore;
use std::sync::Arc;
use std::time::Duration;

/// Stato globale dell'applicazione condiviso tra tutte le route e middleware
pub struct AppState<S> {
    /// Assembler delle anteprime, possiede lo store condiviso
    pub assembler: ConversationListAssembler<S>,

    /// Secret key per JWT token
    pub jwt_secret: String,

    /// Canali broadcast per conversazione, notificano le modifiche ai feed live
    pub feed: ChangeFeed,

    /// Mappa concorrente degli utenti con un feed live aperto
    /// Key: user_id, Value: Sender dei segnali interni della connessione
    pub users_online: UserSignals,

    /// Finestra in cui le modifiche vengono accorpate prima di ricaricare la lista
    pub refresh_interval: Duration,
}

impl<S: ConversationStore> AppState<S> {
    /// Crea una nuova istanza di AppState con le opzioni di default
    ///
    /// # Arguments
    /// * `store` - Store condiviso (MySQL o in memoria)
    /// * `jwt_secret` - Chiave segreta per la verifica dei token JWT
    pub fn new(store: Arc<S>, jwt_secret: String) -> Self {
        Self {
            assembler: ConversationListAssembler::new(store, AssemblerOptions::default()),
            jwt_secret,
            feed: ChangeFeed::new(),
            users_online: UserSignals::new(),
            refresh_interval: Duration::from_millis(250),
        }
    }

    /// Crea AppState applicando timeout, concorrenza e intervallo di refresh della configurazione
    pub fn from_config(store: Arc<S>, config: &Config) -> Self {
        let options = AssemblerOptions {
            query_timeout: config.query_timeout(),
            concurrency: config.preview_concurrency,
        };
        Self {
            assembler: ConversationListAssembler::new(store, options),
            jwt_secret: config.jwt_secret.clone(),
            feed: ChangeFeed::new(),
            users_online: UserSignals::new(),
            refresh_interval: config.refresh_interval(),
        }
    }

    /// Store condiviso
    pub fn store(&self) -> &Arc<S> {
        self.assembler.store()
    }
}
